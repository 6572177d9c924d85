//! Response schema for structured identification output.

use serde_json::{Value, json};

/// Builds the `responseSchema` sent with cloud identification requests.
///
/// The shape mirrors [`verdant_core::PlantRecord`]'s wire format exactly,
/// with every field marked required so the provider cannot omit any of
/// them. This is what lets the cloud path skip post-hoc validation.
pub fn plant_record_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "commonName": { "type": "STRING" },
            "scientificName": { "type": "STRING" },
            "description": { "type": "STRING" },
            "careInstructions": {
                "type": "OBJECT",
                "properties": {
                    "water": { "type": "STRING" },
                    "light": { "type": "STRING" },
                    "soil": { "type": "STRING" },
                    "humidity": { "type": "STRING" },
                    "temperature": { "type": "STRING" }
                },
                "required": ["water", "light", "soil", "humidity", "temperature"]
            },
            "petFriendly": { "type": "BOOLEAN" },
            "funFact": { "type": "STRING" }
        },
        "required": [
            "commonName",
            "scientificName",
            "description",
            "careInstructions",
            "petFriendly",
            "funFact"
        ]
    })
}
