//! Plant identification domain model.
//!
//! [`PlantRecord`] is the normalized result every identification strategy
//! must produce, regardless of which backend answered. The wire shape
//! (camelCase, `careInstructions` sub-object) matches the cloud provider's
//! response schema exactly, so the cloud path parses responses verbatim.

use crate::error::VerdantError;
use serde::{Deserialize, Serialize};

/// The five mandatory free-text care fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareInstructions {
    pub water: String,
    pub light: String,
    pub soil: String,
    pub humidity: String,
    pub temperature: String,
}

/// Normalized result of a plant identification.
///
/// Invariant: all fields are present and non-empty when returned
/// successfully. The cloud strategy enforces this through the provider's
/// structured-output schema; the local strategy has no schema enforcement
/// and must call [`PlantRecord::validate`] post hoc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantRecord {
    pub common_name: String,
    pub scientific_name: String,
    pub description: String,
    #[serde(rename = "careInstructions")]
    pub care: CareInstructions,
    pub pet_friendly: bool,
    pub fun_fact: String,
}

impl PlantRecord {
    /// Returns the names of text fields that are empty or whitespace-only.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let mut check = |name, value: &str| {
            if value.trim().is_empty() {
                missing.push(name);
            }
        };
        check("commonName", &self.common_name);
        check("scientificName", &self.scientific_name);
        check("description", &self.description);
        check("careInstructions.water", &self.care.water);
        check("careInstructions.light", &self.care.light);
        check("careInstructions.soil", &self.care.soil);
        check("careInstructions.humidity", &self.care.humidity);
        check("careInstructions.temperature", &self.care.temperature);
        check("funFact", &self.fun_fact);
        missing
    }

    /// True when every text field is non-empty.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Post-hoc validation for strategies without schema enforcement.
    pub fn validate(&self) -> Result<(), VerdantError> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(VerdantError::local_generation(format!(
                "incomplete record, empty fields: {}",
                missing.join(", ")
            )))
        }
    }

    /// Stable key identifying which plant grounds a conversation.
    ///
    /// Local chat sessions are recreated whenever this changes.
    pub fn context_fingerprint(&self) -> String {
        format!("{}|{}", self.scientific_name, self.common_name)
    }
}
