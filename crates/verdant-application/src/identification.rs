//! Identification strategies.
//!
//! Two interchangeable strategies behind one contract: the cloud strategy
//! sends the image to the multimodal provider with a response schema, the
//! local strategy turns classifier labels into a record through a one-shot
//! on-device generation. Exactly one strategy runs per request; the
//! orchestrator picks which. Neither retries, neither cross-validates.

use async_trait::async_trait;
use std::sync::Arc;
use verdant_core::{IdentifySource, PlantRecord, VerdantError};
use verdant_interaction::local::{LocalLanguageModel, ScopedSession};
use verdant_interaction::{GeminiClient, plant_record_schema, strip_code_fences};

/// Instruction accompanying the image on the cloud path. The response
/// schema, not this text, is what guarantees the output shape.
const CLOUD_IDENTIFY_INSTRUCTION: &str = "Identify the plant in this photo. Provide its common \
    and scientific names, a short description, care instructions (water, light, soil, humidity, \
    temperature), whether it is safe for pets, and one fun fact.";

/// System instruction for the one-shot local generation.
const LOCAL_IDENTIFY_SYSTEM: &str =
    "You are a botanist. You answer with a single JSON object and nothing else.";

/// A backend able to turn an identification source into a `PlantRecord`.
#[async_trait]
pub trait IdentifyStrategy: Send + Sync {
    async fn identify(&self, source: IdentifySource) -> Result<PlantRecord, VerdantError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Cloud structured-generation strategy.
pub struct CloudIdentification {
    client: Arc<GeminiClient>,
}

impl CloudIdentification {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentifyStrategy for CloudIdentification {
    async fn identify(&self, source: IdentifySource) -> Result<PlantRecord, VerdantError> {
        let IdentifySource::Image { bytes, mime_type } = source else {
            return Err(VerdantError::provider(
                "cloud identification requires an image source",
            ));
        };

        let text = self
            .client
            .generate_structured(
                &bytes,
                &mime_type,
                CLOUD_IDENTIFY_INSTRUCTION,
                plant_record_schema(),
            )
            .await?;

        // The schema marks every field required, so this parse is verbatim;
        // a mismatch means the provider broke its structured-output contract.
        serde_json::from_str(&text).map_err(|err| {
            VerdantError::provider(format!("malformed identification response: {err}"))
        })
    }

    fn name(&self) -> &'static str {
        "cloud"
    }
}

/// Offline generation-from-labels strategy.
pub struct LocalIdentification {
    model: Arc<dyn LocalLanguageModel>,
}

impl LocalIdentification {
    pub fn new(model: Arc<dyn LocalLanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl IdentifyStrategy for LocalIdentification {
    async fn identify(&self, source: IdentifySource) -> Result<PlantRecord, VerdantError> {
        let IdentifySource::Labels(labels) = source else {
            return Err(VerdantError::local_generation(
                "local identification requires classifier labels",
            ));
        };

        // Precondition check comes before any session exists.
        if labels.is_empty() {
            return Err(VerdantError::NoObjectDetected);
        }

        let session = self.model.create_session(LOCAL_IDENTIFY_SYSTEM).await?;
        // Scoped to this one generation; released on every path below.
        let mut session = ScopedSession::new(session);

        let raw = session.prompt(&offline_prompt(&labels)).await?;
        let record: PlantRecord =
            serde_json::from_str(strip_code_fences(&raw)).map_err(|err| {
                VerdantError::local_generation(format!("unparsable local output: {err}"))
            })?;

        // No schema enforced the shape, so the record is validated post hoc.
        record.validate()?;
        Ok(record)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Builds the local prompt embedding the label list and the JSON shape.
fn offline_prompt(labels: &[String]) -> String {
    format!(
        "An image classifier looked at a photo and guessed, most confident first: {}.\n\
         Assuming the photo shows a plant, respond with exactly this JSON shape:\n\
         {{\"commonName\": \"...\", \"scientificName\": \"...\", \"description\": \"...\", \
         \"careInstructions\": {{\"water\": \"...\", \"light\": \"...\", \"soil\": \"...\", \
         \"humidity\": \"...\", \"temperature\": \"...\"}}, \
         \"petFriendly\": true, \"funFact\": \"...\"}}\n\
         Fill in every field. Do not add any other text.",
        labels.join(", ")
    )
}
