//! Per-request context and identification input.
//!
//! Connectivity and capability flags are passed explicitly into each
//! service call instead of being read from process-global state, so a
//! request observes one consistent snapshot even while connectivity
//! events land mid-flight.

use crate::plant::PlantRecord;
use serde::{Deserialize, Serialize};

/// Snapshot of session state taken when a request starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    /// Mirrors the host connectivity signal.
    pub is_online: bool,
    /// Result of the most recent capability probe.
    pub is_local_model_ready: bool,
    /// Most recently identified plant, grounding chat answers.
    pub plant_context: Option<PlantRecord>,
}

impl RequestContext {
    pub fn new(is_online: bool, is_local_model_ready: bool) -> Self {
        Self {
            is_online,
            is_local_model_ready,
            plant_context: None,
        }
    }

    /// Sets the grounding plant context.
    pub fn with_plant(mut self, plant: PlantRecord) -> Self {
        self.plant_context = Some(plant);
        self
    }
}

/// Input to an identification strategy.
///
/// The cloud path consumes raw image bytes; the offline path consumes the
/// classifier's label guesses. Exactly one strategy runs per request.
#[derive(Debug, Clone)]
pub enum IdentifySource {
    Image { bytes: Vec<u8>, mime_type: String },
    Labels(Vec<String>),
}

impl IdentifySource {
    pub fn image(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self::Image {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn labels(labels: Vec<String>) -> Self {
        Self::Labels(labels)
    }
}
