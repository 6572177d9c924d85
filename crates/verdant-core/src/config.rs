//! Provider configuration.

use crate::error::VerdantError;
use serde::{Deserialize, Serialize};

/// Tunable provider settings with sensible defaults.
///
/// Loaded from a TOML file when present; every field has a default so an
/// empty file (or none at all) is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Cloud multimodal model used for identification and chat.
    pub cloud_model: String,
    /// On-device model name passed to the local runtime.
    pub local_model: String,
    /// External classifier command for the offline pipeline, if any.
    pub classifier_command: Option<String>,
    /// Maximum label guesses kept from the classifier.
    pub classifier_top_k: usize,
    /// Labels below this confidence are dropped.
    pub confidence_floor: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            cloud_model: "gemini-2.5-flash".to_string(),
            local_model: "gemma3".to_string(),
            classifier_command: None,
            classifier_top_k: 3,
            confidence_floor: 0.35,
        }
    }
}

impl ProviderConfig {
    /// Parses a TOML document into a config.
    pub fn from_toml_str(raw: &str) -> Result<Self, VerdantError> {
        toml::from_str(raw)
            .map_err(|e| VerdantError::configuration(format!("invalid config: {e}")))
    }

    /// Loads a config file, falling back to defaults when it is absent.
    pub fn load(path: &std::path::Path) -> Result<Self, VerdantError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| VerdantError::configuration(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }
}
