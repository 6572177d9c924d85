//! Environment-variable secret store.

use async_trait::async_trait;
use verdant_core::{SecretStore, VerdantError};

pub const DEFAULT_API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Reads the cloud API key from the process environment.
pub struct EnvSecretStore {
    var: String,
}

impl EnvSecretStore {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self::new(DEFAULT_API_KEY_VAR)
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn gemini_api_key(&self) -> Result<String, VerdantError> {
        match std::env::var(&self.var) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            // The variable name is safe to report; the key never is.
            _ => Err(VerdantError::configuration(format!(
                "{} is not set",
                self.var
            ))),
        }
    }
}
