//! Secret management trait.
//!
//! Defines the interface for loading the cloud API key. Implementations
//! must never include the key itself in error messages or logs.

use crate::error::VerdantError;

/// Source of the cloud provider API key.
#[async_trait::async_trait]
pub trait SecretStore: Send + Sync {
    /// Returns the Gemini API key.
    ///
    /// A missing key is a [`VerdantError::Configuration`]; it is fatal for
    /// any cloud call and surfaced at the first one.
    async fn gemini_api_key(&self) -> Result<String, VerdantError>;
}
