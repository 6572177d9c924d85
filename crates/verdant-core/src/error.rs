//! Error types for the Verdant application.
//!
//! This provides typed, structured error variants shared by every layer.
//! Service-layer failures bubble to the orchestrating caller untransformed;
//! mapping a variant to user-facing copy is a presentation concern handled
//! by [`VerdantError::user_guidance`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Verdant application.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VerdantError {
    /// Missing or invalid credentials/configuration. Fatal for any cloud call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transport or auth failure from a cloud provider call.
    /// Surfaced verbatim to the caller, never retried here.
    #[error("Provider error{}: {message}", .status_code.map(|c| format!(" (HTTP {c})")).unwrap_or_default())]
    Provider {
        status_code: Option<u16>,
        message: String,
    },

    /// The provider call succeeded but returned no usable text.
    #[error("Provider returned an empty response")]
    EmptyResponse,

    /// The vision classifier was queried before its asynchronous
    /// initialization completed. Retryable precondition, not permanent.
    #[error("Image classifier model is not loaded yet")]
    ModelNotLoaded,

    /// The classifier produced no label above its confidence floor.
    /// Raised before any local generation is attempted.
    #[error("No plant could be detected in the image")]
    NoObjectDetected,

    /// The local model was unavailable or produced unparsable output.
    #[error("Local generation failed: {0}")]
    LocalGeneration(String),

    /// A request of the same kind is already in flight.
    #[error("Request already in flight: {0}")]
    Busy(String),
}

impl VerdantError {
    /// Creates a Configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a Provider error without an HTTP status code.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            status_code: None,
            message: message.into(),
        }
    }

    /// Creates a Provider error carrying the HTTP status code.
    pub fn provider_status(status_code: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            status_code: Some(status_code),
            message: message.into(),
        }
    }

    /// Creates a LocalGeneration error.
    pub fn local_generation(message: impl Into<String>) -> Self {
        Self::LocalGeneration(message.into())
    }

    /// Creates a Busy error for the given request kind.
    pub fn busy(kind: impl Into<String>) -> Self {
        Self::Busy(kind.into())
    }

    /// Returns friendly copy for this error.
    ///
    /// Identification precondition failures suggest retrying with a new
    /// photo; connectivity-dependent failures suggest reconnecting. The
    /// distinction is part of the error contract, so it lives here rather
    /// than in the presentation layer.
    pub fn user_guidance(&self) -> &'static str {
        match self {
            Self::Configuration(_) => {
                "The app is not configured with an API key. Set GEMINI_API_KEY and restart."
            }
            Self::Provider { .. } => {
                "The identification service could not be reached. Please try again."
            }
            Self::EmptyResponse => "The model returned nothing useful. Please try again.",
            Self::ModelNotLoaded => {
                "The offline classifier is still loading. Wait a moment and try again."
            }
            Self::NoObjectDetected => {
                "No plant was recognized in that photo. Try a clearer, closer shot."
            }
            Self::LocalGeneration(_) => {
                "The on-device model could not describe this plant. Try a clearer photo."
            }
            Self::Busy(_) => "A request is already running. Wait for it to finish.",
        }
    }

    /// True for failures a caller may resolve by retrying the same input
    /// once a precondition clears (as opposed to needing different input
    /// or configuration).
    pub fn is_retryable_precondition(&self) -> bool {
        matches!(self, Self::ModelNotLoaded | Self::Busy(_))
    }
}
