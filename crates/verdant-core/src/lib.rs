//! Core domain types for Verdant.
//!
//! This crate holds the data contracts every backend strategy normalizes
//! into, the shared error taxonomy, and the configuration surfaces. It has
//! no provider or transport code.

pub mod config;
pub mod context;
pub mod conversation;
pub mod error;
pub mod plant;
pub mod secret;

// Re-export common types
pub use config::ProviderConfig;
pub use context::{IdentifySource, RequestContext};
pub use conversation::{ConversationTurn, Role, Transcript, greeting_text};
pub use error::VerdantError;
pub use plant::{CareInstructions, PlantRecord};
pub use secret::SecretStore;
