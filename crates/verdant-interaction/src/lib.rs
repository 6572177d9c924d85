//! Boundary providers for Verdant.
//!
//! Everything that talks to an AI backend lives here: the cloud multimodal
//! REST client, the on-device language-model interface and its CLI-backed
//! implementation, the vision classifier adapter, the capability probe,
//! and the helpers they share. The application layer composes these behind
//! its strategy traits.

pub mod classifier;
pub mod extract;
pub mod gemini;
pub mod local;
pub mod schema;
pub mod secret;

pub use classifier::{
    ClassifierBackend, CommandClassifier, LabelScore, UnconfiguredClassifier, VisionClassifier,
};
pub use extract::strip_code_fences;
pub use gemini::GeminiClient;
pub use local::{
    Availability, LocalLanguageModel, LocalSession, OllamaModel, ScopedSession, probe_local_model,
};
pub use schema::plant_record_schema;
pub use secret::EnvSecretStore;
