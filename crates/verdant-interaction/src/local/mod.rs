//! On-device model providers.
//!
//! - `model`: the language-model and session traits plus the scoped guard
//! - `ollama`: CLI-backed implementation
//! - `probe`: readiness capability probe

pub mod model;
pub mod ollama;
pub mod probe;

pub use model::{Availability, LocalLanguageModel, LocalSession, ScopedSession};
pub use ollama::OllamaModel;
pub use probe::probe_local_model;
