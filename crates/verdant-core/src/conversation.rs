//! Conversation domain model.
//!
//! A [`Transcript`] is the append-only, session-scoped sequence of turns
//! shown to the user. It is created with one synthesized greeting turn,
//! grows by one user turn and one model turn per exchange, and is never
//! persisted across restarts.

use crate::plant::PlantRecord;
use serde::{Deserialize, Serialize};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A single immutable message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

impl ConversationTurn {
    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Creates a user-authored turn stamped now.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Creates a model-authored turn stamped now.
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }
}

/// Synthesizes the opening assistant greeting.
///
/// When a plant context is active the greeting names the plant literally,
/// so the user sees which plant grounds the conversation.
pub fn greeting_text(plant: Option<&PlantRecord>) -> String {
    match plant {
        Some(plant) => format!(
            "Hi! I see you're looking at a {}. Ask me anything about caring for it!",
            plant.common_name
        ),
        None => "Hi! Share a photo of a plant and I'll help you identify it.".to_string(),
    }
}

/// Ordered, append-only sequence of conversation turns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<ConversationTurn>,
}

impl Transcript {
    /// Creates an empty transcript (no greeting).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transcript opened with the synthesized greeting turn.
    pub fn with_greeting(plant: Option<&PlantRecord>) -> Self {
        let mut transcript = Self::new();
        transcript.push_model(greeting_text(plant));
        transcript
    }

    /// Appends a user turn.
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(ConversationTurn::user(text));
    }

    /// Appends a model turn.
    pub fn push_model(&mut self, text: impl Into<String>) {
        self.turns.push(ConversationTurn::model(text));
    }

    /// All turns in order.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The turns preceding the message currently being sent.
    ///
    /// Providers that require full history replay this slice as-is; order
    /// matters and must not be reshuffled.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Clears the transcript and re-opens it with a fresh greeting.
    pub fn reset(&mut self, plant: Option<&PlantRecord>) {
        self.turns.clear();
        self.push_model(greeting_text(plant));
    }
}
