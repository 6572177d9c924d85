//! On-device language model interface.
//!
//! The host platform provides the actual model; these traits describe the
//! contract Verdant consumes: an availability tier, session creation with a
//! system instruction, prompting, and explicit destruction.

use async_trait::async_trait;
use verdant_core::VerdantError;

/// Availability tier reported by the host environment.
///
/// Only `Ready` counts as usable. `AfterDownload` means the model exists
/// but would need a blocking download first, which Verdant never triggers
/// implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Ready,
    AfterDownload,
    Unavailable,
}

/// A live conversation session inside the local model.
///
/// Context from the creation-time system instruction and prior prompts
/// lives inside the session; callers send only the new message.
#[async_trait]
pub trait LocalSession: Send {
    /// Sends one message and returns the model's reply text.
    async fn prompt(&mut self, text: &str) -> Result<String, VerdantError>;

    /// Releases the session's resources. Idempotent.
    fn destroy(&mut self);
}

/// Factory interface for the on-device language model.
#[async_trait]
pub trait LocalLanguageModel: Send + Sync {
    /// Reports the current availability tier. Must not fail; implementations
    /// map every query error to `Unavailable`.
    async fn availability(&self) -> Availability;

    /// Creates a session seeded with `system_instruction`.
    async fn create_session(
        &self,
        system_instruction: &str,
    ) -> Result<Box<dyn LocalSession>, VerdantError>;
}

/// Owns a [`LocalSession`] and guarantees `destroy()` on every exit path.
///
/// One-shot generations wrap their session in this guard so that success,
/// parse failure, and early returns all release the session.
pub struct ScopedSession {
    inner: Option<Box<dyn LocalSession>>,
}

impl ScopedSession {
    pub fn new(session: Box<dyn LocalSession>) -> Self {
        Self {
            inner: Some(session),
        }
    }

    /// Prompts the underlying session.
    pub async fn prompt(&mut self, text: &str) -> Result<String, VerdantError> {
        match self.inner.as_mut() {
            Some(session) => session.prompt(text).await,
            None => Err(VerdantError::local_generation("session already released")),
        }
    }

    /// Releases the session early. Dropping the guard does the same.
    pub fn release(&mut self) {
        if let Some(mut session) = self.inner.take() {
            session.destroy();
        }
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        self.release();
    }
}
