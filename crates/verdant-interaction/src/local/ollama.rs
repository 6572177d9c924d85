//! OllamaModel - local language model backed by the `ollama` CLI.
//!
//! This implementation spawns the `ollama` command for availability checks
//! and prompting. The CLI itself is stateless per invocation, so each
//! session keeps its own transcript and replays it inside every prompt;
//! callers still send only the new message, matching the session contract.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use verdant_core::VerdantError;

use super::model::{Availability, LocalLanguageModel, LocalSession};

/// Local model provider wrapping the `ollama` CLI.
pub struct OllamaModel {
    /// Path to the `ollama` executable. If None, searches in PATH.
    binary_path: Option<PathBuf>,
    /// Model to run, e.g. "gemma3".
    model: String,
}

impl OllamaModel {
    /// Creates a provider for the given model, finding `ollama` in PATH.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            binary_path: None,
            model: model.into(),
        }
    }

    /// Uses a specific `ollama` executable instead of searching PATH.
    pub fn with_binary_path(mut self, path: PathBuf) -> Self {
        self.binary_path = Some(path);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn command(&self) -> Command {
        match &self.binary_path {
            Some(path) => Command::new(path),
            None => Command::new("ollama"),
        }
    }
}

#[async_trait]
impl LocalLanguageModel for OllamaModel {
    /// Shells `ollama list` to find out whether the model can answer right
    /// now. Every failure mode (binary missing, daemon down, list error)
    /// maps to `Unavailable`; a listing without our model means it exists
    /// only after a download.
    async fn availability(&self) -> Availability {
        let output = match self.command().arg("list").output().await {
            Ok(output) => output,
            Err(err) => {
                log::debug!("ollama binary not runnable: {err}");
                return Availability::Unavailable;
            }
        };

        if !output.status.success() {
            log::debug!("ollama list exited with {}", output.status);
            return Availability::Unavailable;
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        if listing_contains_model(&listing, &self.model) {
            Availability::Ready
        } else {
            Availability::AfterDownload
        }
    }

    async fn create_session(
        &self,
        system_instruction: &str,
    ) -> Result<Box<dyn LocalSession>, VerdantError> {
        if self.availability().await != Availability::Ready {
            return Err(VerdantError::local_generation(format!(
                "local model '{}' is not available",
                self.model
            )));
        }

        Ok(Box::new(OllamaSession {
            binary_path: self.binary_path.clone(),
            model: self.model.clone(),
            system_instruction: system_instruction.to_string(),
            exchanges: Vec::new(),
            destroyed: false,
        }))
    }
}

/// Checks whether `ollama list` output mentions the model.
///
/// Listing lines start with `name:tag`; a configured name without a tag
/// matches any tag of that model.
fn listing_contains_model(listing: &str, model: &str) -> bool {
    listing.lines().skip(1).any(|line| {
        let Some(name) = line.split_whitespace().next() else {
            return false;
        };
        name == model || name.strip_suffix(":latest") == Some(model) || {
            !model.contains(':') && name.split(':').next() == Some(model)
        }
    })
}

struct OllamaSession {
    binary_path: Option<PathBuf>,
    model: String,
    system_instruction: String,
    /// (user message, model reply) pairs, replayed into each prompt.
    exchanges: Vec<(String, String)>,
    destroyed: bool,
}

impl OllamaSession {
    fn compose_prompt(&self, new_message: &str) -> String {
        let mut prompt = String::new();
        prompt.push_str(&self.system_instruction);
        prompt.push_str("\n\n");
        for (user, model) in &self.exchanges {
            prompt.push_str(&format!("User: {user}\nAssistant: {model}\n"));
        }
        prompt.push_str(&format!("User: {new_message}\nAssistant:"));
        prompt
    }

    async fn run(&self, prompt: &str) -> Result<String, VerdantError> {
        let mut command = match &self.binary_path {
            Some(path) => Command::new(path),
            None => Command::new("ollama"),
        };
        let mut child = command
            .arg("run")
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                VerdantError::local_generation(format!("failed to spawn ollama: {err}"))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes()).await.map_err(|err| {
                VerdantError::local_generation(format!("failed to write prompt: {err}"))
            })?;
        }

        let output = child.wait_with_output().await.map_err(|err| {
            VerdantError::local_generation(format!("ollama did not complete: {err}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VerdantError::local_generation(format!(
                "ollama exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl LocalSession for OllamaSession {
    async fn prompt(&mut self, text: &str) -> Result<String, VerdantError> {
        if self.destroyed {
            return Err(VerdantError::local_generation("session already destroyed"));
        }

        let prompt = self.compose_prompt(text);
        let reply = self.run(&prompt).await?;
        self.exchanges.push((text.to_string(), reply.clone()));
        Ok(reply)
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            log::debug!("ollama session for '{}' destroyed", self.model);
        }
        self.destroyed = true;
        self.exchanges.clear();
    }
}
