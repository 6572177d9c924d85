//! GeminiClient - Direct REST API client for the cloud multimodal provider.
//!
//! This client calls the Gemini `generateContent` API without any CLI
//! dependency. It serves both request shapes Verdant needs: structured
//! identification (inline image plus a response schema) and free-text chat
//! (system instruction plus replayed history).

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use verdant_core::conversation::{ConversationTurn, Role};
use verdant_core::{ProviderConfig, SecretStore, VerdantError};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Client for the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Creates a new client with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Builds a client from the secret store and provider config.
    ///
    /// A missing API key surfaces as `Configuration` here, at the first
    /// point a cloud call becomes possible.
    pub async fn try_from_secrets(
        secrets: &dyn SecretStore,
        config: &ProviderConfig,
    ) -> Result<Self, VerdantError> {
        let api_key = secrets.gemini_api_key().await?;
        Ok(Self::new(api_key, config.cloud_model.clone()))
    }

    /// Overrides the model after construction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sends an image and instruction, constraining the reply to `schema`.
    ///
    /// Returns the raw JSON text of the single candidate. The caller parses
    /// it verbatim; the schema marks every field required, so a successful
    /// response is already complete.
    pub async fn generate_structured(
        &self,
        image: &[u8],
        mime_type: &str,
        instruction: &str,
        schema: serde_json::Value,
    ) -> Result<String, VerdantError> {
        let contents = vec![Content {
            role: "user".to_string(),
            parts: vec![
                Part::Text {
                    text: instruction.to_string(),
                },
                Part::InlineData {
                    inline_data: InlineDataPayload {
                        mime_type: mime_type.to_string(),
                        data: BASE64_STANDARD.encode(image),
                    },
                },
            ],
        }];

        let request = GenerateContentRequest {
            contents,
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema,
            }),
        };
        self.send_request(&request).await
    }

    /// Sends one chat turn with the full prior history replayed in order.
    ///
    /// The provider-side session is fresh on every call; multi-turn context
    /// lives entirely in `history`.
    pub async fn chat(
        &self,
        system_instruction: &str,
        history: &[ConversationTurn],
        new_message: &str,
    ) -> Result<String, VerdantError> {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|turn| Content {
                role: wire_role(turn.role).to_string(),
                parts: vec![Part::Text {
                    text: turn.text.clone(),
                }],
            })
            .collect();
        contents.push(Content {
            role: "user".to_string(),
            parts: vec![Part::Text {
                text: new_message.to_string(),
            }],
        });

        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(Content {
                role: "system".to_string(),
                parts: vec![Part::Text {
                    text: system_instruction.to_string(),
                }],
            }),
            generation_config: None,
        };
        self.send_request(&request).await
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<String, VerdantError> {
        let url = format!(
            "{}/{model}:generateContent?key={api_key}",
            BASE_URL,
            model = self.model,
            api_key = self.api_key
        );

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| VerdantError::provider(format!("Gemini API request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            VerdantError::provider(format!("Failed to parse Gemini response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "model",
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataPayload {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[allow(dead_code)]
    code: Option<i32>,
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String, VerdantError> {
    response
        .candidates
        .and_then(|mut candidates| candidates.pop())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
        .filter(|text| !text.trim().is_empty())
        .ok_or(VerdantError::EmptyResponse)
}

fn map_http_error(status: StatusCode, body: String) -> VerdantError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    VerdantError::provider_status(status.as_u16(), message)
}
