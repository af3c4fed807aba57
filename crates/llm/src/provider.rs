//! HTTP client for OpenAI-compatible `/chat/completions` endpoints.

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{CompletionRequest, LanguageModel, ProviderError, ProviderName};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Base URL of the OpenAI API.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Base URL of the Together AI API (OpenAI-compatible).
pub const TOGETHER_BASE_URL: &str = "https://api.together.xyz/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// One chat-completions endpoint bound to a fixed model.
///
/// [`complete`](LanguageModel::complete) performs exactly one HTTP call; no
/// retries. Pacing and retrying are the caller's concern.
pub struct ChatCompletionsProvider {
    name: ProviderName,
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsProvider {
    /// Builds a provider against an arbitrary OpenAI-compatible endpoint.
    pub fn new(
        name: ProviderName,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ProviderError::Transport {
                message: format!("building HTTP client: {err}"),
            })?;
        Ok(Self {
            name,
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Convenience constructor for the OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ProviderError> {
        let name = ProviderName::new("openai").ok_or_else(empty_name)?;
        Self::new(name, OPENAI_BASE_URL, api_key, model)
    }

    /// Convenience constructor for the Together AI API.
    pub fn together(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ProviderError> {
        let name = ProviderName::new("together").ok_or_else(empty_name)?;
        Self::new(name, TOGETHER_BASE_URL, api_key, model)
    }
}

fn empty_name() -> ProviderError {
    ProviderError::Transport {
        message: "provider name must not be empty".into(),
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[async_trait]
impl LanguageModel for ChatCompletionsProvider {
    fn name(&self) -> &ProviderName {
        &self.name
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<serde_json::Value, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            response_format: request
                .json_response
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        debug!(provider = %self.name, model = %self.model, "sending completion request");
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::Transport {
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: snippet(&message),
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|err| ProviderError::MalformedResponse {
                    message: format!("decoding completion response: {err}"),
                })?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::MalformedResponse {
                message: "completion response contained no choices".into(),
            })?;

        extract_payload(&content, request.json_response)
    }
}

/// Turns raw message content into the JSON value the caller asked for.
///
/// Models sometimes wrap JSON answers in markdown code fences even when asked
/// for a bare document; those are stripped before parsing.
fn extract_payload(content: &str, json_response: bool) -> Result<serde_json::Value, ProviderError> {
    let content = strip_fences(content.trim());
    if json_response {
        serde_json::from_str(content).map_err(|err| ProviderError::MalformedResponse {
            message: format!("expected JSON document: {err}"),
        })
    } else {
        Ok(serde_json::Value::String(content.to_string()))
    }
}

fn strip_fences(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    // Drop the language tag on the opening fence line, then the closing fence.
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn snippet(body: &str) -> String {
    const MAX: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() > MAX {
        trimmed.chars().take(MAX).collect()
    } else {
        trimmed.to_string()
    }
}
