//! HTTP text generators backed by hosted LLM APIs.
//!
//! Two dialects are supported: `OpenAI`-compatible chat completions (which
//! also covers `DeepSeek` and Ollama) and the Anthropic Messages API. Both
//! share one `Endpoint` and differ only in request shape, auth header, and
//! where the reply text sits in the response. [`LlmBackend`] dispatches
//! between them so the engine holds one concrete type whichever API the
//! environment selects.
//!
//! A backend makes exactly one HTTP call per [`TextGenerator::generate`];
//! deadlines and retries are layered on by
//! [`ResilientGateway`](crate::resilient::ResilientGateway).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::{BackendType, GatewayConfig};
use crate::error::GatewayError;
use crate::generator::{GenerationRequest, TextGenerator};

/// Version header required by the Anthropic Messages API.
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ---------------------------------------------------------------------------
// Shared endpoint
// ---------------------------------------------------------------------------

/// Connection to one hosted API.
struct Endpoint {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl Endpoint {
    fn new(config: &GatewayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// POST `body` to `{api_url}/{path}` and decode a successful reply.
    async fn post<B, R>(
        &self,
        path: &str,
        body: &B,
        headers: &[(&str, &str)],
    ) -> Result<R, GatewayError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{path}", self.api_url);
        let mut builder = self.client.post(&url).json(body);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Http(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(format!("response from {url}: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Unified backend enum
// ---------------------------------------------------------------------------

/// A hosted LLM reached over HTTP.
pub enum LlmBackend {
    /// Chat completions dialect.
    OpenAi(OpenAiBackend),
    /// Messages dialect.
    Anthropic(AnthropicBackend),
}

impl TextGenerator for LlmBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        match self {
            Self::OpenAi(backend) => backend.complete(request).await,
            Self::Anthropic(backend) => backend.complete(request).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }
}

/// Build the backend named by `config`.
pub fn create_backend(config: &GatewayConfig) -> LlmBackend {
    let endpoint = Endpoint::new(config);
    match config.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend { endpoint }),
        BackendType::Anthropic => LlmBackend::Anthropic(AnthropicBackend { endpoint }),
    }
}

// ---------------------------------------------------------------------------
// Chat completions
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> Result<String, GatewayError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                GatewayError::Malformed("chat completion had no message content".to_owned())
            })
    }
}

/// `POST {api_url}/chat/completions` with bearer auth.
pub struct OpenAiBackend {
    endpoint: Endpoint,
}

impl OpenAiBackend {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        let body = ChatRequest {
            model: &self.endpoint.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let auth = format!("Bearer {}", self.endpoint.api_key);
        let response: ChatResponse = self
            .endpoint
            .post("chat/completions", &body, &[("Authorization", auth.as_str())])
            .await?;
        response.into_text()
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl MessagesResponse {
    /// First text block. Non-text blocks (tool use) carry no `text`.
    fn into_text(self) -> Result<String, GatewayError> {
        self.content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| GatewayError::Malformed("message had no text block".to_owned()))
    }
}

/// `POST {api_url}/messages` with `x-api-key` auth. The system prompt is a
/// top-level field rather than a message.
pub struct AnthropicBackend {
    endpoint: Endpoint,
}

impl AnthropicBackend {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        let body = MessagesRequest {
            model: &self.endpoint.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system_prompt,
            messages: [ChatMessage {
                role: "user",
                content: &request.user_prompt,
            }],
        };
        let response: MessagesResponse = self
            .endpoint
            .post(
                "messages",
                &body,
                &[
                    ("x-api-key", self.endpoint.api_key.as_str()),
                    ("anthropic-version", ANTHROPIC_VERSION),
                ],
            )
            .await?;
        response.into_text()
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn config(backend_type: BackendType) -> GatewayConfig {
        GatewayConfig {
            backend_type,
            api_url: "http://127.0.0.1:9".to_owned(),
            api_key: "secret".to_owned(),
            model: "tiny".to_owned(),
        }
    }

    fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Option<T> {
        serde_json::from_value(value).ok()
    }

    #[test]
    fn chat_reply_text_is_extracted() {
        let response: Option<ChatResponse> = decode(serde_json::json!({
            "id": "cmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "A cloaked figure enters."}}]
        }));
        let text = response.map(ChatResponse::into_text);
        assert!(matches!(text, Some(Ok(t)) if t == "A cloaked figure enters."));
    }

    #[test]
    fn chat_reply_without_choices_is_malformed() {
        let response: Option<ChatResponse> = decode(serde_json::json!({"error": "rate_limit"}));
        let text = response.map(ChatResponse::into_text);
        assert!(matches!(text, Some(Err(GatewayError::Malformed(_)))));
    }

    #[test]
    fn messages_reply_skips_non_text_blocks() {
        let response: Option<MessagesResponse> = decode(serde_json::json!({
            "content": [
                {"type": "tool_use", "id": "t1", "name": "lookup", "input": {}},
                {"type": "text", "text": "Welcome, traveler."}
            ]
        }));
        let text = response.map(MessagesResponse::into_text);
        assert!(matches!(text, Some(Ok(t)) if t == "Welcome, traveler."));
    }

    #[test]
    fn empty_messages_reply_is_malformed() {
        let response: Option<MessagesResponse> = decode(serde_json::json!({"content": []}));
        let text = response.map(MessagesResponse::into_text);
        assert!(matches!(text, Some(Err(GatewayError::Malformed(_)))));
    }

    #[test]
    fn request_bodies_match_each_dialect() {
        let chat = ChatRequest {
            model: "tiny",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "be brief",
                },
                ChatMessage {
                    role: "user",
                    content: "describe the bar",
                },
            ],
            temperature: 0.5,
            max_tokens: 64,
        };
        let json = serde_json::to_value(&chat).unwrap_or_default();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["max_tokens"], 64);

        let messages = MessagesRequest {
            model: "tiny",
            max_tokens: 64,
            temperature: 0.5,
            system: "be brief",
            messages: [ChatMessage {
                role: "user",
                content: "describe the bar",
            }],
        };
        let json = serde_json::to_value(&messages).unwrap_or_default();
        assert_eq!(json["system"], "be brief");
        assert_eq!(json["messages"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn backend_names_follow_dialect() {
        assert_eq!(
            create_backend(&config(BackendType::OpenAi)).name(),
            "openai-compatible"
        );
        assert_eq!(create_backend(&config(BackendType::Anthropic)).name(), "anthropic");
    }
}
