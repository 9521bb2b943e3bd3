//! Minimal client for a "messages" style LLM API.
//!
//! One request, one user turn, text and base64 PNG content blocks in; the
//! concatenated text blocks of the reply out.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{AgentError, AgentResult};

/// One block of user content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// PNG bytes as an inline base64 image.
    pub fn png(bytes: &[u8]) -> Self {
        ContentBlock::Image {
            source: ImageSource {
                kind: "base64".to_string(),
                media_type: "image/png".to_string(),
                data: STANDARD.encode(bytes),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub media_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a [ContentBlock],
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Parameters of one call.
#[derive(Debug, Clone, Copy)]
pub struct CallOptions<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub system: Option<&'a str>,
    pub temperature: Option<f32>,
}

pub(crate) fn build_request<'a>(
    options: CallOptions<'a>,
    content: &'a [ContentBlock],
) -> MessagesRequest<'a> {
    MessagesRequest {
        model: options.model,
        max_tokens: options.max_tokens,
        system: options.system,
        temperature: options.temperature,
        messages: vec![Message {
            role: "user",
            content,
        }],
    }
}

/// Join the text blocks of a response body.
pub(crate) fn response_text(body: &str) -> AgentResult<String> {
    let response: MessagesResponse = serde_json::from_str(body)?;
    let text: Vec<String> = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();
    let text = text.join("\n");
    if text.trim().is_empty() {
        return Err(AgentError::EmptyResponse);
    }
    Ok(text)
}

/// HTTP client bound to one endpoint and key.
#[derive(Debug, Clone)]
pub struct MessagesClient {
    http: reqwest::Client,
    endpoint: String,
    api_version: String,
    api_key: String,
}

impl MessagesClient {
    /// Build a client; fails without an API key.
    pub fn new(config: &LlmConfig) -> AgentResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AgentError::Config("API key (EASEL_API_KEY)".to_string()))?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("easel/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_version: config.api_version.clone(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one user turn and return the reply text.
    pub async fn complete(
        &self,
        options: CallOptions<'_>,
        content: &[ContentBlock],
    ) -> AgentResult<String> {
        let request = build_request(options, content);
        debug!(model = options.model, blocks = content.len(), "messages request");

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AgentError::Api {
                status: status.as_u16(),
                body: truncate(&body, 500),
            });
        }
        response_text(&body)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
