//! Vision gateway clients: ask a hosted vision LLM about an image URL.
//!
//! Anthropic is the default; an OpenAI-compatible chat endpoint is also supported.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use oracare_core::{OraError, OraResult, VisionGateway};

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-opus-20240229";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Supported vision providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionProvider {
    Anthropic,
    OpenAi,
}

impl VisionProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            Self::Anthropic => ANTHROPIC_BASE_URL,
            Self::OpenAi => OPENAI_BASE_URL,
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Self::Anthropic => DEFAULT_ANTHROPIC_MODEL,
            Self::OpenAi => DEFAULT_OPENAI_MODEL,
        }
    }
}

impl std::str::FromStr for VisionProvider {
    type Err = OraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            other => Err(OraError::Config(format!("unknown vision provider: {other}"))),
        }
    }
}

/// HTTP client for one vision provider. One request per call; no retries.
pub struct VisionClient {
    client: Client,
    provider: VisionProvider,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl VisionClient {
    pub fn new(provider: VisionProvider, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            provider,
            api_key: api_key.into(),
            model: provider.default_model().to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: provider.default_base_url().to_string(),
        }
    }

    pub fn anthropic(api_key: impl Into<String>) -> Self {
        Self::new(VisionProvider::Anthropic, api_key)
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new(VisionProvider::OpenAi, api_key)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn describe_via_anthropic(&self, image_url: &str, prompt: &str) -> OraResult<String> {
        info!("[Vision] Describing image via Anthropic {}", self.model);
        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![AnthropicMessage {
                role: "user",
                content: vec![
                    AnthropicContent::Text { text: prompt },
                    AnthropicContent::Image {
                        source: ImageSource { kind: "url", url: image_url },
                    },
                ],
            }],
        };

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(self.status_error(status.as_u16(), message));
        }

        let parsed: AnthropicResponse = resp.json().await.map_err(|e| self.transport_error(e))?;
        let text = parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .unwrap_or_default();
        debug!(chars = text.len(), "Anthropic answered");
        Ok(text)
    }

    async fn describe_via_openai(&self, image_url: &str, prompt: &str) -> OraResult<String> {
        info!("[Vision] Describing image via OpenAI {}", self.model);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": image_url } }
                ]
            }],
            "max_tokens": self.max_tokens
        });

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(self.status_error(status.as_u16(), message));
        }

        let json: serde_json::Value = resp.json().await.map_err(|e| self.transport_error(e))?;
        Ok(json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string())
    }

    fn transport_error(&self, err: reqwest::Error) -> OraError {
        OraError::Gateway {
            provider: self.provider.as_str().to_string(),
            status: err.status().map(|s| s.as_u16()).unwrap_or(0),
            message: err.to_string(),
        }
    }

    fn status_error(&self, status: u16, message: String) -> OraError {
        OraError::Gateway {
            provider: self.provider.as_str().to_string(),
            status,
            message,
        }
    }
}

#[async_trait]
impl VisionGateway for VisionClient {
    fn name(&self) -> &str {
        self.provider.as_str()
    }

    async fn describe(&self, image_url: &str, prompt: &str) -> OraResult<String> {
        match self.provider {
            VisionProvider::Anthropic => self.describe_via_anthropic(image_url, prompt).await,
            VisionProvider::OpenAi => self.describe_via_openai(image_url, prompt).await,
        }
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: Vec<AnthropicContent<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContent<'a> {
    Text { text: &'a str },
    Image { source: ImageSource<'a> },
}

#[derive(Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    url: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_from_str() {
        assert_eq!("anthropic".parse::<VisionProvider>().unwrap(), VisionProvider::Anthropic);
        assert_eq!("OpenAI".parse::<VisionProvider>().unwrap(), VisionProvider::OpenAi);
        assert!("gemini".parse::<VisionProvider>().is_err());
    }

    #[test]
    fn anthropic_request_shape() {
        let body = AnthropicRequest {
            model: DEFAULT_ANTHROPIC_MODEL,
            max_tokens: 1024,
            messages: vec![AnthropicMessage {
                role: "user",
                content: vec![
                    AnthropicContent::Text { text: "look" },
                    AnthropicContent::Image {
                        source: ImageSource { kind: "url", url: "https://x/y.jpg" },
                    },
                ],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["content"][0]["type"], "text");
        assert_eq!(json["messages"][0]["content"][1]["type"], "image");
        assert_eq!(json["messages"][0]["content"][1]["source"]["type"], "url");
        assert_eq!(json["messages"][0]["content"][1]["source"]["url"], "https://x/y.jpg");
    }

    #[test]
    fn anthropic_response_picks_text_block() {
        let parsed: AnthropicResponse = serde_json::from_value(serde_json::json!({
            "id": "msg_1",
            "content": [{ "type": "text", "text": "Summary: fine" }],
            "stop_reason": "end_turn"
        }))
        .unwrap();
        assert_eq!(parsed.content[0].text.as_deref(), Some("Summary: fine"));
    }

    #[test]
    fn builder_overrides() {
        let client = VisionClient::anthropic("k")
            .with_model("claude-test")
            .with_max_tokens(10)
            .with_base_url("http://localhost:9999/");
        assert_eq!(client.model(), "claude-test");
        assert_eq!(client.max_tokens, 10);
        assert_eq!(client.base_url, "http://localhost:9999");
        assert_eq!(client.name(), "anthropic");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_gateway_error() {
        let client = VisionClient::anthropic("k").with_base_url("http://127.0.0.1:9");
        let err = client.describe("https://x/y.jpg", "look").await.unwrap_err();
        assert!(matches!(err, OraError::Gateway { ref provider, .. } if provider == "anthropic"));
    }
}
