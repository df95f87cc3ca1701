//! Talks to a running OraCare gateway instead of calling the model directly.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use oracare_core::{AnalysisClient, AnalysisResult, OraError, OraResult};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeBody<'a> {
    image_url: &'a str,
}

pub struct HttpAnalysisClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnalysisClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/analyze", self.base_url)
    }

    fn gateway_error(status: u16, message: impl Into<String>) -> OraError {
        OraError::Gateway {
            provider: "gateway".into(),
            status,
            message: message.into(),
        }
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn analyze(&self, image_url: &str) -> OraResult<AnalysisResult> {
        let url = self.endpoint();
        debug!(url = %url, "Posting analyze request");

        let resp = self
            .client
            .post(&url)
            .json(&AnalyzeBody { image_url })
            .send()
            .await
            .map_err(|e| Self::gateway_error(0, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            let message = body["message"]
                .as_str()
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed"))
                .to_string();
            return Err(Self::gateway_error(status.as_u16(), message));
        }

        resp.json::<AnalysisResult>()
            .await
            .map_err(|e| Self::gateway_error(status.as_u16(), format!("bad response: {e}")))
    }
}
