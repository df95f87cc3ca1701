use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use oracare_core::{AnalysisClient, AnalysisResult, OraResult, VisionGateway};

use crate::parser::parse_analysis;

/// Fixed instruction sent alongside every image.
pub const ANALYSIS_PROMPT: &str = "Please analyze this oral cavity image for potential signs of oral cancer. Provide a detailed analysis including:\n1. A summary of findings\n2. Confidence score (0-100)\n3. Specific recommendations";

/// Calls a vision gateway in-process and scrapes the answer.
#[derive(Clone)]
pub struct Analyzer {
    gateway: Arc<dyn VisionGateway>,
    prompt: String,
}

impl Analyzer {
    pub fn new(gateway: Arc<dyn VisionGateway>) -> Self {
        Self {
            gateway,
            prompt: ANALYSIS_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn gateway_name(&self) -> &str {
        self.gateway.name()
    }
}

#[async_trait]
impl AnalysisClient for Analyzer {
    async fn analyze(&self, image_url: &str) -> OraResult<AnalysisResult> {
        info!(gateway = %self.gateway.name(), "Requesting image analysis");
        let answer = self.gateway.describe(image_url, &self.prompt).await?;
        debug!(answer = %answer, "Raw model answer");
        Ok(parse_analysis(&answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracare_core::OraError;
    use std::sync::Mutex;

    struct ScriptedGateway {
        answer: OraResult<String>,
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl VisionGateway for ScriptedGateway {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn describe(&self, image_url: &str, prompt: &str) -> OraResult<String> {
            self.seen
                .lock()
                .unwrap()
                .push((image_url.to_string(), prompt.to_string()));
            match &self.answer {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(OraError::Gateway {
                    provider: "scripted".into(),
                    status: 500,
                    message: e.to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn sends_fixed_prompt_and_parses() {
        let gateway = Arc::new(ScriptedGateway {
            answer: Ok("Summary: Mild irritation noted. Confidence: 42 Recommendations: Monitor and revisit in two weeks.".into()),
            seen: Mutex::new(Vec::new()),
        });
        let analyzer = Analyzer::new(gateway.clone());
        let result = analyzer.analyze("https://img/1.jpg").await.unwrap();

        assert_eq!(result.summary, "Mild irritation noted.");
        assert_eq!(result.confidence, 42);
        assert_eq!(result.recommendations, "Monitor and revisit in two weeks.");

        let seen = gateway.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "https://img/1.jpg");
        assert_eq!(seen[0].1, ANALYSIS_PROMPT);
    }

    #[tokio::test]
    async fn gateway_failure_propagates() {
        let gateway = Arc::new(ScriptedGateway {
            answer: Err(OraError::Gateway {
                provider: "scripted".into(),
                status: 529,
                message: "overloaded".into(),
            }),
            seen: Mutex::new(Vec::new()),
        });
        let analyzer = Analyzer::new(gateway);
        assert!(analyzer.analyze("https://img/1.jpg").await.is_err());
    }
}
