//! Image analysis endpoint (`POST /api/analyze`).

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use oracare_logging::redact_sensitive_data;

use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub image_url: Option<String>,
}

impl AnalyzeRequest {
    /// Pull a usable image URL out of a raw body, if there is one.
    fn image_url_from(body: &[u8]) -> Option<String> {
        if body.is_empty() {
            return None;
        }
        let request: AnalyzeRequest = serde_json::from_slice(body).ok()?;
        request
            .image_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
    }
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

/// Handler for `POST /api/analyze`.
///
/// The body is read raw so that a missing or malformed payload maps to 400
/// rather than the extractor's own rejection codes.
pub async fn analyze(State(state): State<GatewayState>, body: Bytes) -> Response {
    let Some(image_url) = AnalyzeRequest::image_url_from(&body) else {
        warn!(body_len = body.len(), "Analyze request without imageUrl");
        return message(StatusCode::BAD_REQUEST, "Image URL is required");
    };

    // Storage download URLs carry an access token.
    let logged_url = redact_sensitive_data(&image_url);
    info!(image_url = %logged_url, "Analyzing image");
    match state.analyzer.analyze(&image_url).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            error!(error = %e, image_url = %logged_url, "Analysis error");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Failed to analyze image")
        }
    }
}

/// Any method other than POST on the analyze route.
pub async fn method_not_allowed() -> Response {
    message(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::Request,
        Router,
    };
    use oracare_core::{OraError, OraResult, VisionGateway};
    use oracare_understanding::Analyzer;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::server::build_router;

    struct FixedGateway(Option<&'static str>);

    #[async_trait]
    impl VisionGateway for FixedGateway {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn describe(&self, _image_url: &str, _prompt: &str) -> OraResult<String> {
            match self.0 {
                Some(text) => Ok(text.to_string()),
                None => Err(OraError::Gateway {
                    provider: "fixed".into(),
                    status: 401,
                    message: "invalid x-api-key".into(),
                }),
            }
        }
    }

    fn app(answer: Option<&'static str>) -> Router {
        let analyzer = Analyzer::new(Arc::new(FixedGateway(answer)));
        build_router(GatewayState::new(Arc::new(analyzer)))
    }

    async fn call(app: Router, method: &str, body: Body) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri("/api/analyze")
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn get_is_method_not_allowed() {
        let (status, body) = call(app(Some("")), "GET", Body::empty()).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["message"], "Method not allowed");
    }

    #[tokio::test]
    async fn empty_post_is_bad_request() {
        let (status, body) = call(app(Some("")), "POST", Body::empty()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Image URL is required");
    }

    #[tokio::test]
    async fn blank_or_malformed_image_url_is_bad_request() {
        for payload in [r#"{"imageUrl":"   "}"#, r#"{"other":1}"#, "not json", r#"{"imageUrl":5}"#] {
            let (status, _) = call(app(Some("")), "POST", Body::from(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");
        }
    }

    #[tokio::test]
    async fn returns_parsed_result() {
        let answer = "Summary: Mild irritation noted. Confidence: 42 Recommendations: Monitor and revisit in two weeks.";
        let (status, body) = call(
            app(Some(answer)),
            "POST",
            Body::from(r#"{"imageUrl":"https://img/1.jpg"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"], "Mild irritation noted.");
        assert_eq!(body["confidence"], 42);
        assert_eq!(body["recommendations"], "Monitor and revisit in two weeks.");
    }

    #[tokio::test]
    async fn gateway_failure_is_generic_500() {
        let (status, body) = call(
            app(None),
            "POST",
            Body::from(r#"{"imageUrl":"https://img/1.jpg"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Failed to analyze image");
        assert!(!body.to_string().contains("x-api-key"));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let req = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let resp = app(Some("")).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "oracare");
    }
}
