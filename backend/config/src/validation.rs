//! Config validation with field paths in every message.

use thiserror::Error;

use crate::schema::{BackendKind, OraCareConfig};

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// All errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_error_at(&self, path: &str) -> bool {
        self.errors.iter().any(|e| e.path == path)
    }

    pub fn log(&self) {
        for warning in &self.warnings {
            tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
        }
        for error in &self.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).map(str::is_empty).unwrap_or(true)
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &OraCareConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_vision(config, &mut report);
    validate_firebase(config, &mut report);
    validate_workflow(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_server(config: &OraCareConfig, report: &mut ValidationReport) {
    let Some(server) = &config.server else { return };
    if let Some(port) = server.port {
        if port == 0 {
            report.error("server.port", "Port must be > 0");
        } else if port < 1024 {
            report.warn(
                "server.port",
                format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
            );
        }
    }
    if let Some(bind) = &server.bind {
        if bind.parse::<std::net::IpAddr>().is_err() {
            report.error("server.bind", format!("'{bind}' is not an IP address"));
        }
    }
}

/// A vision key is only needed when this process talks to the model itself.
fn validate_vision(config: &OraCareConfig, report: &mut ValidationReport) {
    let uses_remote_gateway = config
        .workflow
        .as_ref()
        .map(|w| !is_blank(&w.gateway_url))
        .unwrap_or(false);

    let vision = config.vision.clone().unwrap_or_default();
    if is_blank(&vision.api_key) {
        if uses_remote_gateway {
            report.warn(
                "vision.apiKey",
                "No vision API key; `serve` will not be able to analyze images",
            );
        } else {
            report.error(
                "vision.apiKey",
                "Vision API key is required (set ANTHROPIC_API_KEY or vision.apiKey)",
            );
        }
    }
    if let Some(provider) = &vision.provider {
        if !matches!(provider.as_str(), "anthropic" | "claude" | "openai") {
            report.error(
                "vision.provider",
                format!("Unknown vision provider '{provider}'. Use 'anthropic' or 'openai'"),
            );
        }
    }
    if vision.max_tokens == Some(0) {
        report.error("vision.maxTokens", "maxTokens must be >= 1");
    }
}

fn validate_firebase(config: &OraCareConfig, report: &mut ValidationReport) {
    if config.backend() != BackendKind::Firebase {
        return;
    }
    let firebase = config.firebase.clone().unwrap_or_default();
    if is_blank(&firebase.api_key) {
        report.error("firebase.apiKey", "Firebase web API key is required");
    }
    if is_blank(&firebase.project_id) {
        report.error("firebase.projectId", "Firebase project id is required");
    }
    if is_blank(&firebase.storage_bucket) {
        report.error("firebase.storageBucket", "Firebase storage bucket is required");
    }
}

fn validate_workflow(config: &OraCareConfig, report: &mut ValidationReport) {
    let Some(workflow) = &config.workflow else { return };
    if let Some(collection) = &workflow.collection {
        if collection.trim().is_empty() || collection.contains('/') {
            report.error(
                "workflow.collection",
                "Collection must be a single non-empty path segment",
            );
        }
    }
    if let Some(url) = &workflow.gateway_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            report.error("workflow.gatewayUrl", "Gateway URL must start with http:// or https://");
        }
    }
}

fn validate_logging(config: &OraCareConfig, report: &mut ValidationReport) {
    let Some(level) = config.logging.as_ref().and_then(|l| l.level.as_deref()) else {
        return;
    };
    if !matches!(
        level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        report.warn("logging.level", format!("Unknown log level '{level}'; using info"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::apply_all_defaults;
    use crate::schema::{FirebaseConfig, ServerConfig, VisionConfig, WorkflowConfig};

    fn complete() -> OraCareConfig {
        let mut cfg = OraCareConfig::default();
        cfg.vision = Some(VisionConfig {
            api_key: Some("sk-ant-test".into()),
            ..Default::default()
        });
        cfg.firebase = Some(FirebaseConfig {
            api_key: Some("AIzaTest".into()),
            project_id: Some("oracare-dev".into()),
            storage_bucket: None,
        });
        apply_all_defaults(cfg)
    }

    #[test]
    fn complete_config_is_valid() {
        let report = validate(&complete());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn missing_api_key_is_error() {
        let mut cfg = complete();
        cfg.vision.as_mut().unwrap().api_key = None;
        let report = validate(&cfg);
        assert!(report.has_error_at("vision.apiKey"));
    }

    #[test]
    fn missing_api_key_with_remote_gateway_is_warning() {
        let mut cfg = complete();
        cfg.vision.as_mut().unwrap().api_key = Some("  ".into());
        cfg.workflow = Some(WorkflowConfig {
            gateway_url: Some("http://localhost:3000".into()),
            ..Default::default()
        });
        let report = validate(&cfg);
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert_eq!(report.warnings[0].path, "vision.apiKey");
    }

    #[test]
    fn firebase_fields_required_only_for_firebase_backend() {
        let mut cfg = complete();
        cfg.firebase = None;
        let report = validate(&cfg);
        assert!(report.has_error_at("firebase.apiKey"));
        assert!(report.has_error_at("firebase.projectId"));

        cfg.backend = Some(BackendKind::Memory);
        assert!(validate(&cfg).is_valid());
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = complete();
        cfg.server = Some(ServerConfig {
            bind: Some("localhost:3000".into()),
            port: Some(0),
        });
        cfg.vision.as_mut().unwrap().provider = Some("gemini".into());
        cfg.workflow.as_mut().unwrap().collection = Some("a/b".into());
        let report = validate(&cfg);
        for path in ["server.bind", "server.port", "vision.provider", "workflow.collection"] {
            assert!(report.has_error_at(path), "missing error at {path}");
        }
    }
}
