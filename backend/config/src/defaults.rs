//! Config defaults: fills every section the file left out.

use crate::schema::{
    FirebaseConfig, LoggingConfig, OraCareConfig, ServerConfig, VisionConfig, WorkflowConfig,
};

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_VISION_PROVIDER: &str = "anthropic";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-opus-20240229";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_UPLOAD_PREFIX: &str = "analysis";
pub const DEFAULT_COLLECTION: &str = "analyses";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: OraCareConfig) -> OraCareConfig {
    let config = apply_server_defaults(config);
    let config = apply_vision_defaults(config);
    let config = apply_firebase_defaults(config);
    let config = apply_workflow_defaults(config);
    apply_logging_defaults(config)
}

fn apply_server_defaults(mut config: OraCareConfig) -> OraCareConfig {
    let server = config.server.get_or_insert_with(ServerConfig::default);
    server.bind.get_or_insert_with(|| DEFAULT_BIND.to_string());
    server.port.get_or_insert(DEFAULT_PORT);
    config
}

/// The model default depends on the provider.
fn apply_vision_defaults(mut config: OraCareConfig) -> OraCareConfig {
    let vision = config.vision.get_or_insert_with(VisionConfig::default);
    let provider = vision
        .provider
        .get_or_insert_with(|| DEFAULT_VISION_PROVIDER.to_string())
        .clone();
    if vision.model.is_none() {
        let model = match provider.as_str() {
            "openai" => DEFAULT_OPENAI_MODEL,
            _ => DEFAULT_ANTHROPIC_MODEL,
        };
        vision.model = Some(model.to_string());
    }
    vision.max_tokens.get_or_insert(DEFAULT_MAX_TOKENS);
    config
}

/// Derive the storage bucket from the project id when absent.
fn apply_firebase_defaults(mut config: OraCareConfig) -> OraCareConfig {
    let firebase = config.firebase.get_or_insert_with(FirebaseConfig::default);
    if firebase.storage_bucket.is_none() {
        if let Some(project) = &firebase.project_id {
            firebase.storage_bucket = Some(format!("{project}.appspot.com"));
        }
    }
    config
}

fn apply_workflow_defaults(mut config: OraCareConfig) -> OraCareConfig {
    let workflow = config.workflow.get_or_insert_with(WorkflowConfig::default);
    workflow
        .upload_prefix
        .get_or_insert_with(|| DEFAULT_UPLOAD_PREFIX.to_string());
    workflow
        .collection
        .get_or_insert_with(|| DEFAULT_COLLECTION.to_string());
    config
}

fn apply_logging_defaults(mut config: OraCareConfig) -> OraCareConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_empty_config() {
        let cfg = apply_all_defaults(OraCareConfig::default());
        let server = cfg.server.unwrap();
        assert_eq!(server.bind.as_deref(), Some(DEFAULT_BIND));
        assert_eq!(server.port, Some(DEFAULT_PORT));
        let vision = cfg.vision.unwrap();
        assert_eq!(vision.provider.as_deref(), Some("anthropic"));
        assert_eq!(vision.model.as_deref(), Some(DEFAULT_ANTHROPIC_MODEL));
        assert_eq!(vision.max_tokens, Some(1024));
        let workflow = cfg.workflow.unwrap();
        assert_eq!(workflow.upload_prefix.as_deref(), Some("analysis"));
        assert_eq!(workflow.collection.as_deref(), Some("analyses"));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("info"));
    }

    #[test]
    fn openai_gets_its_own_model() {
        let mut cfg = OraCareConfig::default();
        cfg.vision = Some(VisionConfig {
            provider: Some("openai".into()),
            ..Default::default()
        });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.vision.unwrap().model.as_deref(), Some(DEFAULT_OPENAI_MODEL));
    }

    #[test]
    fn bucket_follows_project() {
        let mut cfg = OraCareConfig::default();
        cfg.firebase = Some(FirebaseConfig {
            project_id: Some("oracare-dev".into()),
            ..Default::default()
        });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(
            cfg.firebase.unwrap().storage_bucket.as_deref(),
            Some("oracare-dev.appspot.com")
        );
    }

    #[test]
    fn does_not_override_user_values() {
        let mut cfg = OraCareConfig::default();
        cfg.server = Some(ServerConfig {
            port: Some(8080),
            ..Default::default()
        });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.server.unwrap().port, Some(8080));
    }
}
