//! `oracare-config`: OraCare runtime configuration.
//!
//! Provides:
//! - Typed config schema (server, vision, firebase, workflow, logging)
//! - YAML loading from `~/.oracare/config.yaml`
//! - `${ENV_VAR}` substitution and `ORACARE_*` overrides
//! - Default value application
//! - Validation with per-field messages

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{
    apply_env_overrides, apply_env_overrides_with, contains_env_var_reference, resolve_env_vars,
    resolve_env_vars_with, MissingEnvVarError,
};
pub use io::{config_dir, config_file_path, load_config};
pub use schema::{
    BackendKind, FirebaseConfig, LoggingConfig, OraCareConfig, ServerConfig, VisionConfig,
    WorkflowConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Load, substitute env vars, apply overrides and defaults, then validate.
///
/// This is the main entry point for loading a config at runtime. Validation
/// problems are returned alongside the config; the caller logs them once its
/// subscriber is up (see [`ValidationReport::log`]) and decides what is fatal.
pub async fn load_and_prepare(path: &Path) -> Result<(OraCareConfig, ValidationReport)> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let raw_config = load_config(path).await?;
    prepare_with(raw_config, &env)
}

/// The processing pipeline of [`load_and_prepare`] against a given environment.
pub fn prepare_with(
    raw_config: OraCareConfig,
    env: &HashMap<String, String>,
) -> Result<(OraCareConfig, ValidationReport)> {
    // Serialize to Value for the env substitution pass.
    let value: Value =
        serde_json::to_value(&raw_config).context("Failed to serialize config for processing")?;
    let value = resolve_env_vars_with(&value, env).context("Failed to resolve env vars in config")?;
    let config: OraCareConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_env_overrides_with(config, env);
    let config = apply_all_defaults(config);

    let report = validate(&config);
    Ok((config, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn pipeline_substitutes_overrides_and_defaults() {
        let raw: OraCareConfig = serde_yaml::from_str(
            r#"
vision:
  apiKey: ${VISION_KEY}
firebase:
  apiKey: ${FB_KEY}
  projectId: oracare-dev
"#,
        )
        .unwrap();
        let (cfg, report) = prepare_with(
            raw,
            &env(&[("VISION_KEY", "sk-ant-x"), ("FB_KEY", "AIzaX"), ("ORACARE_PORT", "9000")]),
        )
        .unwrap();

        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert_eq!(cfg.vision.as_ref().unwrap().api_key.as_deref(), Some("sk-ant-x"));
        assert_eq!(cfg.server.as_ref().unwrap().port, Some(9000));
        assert_eq!(
            cfg.firebase.as_ref().unwrap().storage_bucket.as_deref(),
            Some("oracare-dev.appspot.com")
        );
    }

    #[test]
    fn pipeline_fails_on_missing_reference() {
        let raw: OraCareConfig = serde_yaml::from_str("vision:\n  apiKey: ${NOPE}\n").unwrap();
        assert!(prepare_with(raw, &HashMap::new()).is_err());
    }

    #[test]
    fn pipeline_reports_missing_key() {
        let raw: OraCareConfig = serde_yaml::from_str("backend: memory\n").unwrap();
        let (_, report) = prepare_with(raw, &HashMap::new()).unwrap();
        assert!(report.has_error_at("vision.apiKey"));
        assert!(!report.has_error_at("firebase.apiKey"));
    }
}
