//! Environment handling for config values.
//!
//! `${VAR_NAME}` in any string value is replaced at load time. Only uppercase
//! `[A-Z_][A-Z0-9_]*` names are matched, and `$${VAR}` escapes to a literal
//! `${VAR}`. After substitution, a fixed set of `ORACARE_*` variables (plus
//! the usual provider key variables) override individual fields.

use std::collections::HashMap;

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use tracing::debug;

use crate::schema::{
    FirebaseConfig, LoggingConfig, OraCareConfig, ServerConfig, VisionConfig, WorkflowConfig,
};

/// A reference, optionally preceded by the `$` escape.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in a config JSON value tree.
///
/// Only string leaves are processed. Fails if a referenced variable is unset
/// or empty.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    substitute_value(value, &std::env::vars().collect(), "")
}

/// Substitute env vars using a provided map.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => {
            let result: Result<Vec<_>> = arr
                .iter()
                .enumerate()
                .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
                .collect();
            Ok(Value::Array(result?))
        }
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let var_name = &caps[1];
        if caps[0].starts_with("$$") {
            return format!("${{{var_name}}}");
        }
        match env.get(var_name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: var_name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(substituted.into_owned())
}

/// Check whether a string contains any env var references.
pub fn contains_env_var_reference(s: &str) -> bool {
    s.contains('$') && ENV_VAR_PATTERN.is_match(s)
}

/// Apply environment overrides from the process environment.
pub fn apply_env_overrides(config: OraCareConfig) -> OraCareConfig {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Apply environment overrides from a provided map.
///
/// Empty values are ignored. `ORACARE_VISION_API_KEY` wins over the
/// provider-specific key variables.
pub fn apply_env_overrides_with(
    mut config: OraCareConfig,
    env: &HashMap<String, String>,
) -> OraCareConfig {
    let get = |name: &str| {
        env.get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    if let Some(bind) = get("ORACARE_BIND") {
        config.server.get_or_insert_with(ServerConfig::default).bind = Some(bind);
    }
    if let Some(port) = get("ORACARE_PORT") {
        match port.parse::<u16>() {
            Ok(port) => config.server.get_or_insert_with(ServerConfig::default).port = Some(port),
            Err(_) => debug!(value = %port, "Ignoring non-numeric ORACARE_PORT"),
        }
    }

    if let Some(provider) = get("ORACARE_VISION_PROVIDER") {
        config.vision.get_or_insert_with(VisionConfig::default).provider = Some(provider);
    }
    if let Some(model) = get("ORACARE_VISION_MODEL") {
        config.vision.get_or_insert_with(VisionConfig::default).model = Some(model);
    }
    let provider = config
        .vision
        .as_ref()
        .and_then(|v| v.provider.clone())
        .unwrap_or_else(|| "anthropic".to_string());
    let provider_key = match provider.as_str() {
        "openai" => get("OPENAI_API_KEY"),
        _ => get("ANTHROPIC_API_KEY"),
    };
    if let Some(key) = get("ORACARE_VISION_API_KEY").or(provider_key) {
        let vision = config.vision.get_or_insert_with(VisionConfig::default);
        // A key written in the file stays unless the generic override is set.
        if vision.api_key.is_none() || get("ORACARE_VISION_API_KEY").is_some() {
            vision.api_key = Some(key);
        }
    }

    if let Some(key) = get("ORACARE_FIREBASE_API_KEY") {
        config.firebase.get_or_insert_with(FirebaseConfig::default).api_key = Some(key);
    }
    if let Some(project) = get("ORACARE_FIREBASE_PROJECT_ID") {
        config.firebase.get_or_insert_with(FirebaseConfig::default).project_id = Some(project);
    }
    if let Some(bucket) = get("ORACARE_FIREBASE_STORAGE_BUCKET") {
        config.firebase.get_or_insert_with(FirebaseConfig::default).storage_bucket = Some(bucket);
    }

    if let Some(url) = get("ORACARE_GATEWAY_URL") {
        config.workflow.get_or_insert_with(WorkflowConfig::default).gateway_url = Some(url);
    }

    if let Some(level) = get("ORACARE_LOG_LEVEL") {
        config.logging.get_or_insert_with(LoggingConfig::default).level = Some(level);
    }
    if let Some(dir) = get("ORACARE_LOG_DIR") {
        config.logging.get_or_insert_with(LoggingConfig::default).dir = Some(dir);
    }

    config
}
