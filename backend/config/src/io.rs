//! Locating and reading the config file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{debug, info};

use crate::schema::OraCareConfig;

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the OraCare config directory.
/// Priority: `ORACARE_CONFIG_DIR` env > `~/.oracare/`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ORACARE_CONFIG_DIR") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    match dirs::home_dir() {
        Some(home) => home.join(".oracare"),
        None => PathBuf::from(".oracare"),
    }
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Load and parse the config from disk.
///
/// Returns `Ok(Default::default())` if the file doesn't exist (first run).
pub async fn load_config(path: &Path) -> Result<OraCareConfig> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(OraCareConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    // An empty file parses as YAML null.
    if raw.trim().is_empty() {
        return Ok(OraCareConfig::default());
    }

    let config: OraCareConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}
