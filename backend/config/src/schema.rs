//! OraCare runtime configuration schema.
//!
//! Every section is optional in the file; [`crate::defaults`] fills the gaps
//! after loading.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OraCareConfig {
    /// Analysis gateway HTTP server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// Vision model used by the analyzer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision: Option<VisionConfig>,

    /// Firebase project for identity, storage and records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firebase: Option<FirebaseConfig>,

    /// Which service implementations back the workflows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<WorkflowConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

impl OraCareConfig {
    pub fn backend(&self) -> BackendKind {
        self.backend.unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Bind address, e.g. `127.0.0.1`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

// ---------------------------------------------------------------------------
// Vision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionConfig {
    /// "anthropic" | "openai"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Override of the provider's API base URL (proxies, tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Firebase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseConfig {
    /// Web API key of the project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Defaults to `{projectId}.appspot.com`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_bucket: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Firebase,
    /// In-process stores; nothing survives the process
    Memory,
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowConfig {
    /// First path level of uploaded images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_prefix: Option<String>,

    /// Firestore collection holding analysis records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    /// When set, analysis goes through a running gateway at this URL
    /// instead of calling the vision model directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Directory for daily-rolling JSON log files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}
