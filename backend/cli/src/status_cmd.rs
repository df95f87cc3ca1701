//! CLI Status Command
//!
//! Asks a running gateway for its health report.

use anyhow::Result;
use serde_json::Value;

use oracare_config::OraCareConfig;

use crate::terminal_output::{note_success, note_warn};

/// Where the gateway should be: `workflow.gatewayUrl`, else the local server.
pub fn health_url(config: &OraCareConfig) -> String {
    if let Some(url) = config
        .workflow
        .as_ref()
        .and_then(|w| w.gateway_url.as_deref())
        .filter(|u| !u.trim().is_empty())
    {
        return format!("{}/api/health", url.trim_end_matches('/'));
    }
    let server = config.server.clone().unwrap_or_default();
    let bind = match server.bind.as_deref() {
        None | Some("0.0.0.0") => "127.0.0.1".to_string(),
        Some(bind) => bind.to_string(),
    };
    format!("http://{}:{}/api/health", bind, server.port.unwrap_or(3000))
}

pub async fn run(config: &OraCareConfig) -> Result<()> {
    let url = health_url(config);
    match reqwest::Client::new().get(&url).send().await {
        Ok(resp) if resp.status().is_success() => {
            let body: Value = resp.json().await?;
            note_success(&format!(
                "OraCare gateway is up (version {}, uptime {}s)",
                body["version"].as_str().unwrap_or("?"),
                body["uptime_seconds"].as_u64().unwrap_or(0)
            ));
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Ok(resp) => note_warn(&format!("Gateway at {url} answered {}", resp.status())),
        Err(_) => note_warn(&format!("OraCare gateway is not running at {url}")),
    }
    Ok(())
}
