//! Wires configured service implementations into the workflows.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use oracare_config::{BackendKind, OraCareConfig};
use oracare_core::{AnalysisClient, IdentityProvider};
use oracare_firebase::{FirebaseProject, MemoryDocumentStore, MemoryIdentity, MemoryObjectStore};
use oracare_understanding::{Analyzer, VisionClient, VisionProvider};
use oracare_workflow::{HttpAnalysisClient, Services, WorkflowOptions};

fn required<'a>(value: &'a Option<String>, path: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => bail!("{path} is not configured"),
    }
}

/// The in-process analyzer talking to the configured vision model.
pub fn build_analyzer(config: &OraCareConfig) -> Result<Analyzer> {
    let vision = config.vision.clone().unwrap_or_default();
    let api_key = required(&vision.api_key, "vision.apiKey")
        .context("Set ANTHROPIC_API_KEY or vision.apiKey in config.yaml")?;
    let provider: VisionProvider = vision
        .provider
        .as_deref()
        .unwrap_or("anthropic")
        .parse()?;

    let mut client = VisionClient::new(provider, api_key);
    if let Some(model) = &vision.model {
        client = client.with_model(model);
    }
    if let Some(max_tokens) = vision.max_tokens {
        client = client.with_max_tokens(max_tokens);
    }
    if let Some(url) = &vision.base_url {
        client = client.with_base_url(url);
    }
    info!(provider = provider.as_str(), model = %client.model(), "Vision client ready");
    Ok(Analyzer::new(Arc::new(client)))
}

/// A running gateway when `workflow.gatewayUrl` is set, the model otherwise.
pub fn build_analysis_client(config: &OraCareConfig) -> Result<Arc<dyn AnalysisClient>> {
    let gateway_url = config
        .workflow
        .as_ref()
        .and_then(|w| w.gateway_url.as_deref())
        .filter(|u| !u.trim().is_empty());
    match gateway_url {
        Some(url) => {
            info!(url, "Analyzing through remote gateway");
            Ok(Arc::new(HttpAnalysisClient::new(url)))
        }
        None => Ok(Arc::new(build_analyzer(config)?)),
    }
}

pub fn workflow_options(config: &OraCareConfig) -> WorkflowOptions {
    let mut options = WorkflowOptions::default();
    if let Some(prefix) = config.workflow.as_ref().and_then(|w| w.upload_prefix.clone()) {
        options.upload_prefix = prefix;
    }
    options
}

/// Identity, storage, records, and analysis for the configured backend.
pub fn build_services(config: &OraCareConfig) -> Result<Services> {
    let analyzer = build_analysis_client(config)?;

    match config.backend() {
        BackendKind::Memory => {
            info!("Using in-memory backend; nothing is persisted");
            Ok(Services {
                identity: Arc::new(MemoryIdentity::new()),
                objects: Arc::new(MemoryObjectStore::new()),
                documents: Arc::new(MemoryDocumentStore::new()),
                analyzer,
            })
        }
        BackendKind::Firebase => {
            let firebase = config.firebase.clone().unwrap_or_default();
            let project = FirebaseProject {
                api_key: required(&firebase.api_key, "firebase.apiKey")?.to_string(),
                project_id: required(&firebase.project_id, "firebase.projectId")?.to_string(),
                storage_bucket: required(&firebase.storage_bucket, "firebase.storageBucket")?
                    .to_string(),
            };
            let collection = config
                .workflow
                .as_ref()
                .and_then(|w| w.collection.as_deref())
                .unwrap_or(oracare_firebase::firestore::DEFAULT_COLLECTION);
            info!(project = %project.project_id, collection, "Using Firebase backend");
            Ok(Services {
                identity: Arc::new(project.auth()),
                objects: Arc::new(project.storage()),
                documents: Arc::new(project.firestore(collection)),
                analyzer,
            })
        }
    }
}

/// Identity provider only, for account commands that never analyze.
pub fn build_identity(config: &OraCareConfig) -> Result<Arc<dyn IdentityProvider>> {
    match config.backend() {
        BackendKind::Memory => Ok(Arc::new(MemoryIdentity::new())),
        BackendKind::Firebase => {
            let firebase = config.firebase.clone().unwrap_or_default();
            let api_key = required(&firebase.api_key, "firebase.apiKey")?;
            Ok(Arc::new(oracare_firebase::FirebaseAuth::new(api_key)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracare_config::{FirebaseConfig, VisionConfig, WorkflowConfig};

    fn memory_config() -> OraCareConfig {
        OraCareConfig {
            backend: Some(BackendKind::Memory),
            vision: Some(VisionConfig {
                api_key: Some("sk-ant-test".into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn memory_backend_builds() {
        let services = build_services(&memory_config()).unwrap();
        assert_eq!(services.identity.name(), "memory");
    }

    #[test]
    fn analyzer_needs_api_key() {
        let mut cfg = memory_config();
        cfg.vision = None;
        let err = format!("{:#}", build_analyzer(&cfg).err().unwrap());
        assert!(err.contains("vision.apiKey"), "{err}");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let mut cfg = memory_config();
        cfg.vision.as_mut().unwrap().provider = Some("gemini".into());
        assert!(build_analyzer(&cfg).is_err());
    }

    #[test]
    fn gateway_url_skips_vision_key() {
        let cfg = OraCareConfig {
            backend: Some(BackendKind::Memory),
            workflow: Some(WorkflowConfig {
                gateway_url: Some("http://localhost:3000".into()),
                upload_prefix: Some("uploads".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(build_services(&cfg).is_ok());
        assert_eq!(workflow_options(&cfg).upload_prefix, "uploads");
    }

    #[test]
    fn firebase_backend_needs_project() {
        let mut cfg = memory_config();
        cfg.backend = Some(BackendKind::Firebase);
        cfg.firebase = Some(FirebaseConfig {
            api_key: Some("AIzaTest".into()),
            ..Default::default()
        });
        let err = format!("{:#}", build_services(&cfg).err().unwrap());
        assert!(err.contains("firebase.projectId"), "{err}");
        assert!(build_identity(&cfg).is_ok());
    }
}
