use std::sync::Arc;

use oracare_core::{AnalysisClient, DocumentStore, IdentityProvider, ObjectStore};

/// The external services every workflow talks to.
#[derive(Clone)]
pub struct Services {
    pub identity: Arc<dyn IdentityProvider>,
    pub objects: Arc<dyn ObjectStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub analyzer: Arc<dyn AnalysisClient>,
}

/// Deployment knobs for the workflows.
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    /// First path level of uploaded images.
    pub upload_prefix: String,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            upload_prefix: "analysis".to_string(),
        }
    }
}
