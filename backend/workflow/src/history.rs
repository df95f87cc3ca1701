//! The analysis history page.

use tracing::{error, info};

use oracare_core::{AnalysisRecord, OraResult, Session};

use crate::services::Services;

pub const FETCH_FAILED: &str = "Failed to fetch analysis history";
pub const DELETE_FAILED: &str = "Failed to delete analysis";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStage {
    Idle,
    Loading,
    Listed,
    Failed,
}

pub struct HistoryWorkflow {
    services: Services,
    stage: HistoryStage,
    records: Vec<AnalysisRecord>,
    error: Option<String>,
}

impl HistoryWorkflow {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            stage: HistoryStage::Idle,
            records: Vec::new(),
            error: None,
        }
    }

    pub fn stage(&self) -> HistoryStage {
        self.stage
    }

    /// Records of the last successful load, newest first.
    pub fn records(&self) -> &[AnalysisRecord] {
        &self.records
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn load(&mut self, session: &Session) -> OraResult<&[AnalysisRecord]> {
        self.stage = HistoryStage::Loading;
        self.error = None;

        match self
            .services
            .documents
            .list_for_user(session, session.uid())
            .await
        {
            Ok(records) => {
                info!(count = records.len(), "Fetched analysis history");
                self.records = records;
                self.stage = HistoryStage::Listed;
                Ok(&self.records)
            }
            Err(e) => {
                error!(error = %e, "Error fetching analyses");
                self.records.clear();
                self.error = Some(FETCH_FAILED.to_string());
                self.stage = HistoryStage::Failed;
                Err(e)
            }
        }
    }

    /// Delete one record. On failure the listing stays as it was.
    pub async fn delete(&mut self, session: &Session, id: &str) -> OraResult<()> {
        match self.services.documents.delete(session, id).await {
            Ok(()) => {
                self.records.retain(|r| r.id != id);
                self.error = None;
                info!(id, "Deleted analysis");
                Ok(())
            }
            Err(e) => {
                error!(id, error = %e, "Error deleting analysis");
                self.error = Some(DELETE_FAILED.to_string());
                Err(e)
            }
        }
    }
}
