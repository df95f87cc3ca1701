//! The "new analysis" page as a state machine.
//!
//! ```text
//! Idle ──select_file──▶ FileSelected ──analyze──▶ Uploading ──▶ Analyzing ──▶ ResultShown
//!   │                        ▲                                      │
//!   └─open_camera─▶ CameraOpen ─capture─┘                           └──▶ Failed
//! ```
//!
//! Upload and record write are two independent calls. When anything after a
//! successful upload fails, the uploaded object is deleted again on a
//! best-effort basis; a failed cleanup is logged and otherwise ignored.

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use oracare_core::{AnalysisRecord, AnalysisResult, NewAnalysisRecord, OraError, OraResult, Session};

use crate::capture::{object_path, ImageFile};
use crate::services::{Services, WorkflowOptions};

pub const NOT_AN_IMAGE: &str = "Please select an image file";
pub const NO_IMAGE_SELECTED: &str = "Please select or capture an image first";
pub const ANALYSIS_FAILED: &str = "Failed to analyze image. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    Idle,
    CameraOpen,
    FileSelected,
    Uploading,
    Analyzing,
    ResultShown,
    Failed,
}

pub struct AnalysisWorkflow {
    services: Services,
    options: WorkflowOptions,
    stage: watch::Sender<AnalysisStage>,
    selected: Option<ImageFile>,
    result: Option<AnalysisResult>,
    record: Option<AnalysisRecord>,
    error: Option<String>,
}

impl AnalysisWorkflow {
    pub fn new(services: Services, options: WorkflowOptions) -> Self {
        let (stage, _) = watch::channel(AnalysisStage::Idle);
        Self {
            services,
            options,
            stage,
            selected: None,
            result: None,
            record: None,
            error: None,
        }
    }

    pub fn stage(&self) -> AnalysisStage {
        *self.stage.borrow()
    }

    /// Follow stage changes, e.g. to render progress.
    pub fn subscribe(&self) -> watch::Receiver<AnalysisStage> {
        self.stage.subscribe()
    }

    pub fn selected(&self) -> Option<&ImageFile> {
        self.selected.as_ref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn record(&self) -> Option<&AnalysisRecord> {
        self.record.as_ref()
    }

    /// User-facing message of the last failure.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn set_stage(&self, stage: AnalysisStage) {
        debug!(?stage, "Analysis stage");
        self.stage.send_replace(stage);
    }

    /// Choose a file to analyze. Non-images are refused and leave the stage alone.
    pub fn select_file(&mut self, file: ImageFile) -> OraResult<()> {
        if !file.is_image() {
            warn!(name = %file.name, content_type = %file.content_type, "Rejected non-image file");
            self.error = Some(NOT_AN_IMAGE.to_string());
            return Err(OraError::InvalidInput(NOT_AN_IMAGE.into()));
        }
        self.selected = Some(file);
        self.result = None;
        self.record = None;
        self.error = None;
        self.set_stage(AnalysisStage::FileSelected);
        Ok(())
    }

    pub fn open_camera(&mut self) {
        self.set_stage(AnalysisStage::CameraOpen);
    }

    pub fn cancel_camera(&mut self) {
        if self.stage() != AnalysisStage::CameraOpen {
            return;
        }
        let next = if self.selected.is_some() {
            AnalysisStage::FileSelected
        } else {
            AnalysisStage::Idle
        };
        self.set_stage(next);
    }

    /// Take a frame from the open camera as the selected image.
    pub fn capture(&mut self, frame: Vec<u8>) -> OraResult<()> {
        if self.stage() != AnalysisStage::CameraOpen {
            return Err(OraError::InvalidInput("Camera is not open".into()));
        }
        if frame.is_empty() {
            return Err(OraError::InvalidInput("Camera returned an empty frame".into()));
        }
        self.select_file(ImageFile::captured(frame))
    }

    pub fn reset(&mut self) {
        self.selected = None;
        self.result = None;
        self.record = None;
        self.error = None;
        self.set_stage(AnalysisStage::Idle);
    }

    /// Upload the selected image, analyze it, and store the record.
    pub async fn analyze(&mut self, session: &Session) -> OraResult<AnalysisRecord> {
        let Some(file) = self.selected.clone() else {
            self.error = Some(NO_IMAGE_SELECTED.to_string());
            return Err(OraError::InvalidInput(NO_IMAGE_SELECTED.into()));
        };
        self.error = None;
        self.result = None;
        self.record = None;

        match self.run(session, &file).await {
            Ok(record) => {
                info!(id = %record.id, confidence = record.result.confidence, "Analysis stored");
                self.record = Some(record.clone());
                self.set_stage(AnalysisStage::ResultShown);
                Ok(record)
            }
            Err(e) => {
                error!(error = %e, "Analysis error");
                self.error = Some(ANALYSIS_FAILED.to_string());
                self.set_stage(AnalysisStage::Failed);
                Err(e)
            }
        }
    }

    async fn run(&mut self, session: &Session, file: &ImageFile) -> OraResult<AnalysisRecord> {
        self.set_stage(AnalysisStage::Uploading);
        let path = object_path(
            &self.options.upload_prefix,
            session.uid(),
            Utc::now().timestamp_millis(),
            &file.name,
        );
        self.services
            .objects
            .upload(session, &path, &file.bytes, &file.content_type)
            .await?;

        match self.analyze_uploaded(session, &path).await {
            Ok(record) => Ok(record),
            Err(e) => {
                self.discard_upload(session, &path).await;
                Err(e)
            }
        }
    }

    async fn analyze_uploaded(&mut self, session: &Session, path: &str) -> OraResult<AnalysisRecord> {
        let image_url = self.services.objects.download_url(session, path).await?;

        self.set_stage(AnalysisStage::Analyzing);
        let result = self.services.analyzer.analyze(&image_url).await?;
        self.result = Some(result.clone());

        let record = NewAnalysisRecord {
            user_id: session.uid().to_string(),
            image_url,
            result,
        };
        self.services.documents.create(session, record).await
    }

    async fn discard_upload(&self, session: &Session, path: &str) {
        match self.services.objects.delete(session, path).await {
            Ok(()) => info!(path, "Removed orphaned upload"),
            Err(e) => warn!(path, error = %e, "Failed to remove orphaned upload"),
        }
    }
}
