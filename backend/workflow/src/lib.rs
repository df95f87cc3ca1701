//! Headless versions of the OraCare pages.
//!
//! One [`SessionContext`] owns the signed-in state; [`AnalysisWorkflow`] and
//! [`HistoryWorkflow`] are the "new analysis" and "history" pages as state
//! machines over the service traits in `oracare-core`.

pub mod analysis;
pub mod capture;
pub mod history;
pub mod http_client;
pub mod services;
pub mod session;

pub use analysis::{AnalysisStage, AnalysisWorkflow};
pub use capture::{detect_mime_type, ImageFile};
pub use history::{HistoryStage, HistoryWorkflow};
pub use http_client::HttpAnalysisClient;
pub use services::{Services, WorkflowOptions};
pub use session::SessionContext;
