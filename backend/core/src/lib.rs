pub mod error;
pub mod traits;
pub mod types;

pub use error::{OraError, OraResult};
pub use traits::{AnalysisClient, DocumentStore, IdentityProvider, ObjectStore, VisionGateway};
pub use types::{AnalysisRecord, AnalysisResult, NewAnalysisRecord, Session, User};
