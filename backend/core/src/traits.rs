use async_trait::async_trait;

use crate::error::OraResult;
use crate::types::{AnalysisRecord, AnalysisResult, NewAnalysisRecord, Session};

/// Email/password identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider name (e.g., "firebase", "memory").
    fn name(&self) -> &str;

    /// Create an account and return a session for it.
    async fn sign_up(&self, email: &str, password: &str) -> OraResult<Session>;

    /// Exchange credentials for a session.
    async fn sign_in(&self, email: &str, password: &str) -> OraResult<Session>;

    /// Invalidate a session.
    async fn sign_out(&self, session: &Session) -> OraResult<()>;

    /// Ask the provider to send a password reset email.
    async fn send_password_reset(&self, email: &str) -> OraResult<()>;
}

/// Blob storage that hands back retrievable URLs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write bytes at `path`.
    async fn upload(
        &self,
        session: &Session,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> OraResult<()>;

    /// Resolve the public download URL of an uploaded object.
    async fn download_url(&self, session: &Session, path: &str) -> OraResult<String>;

    /// Remove an object.
    async fn delete(&self, session: &Session, path: &str) -> OraResult<()>;
}

/// Schema-less record store for analysis results.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a record; the store assigns the id and timestamp.
    async fn create(&self, session: &Session, record: NewAnalysisRecord)
        -> OraResult<AnalysisRecord>;

    /// All records owned by `user_id`, newest first.
    async fn list_for_user(&self, session: &Session, user_id: &str)
        -> OraResult<Vec<AnalysisRecord>>;

    /// Delete a record by id.
    async fn delete(&self, session: &Session, id: &str) -> OraResult<()>;
}

/// External vision-language model that answers a prompt about an image URL.
#[async_trait]
pub trait VisionGateway: Send + Sync {
    fn name(&self) -> &str;

    /// Return the model's free-form answer.
    async fn describe(&self, image_url: &str, prompt: &str) -> OraResult<String>;
}

/// Anything that turns an image URL into a structured analysis.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn analyze(&self, image_url: &str) -> OraResult<AnalysisResult>;
}
