use thiserror::Error;

/// Top-level error type shared by every OraCare service seam.
#[derive(Debug, Error)]
pub enum OraError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not signed in")]
    Unauthenticated,

    #[error("identity provider error: {0}")]
    Auth(String),

    #[error("object store error: {0}")]
    Storage(String),

    #[error("document store error: {0}")]
    Database(String),

    #[error("vision gateway error ({provider}, status {status}): {message}")]
    Gateway {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used across the workspace.
pub type OraResult<T> = std::result::Result<T, OraError>;
