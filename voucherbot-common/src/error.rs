// ================================================================
// File: voucherbot-common/src/error.rs
// ================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The issuer answered with a non-success HTTP status.
    #[error("Upstream returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    /// The issuer answered 2xx but no valid code could be extracted.
    #[error("Malformed upstream payload: {0}")]
    MalformedPayload(String),

    /// The store rejected an assignment tag that is already taken.
    /// Expected outcome of a lost claim race, not a fault.
    #[error("Assignment tag already in use: {0}")]
    DuplicateAssignment(String),

    /// Transient store contention that outlived the bounded retries.
    #[error("Storage contention: {0}")]
    Contention(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
