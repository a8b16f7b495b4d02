//! Error types for the sampling pipeline.

use crate::cancel::Cancelled;

/// A failure talking to a remote image service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The service answered with a structured error object.
    #[error("service error {code}: {message}")]
    Remote {
        code: i64,
        message: String,
        details: Vec<String>,
    },
}

/// Errors surfaced by the pipeline to its caller.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("scene catalog query failed: {0}")]
    CatalogQueryFailed(#[source] ServiceError),

    #[error("sample request failed: {0}")]
    SampleRequestFailed(#[source] ServiceError),

    #[error("cancelled")]
    Cancelled,
}

impl ProfileError {
    /// Cancellation isn't a failure worth reporting to a user.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<Cancelled> for ProfileError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

pub type Result<T> = core::result::Result<T, ProfileError>;
