//! Error types for payme-backend

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Backend not configured: missing {field}")]
    NotConfigured { field: String },

    #[error("Object already exists: {name}")]
    Conflict { name: String },

    #[error("Backend unavailable: {message}")]
    Unavailable { message: String },
}

impl BackendError {
    /// Whether retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Http(e) => e.is_timeout() || e.is_connect(),
            BackendError::Status { status, .. } => *status >= 500 || *status == 429,
            BackendError::Unavailable { .. } => true,
            BackendError::NotConfigured { .. } | BackendError::Conflict { .. } => false,
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
