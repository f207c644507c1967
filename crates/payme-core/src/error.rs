//! Error types for payme-core
//!
//! Error codes, severities and user-facing suggestions for everything the
//! application layer can report: form validation, backend calls made on
//! behalf of a session, and static asset serving.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A required form field is missing or malformed
    ValidationError,
    /// Payment records could not be fetched
    FetchFailed,
    /// Receipt upload failed
    UploadFailed,
    /// Payment record could not be created
    InsertFailed,
    /// User metadata read or write failed
    MetadataFailed,
    /// Static asset does not exist
    AssetNotFound,
    /// IO error
    IoError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::ValidationError => write!(f, "VALIDATION_ERROR"),
            ErrorCode::FetchFailed => write!(f, "FETCH_FAILED"),
            ErrorCode::UploadFailed => write!(f, "UPLOAD_FAILED"),
            ErrorCode::InsertFailed => write!(f, "INSERT_FAILED"),
            ErrorCode::MetadataFailed => write!(f, "METADATA_FAILED"),
            ErrorCode::AssetNotFound => write!(f, "ASSET_NOT_FOUND"),
            ErrorCode::IoError => write!(f, "IO_ERROR"),
        }
    }
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Form field the error refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Suggestions for resolution
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorDetails {
    pub fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            field: None,
            suggestions: vec![],
        }
    }

    pub fn with_field(mut self, field: String) -> Self {
        self.field = Some(field);
        self
    }

    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref field) = self.field {
            write!(f, "\nField: {}", field)?;
        }
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Informational
    Info,
    /// Warning - operation degraded but the primary flow continues
    Warning,
    /// Error - operation failed
    Error,
}

impl ErrorSeverity {
    /// Level an error of this severity is logged at
    pub fn log_level(&self) -> log::Level {
        match self {
            ErrorSeverity::Info => log::Level::Info,
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error => log::Level::Error,
        }
    }
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
        }
    }
}

/// Main error type for payme-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("{message}")]
    Fetch { message: String },

    #[error("{message}")]
    Upload { message: String },

    #[error("{message}")]
    Insert { message: String },

    #[error("{message}")]
    Metadata { message: String },

    #[error("Asset not found: {path}")]
    AssetNotFound { path: String },

    #[error("IO error reading {path}: {message}")]
    AssetIo { path: String, message: String },
}

impl CoreError {
    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::Validation { .. } => ErrorCode::ValidationError,
            CoreError::Fetch { .. } => ErrorCode::FetchFailed,
            CoreError::Upload { .. } => ErrorCode::UploadFailed,
            CoreError::Insert { .. } => ErrorCode::InsertFailed,
            CoreError::Metadata { .. } => ErrorCode::MetadataFailed,
            CoreError::AssetNotFound { .. } => ErrorCode::AssetNotFound,
            CoreError::AssetIo { .. } => ErrorCode::IoError,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::Validation { .. } => ErrorSeverity::Info,
            CoreError::Metadata { .. } => ErrorSeverity::Warning,
            CoreError::AssetNotFound { .. } => ErrorSeverity::Info,
            CoreError::Fetch { .. }
            | CoreError::Upload { .. }
            | CoreError::Insert { .. }
            | CoreError::AssetIo { .. } => ErrorSeverity::Error,
        }
    }

    /// Convert to detailed error info
    pub fn to_details(&self) -> ErrorDetails {
        let mut details = ErrorDetails::new(self.code(), self.to_string());

        match self {
            CoreError::Validation { field, .. } => {
                details = details
                    .with_field(field.clone())
                    .with_suggestion("Please fill in all required fields.".to_string());
            }
            CoreError::Fetch { .. } => {
                details = details.with_suggestion("Reload the history to try again.".to_string());
            }
            CoreError::Upload { .. } => {
                details = details
                    .with_suggestion("The payment was not saved. Try attaching the receipt again.".to_string())
                    .with_suggestion("Check the file size and format.".to_string());
            }
            CoreError::Insert { .. } => {
                details = details.with_suggestion("The payment was not saved. Submit the form again.".to_string());
            }
            _ => {}
        }

        details
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

/// Context attached to logged errors
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Device identity the operation ran for
    pub user_id: Option<String>,
    /// Operation being performed
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: &str) -> Self {
        Self {
            user_id: None,
            operation: operation.to_string(),
        }
    }

    pub fn with_user_id(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }
}

/// Error logger trait
pub trait ErrorLogger {
    /// Log an error at the level its severity calls for
    fn log_error(&self, error: &CoreError, context: &ErrorContext);
}

/// Default error logger using log crate
#[derive(Default)]
pub struct DefaultErrorLogger;

impl ErrorLogger for DefaultErrorLogger {
    fn log_error(&self, error: &CoreError, context: &ErrorContext) {
        let severity = error.severity();
        log::log!(
            target: "payme::error",
            severity.log_level(),
            "{} [{}] {} - Operation: {} - User: {:?}",
            severity.to_string().to_uppercase(),
            error.code(),
            error,
            context.operation,
            context.user_id
        );
    }
}

// ==================== Tests ====================
