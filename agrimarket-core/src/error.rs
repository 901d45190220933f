//! Error Handling Module
//!
//! Provides structured error types for the query service.
//! Uses `thiserror` for ergonomic error definitions and maps every
//! variant onto one of three caller-facing kinds.
//!
//! # Design Principles
//! 1. All errors are typed and descriptive
//! 2. Errors map to a client / not-found / internal kind
//! 3. Internal causes are logged, never echoed to the caller
//! 4. Empty filtered data is never an error

use thiserror::Error;

use crate::data_loader::DataLoaderError;

/// Message returned to callers for any internal failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

// ============================================================================
// Error Kinds
// ============================================================================

/// Caller-facing classification of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed request input (client error).
    Validation,
    /// A specifically scoped entity has no rows, or the operation is unknown.
    NotFound,
    /// Unexpected failure during load or computation.
    Internal,
}

impl ErrorKind {
    /// HTTP-style status code for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Internal => 500,
        }
    }

    /// Short lowercase name, used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Internal => "internal",
        }
    }

    /// Process exit code used by the `agri` binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            ErrorKind::Validation => 2,
            ErrorKind::NotFound => 3,
            ErrorKind::Internal => 1,
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Main error type for the query service.
#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    // Request Errors
    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("No data available for {scope}")]
    NotFound { scope: String },

    #[error("Endpoint not found: {name}")]
    UnknownQuery { name: String },

    // Load Errors
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Unsupported data source format: {0}")]
    UnsupportedFormat(String),

    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Polars error: {0}")]
    Polars(String),

    #[error("IO error: {0}")]
    Io(String),

    // Internal Errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Classify this error for the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation { .. } => ErrorKind::Validation,
            ServiceError::NotFound { .. } | ServiceError::UnknownQuery { .. } => {
                ErrorKind::NotFound
            }
            ServiceError::FileNotFound { .. }
            | ServiceError::UnsupportedFormat(_)
            | ServiceError::MissingColumn { .. }
            | ServiceError::Database(_)
            | ServiceError::Polars(_)
            | ServiceError::Io(_)
            | ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }

    /// The message a caller is allowed to see.
    ///
    /// Internal causes are replaced by a generic message; the full error is
    /// expected to be logged server-side by whoever produced it.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::NotFound => self.to_string(),
            ErrorKind::Internal => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Create a Result type alias for convenience.
pub type ServiceResult<T> = Result<T, ServiceError>;

// ============================================================================
// Error Conversion Implementations
// ============================================================================

impl From<DataLoaderError> for ServiceError {
    fn from(err: DataLoaderError) -> Self {
        match err {
            DataLoaderError::FileNotFound(path) => ServiceError::FileNotFound { path },
            DataLoaderError::UnsupportedFormat(ext) => ServiceError::UnsupportedFormat(ext),
            DataLoaderError::MissingColumn(column) => ServiceError::MissingColumn { column },
            DataLoaderError::Sqlite(e) => ServiceError::Database(e.to_string()),
            DataLoaderError::PolarsError(e) => ServiceError::Polars(e.to_string()),
            DataLoaderError::ReadError(msg) => ServiceError::Io(msg),
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Internal(format!("serialization failed: {}", err))
    }
}

// ============================================================================
// Error Construction Helpers
// ============================================================================

impl ServiceError {
    /// Create a validation error for a request field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error naming the missing scope.
    pub fn not_found(scope: impl Into<String>) -> Self {
        ServiceError::NotFound {
            scope: scope.into(),
        }
    }

    /// Create an unknown-operation error.
    pub fn unknown_query(name: impl Into<String>) -> Self {
        ServiceError::UnknownQuery { name: name.into() }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::Internal(message.into())
    }
}

// ============================================================================
// Tests
// ============================================================================
