//! Error types for gradebook.
//!
//! Two layers live here. [`Error`] covers infrastructure failures (opening the
//! database, loading configuration, binding the server) and is propagated with
//! `?`. [`RecordError`] is the taxonomy returned by record operations; every
//! variant carries a message meant to be shown to the teacher as a notice.

use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

use crate::auth::Notice;

/// The main error type for gradebook infrastructure.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Server Errors ===
    /// The HTTP server failed to bind or stopped unexpectedly.
    #[error("server error: {0}")]
    Server(String),

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Generic Errors ===
    /// A background task panicked or was cancelled.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for gradebook operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new server error.
    #[must_use]
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error came from a violated UNIQUE or PRIMARY KEY constraint.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::DatabaseQuery(rusqlite::Error::SqliteFailure(err, _)) => {
                err.code == ErrorCode::ConstraintViolation
                    && (err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
            }
            _ => false,
        }
    }

    /// Check if this error came from a violated FOREIGN KEY constraint.
    #[must_use]
    pub fn is_foreign_key_violation(&self) -> bool {
        match self {
            Self::DatabaseQuery(rusqlite::Error::SqliteFailure(err, _)) => {
                err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
            }
            _ => false,
        }
    }

    /// The message SQLite attached to a failed statement, or the display form
    /// of any other error.
    #[must_use]
    pub fn store_message(&self) -> String {
        match self {
            Self::DatabaseQuery(rusqlite::Error::SqliteFailure(err, Some(msg))) => {
                format!("{msg} ({err})")
            }
            Self::DatabaseQuery(err) => err.to_string(),
            other => other.to_string(),
        }
    }
}

/// Failure of a record operation, caught at the operation boundary.
///
/// None of these are fatal; the store is left unchanged whenever one is
/// returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// A required field was missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// A uniqueness constraint rejected the insert.
    #[error("{0}")]
    Duplicate(String),

    /// Any other store failure, including unknown student references.
    #[error("{0}")]
    Operation(String),
}

impl RecordError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a duplicate error.
    #[must_use]
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::Duplicate(message.into())
    }

    /// Create an operation error.
    #[must_use]
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation(message.into())
    }

    /// The user-visible message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(m) | Self::Duplicate(m) | Self::Operation(m) => m,
        }
    }

    /// Check if this is a validation error.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a duplicate error.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }

    /// Check if this is an operation error.
    #[must_use]
    pub fn is_operation(&self) -> bool {
        matches!(self, Self::Operation(_))
    }

    /// Convert into an error notice for the next rendered page.
    #[must_use]
    pub fn notice(&self) -> Notice {
        Notice::error(self.message())
    }
}
