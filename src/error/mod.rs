//! Error types and Result aliases for sizewatch.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.

use thiserror::Error;

/// Result type alias using sizewatch's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sizewatch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Snapshot persistence error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Directory scan error.
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// Notification delivery error.
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),

    /// Server/API error.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// `SQLite` database error.
    #[error("database error: {0}")]
    Database(String),

    /// Schema migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Persisted data that cannot be turned back into a snapshot.
    #[error("corrupt snapshot entry '{path}': {reason}")]
    Corrupt { path: String, reason: String },
}

/// Directory scan errors.
///
/// Only conditions that make the whole scan meaningless live here; an
/// unreadable subtree is a `ScanWarning`, not an error.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Scan root does not exist.
    #[error("scan root '{path}' does not exist")]
    RootNotFound { path: String },

    /// Scan root exists but is not a directory.
    #[error("scan root '{path}' is not a directory")]
    NotADirectory { path: String },

    /// Scan root could not be inspected.
    #[error("failed to read scan root '{path}': {reason}")]
    RootUnreadable { path: String, reason: String },

    /// The scan was cancelled before it finished.
    #[error("scan cancelled")]
    Cancelled,
}

/// Notification delivery errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The transport refused or failed to deliver the message.
    #[error("{transport} delivery failed: {reason}")]
    Delivery {
        transport: &'static str,
        reason: String,
    },

    /// The transport is missing required settings.
    #[error("{transport} is not configured: {reason}")]
    NotConfigured {
        transport: &'static str,
        reason: String,
    },
}

/// Server/API errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {address}: {reason}")]
    BindFailed { address: String, reason: String },

    /// Request handling error.
    #[error("request error: {0}")]
    Request(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error came from a cancelled scan.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Scan(ScanError::Cancelled))
    }
}

impl StorageError {
    /// Create a corrupt-entry error.
    pub fn corrupt(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl NotifyError {
    /// Create a delivery error for the given transport.
    pub fn delivery(transport: &'static str, reason: impl Into<String>) -> Self {
        Self::Delivery {
            transport,
            reason: reason.into(),
        }
    }
}
