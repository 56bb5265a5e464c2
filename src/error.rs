//! Error types for taskkeep
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (unreadable or invalid configuration)
//! - 3: Blocked (another sync run holds the snapshot lock)
//! - 4: Operation failed (remote fetch, I/O, corrupt snapshot)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the taskkeep CLI
pub mod exit_codes {
    pub const USER_ERROR: i32 = 2;
    pub const BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for taskkeep operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // Blocked (exit code 3)
    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    // Operation failures (exit code 4)
    #[error("Remote fetch failed: {0}")]
    Fetch(#[source] Box<Error>),

    #[error("Remote request failed: {operation} returned HTTP {status}")]
    RemoteStatus { operation: String, status: u16 },

    #[error("Remote request failed: {0}")]
    Remote(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Wrap an error raised while draining the remote source.
    pub fn fetch(err: Error) -> Self {
        match err {
            Error::Fetch(_) => err,
            other => Error::Fetch(Box::new(other)),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidConfig(_) | Error::TomlParse(_) => exit_codes::USER_ERROR,

            Error::LockFailed(_) => exit_codes::BLOCKED,

            Error::Fetch(_)
            | Error::RemoteStatus { .. }
            | Error::Remote(_)
            | Error::Http(_)
            | Error::InvalidData(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error output, where there are any.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::LockFailed(path) => Some(serde_json::json!({ "lock": path })),
            Error::RemoteStatus { operation, status } => Some(serde_json::json!({
                "operation": operation,
                "status": status,
            })),
            Error::Fetch(inner) => Some(serde_json::json!({ "cause": inner.to_string() })),
            _ => None,
        }
    }
}

/// Result type alias for taskkeep operations
pub type Result<T> = std::result::Result<T, Error>;
