//! Error types for query sessions and value decoding.

use std::time::Duration;

use crate::packstream::{Dict, PackValue};

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BoltError>;

/// Errors that can occur while running queries or reading their results.
#[derive(Debug, thiserror::Error)]
pub enum BoltError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("protocol violation: {0}")]
    ProtocolViolation(Violation),

    #[error("query failed: {0}")]
    QueryFailure(ServerFailure),

    #[error("command ignored: skipped after an earlier failure or discarded by reset")]
    Ignored,

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("result stream already consumed")]
    AlreadyConsumed,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BoltError {
    /// A violation on the wire. The connection is out of sync and must be
    /// discarded.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolViolation(Violation {
            message: msg.into(),
            fatal: true,
        })
    }

    /// A call made in the wrong order or state. The session is unaffected.
    pub fn misuse(msg: impl Into<String>) -> Self {
        Self::ProtocolViolation(Violation {
            message: msg.into(),
            fatal: false,
        })
    }

    /// Shorthand for a [`BoltError::UnsupportedValue`].
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedValue(msg.into())
    }

    /// Returns whether the session that produced this error can no longer
    /// be used, not even after a reset.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Authentication(_) => true,
            Self::ProtocolViolation(v) => v.fatal,
            _ => false,
        }
    }

    /// Returns the server failure carried by this error, if any.
    pub fn server_failure(&self) -> Option<&ServerFailure> {
        match self {
            Self::QueryFailure(f) => Some(f),
            _ => None,
        }
    }
}

/// Details of a [`BoltError::ProtocolViolation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub message: String,
    /// Raised by the wire or ordering machinery rather than by caller misuse.
    pub fatal: bool,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// A FAILURE reported by the server for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerFailure {
    pub code: String,
    pub message: String,
}

impl ServerFailure {
    /// Extracts `code` and `message` from FAILURE metadata.
    pub fn from_metadata(metadata: &Dict) -> Self {
        let text = |key: &str, default: &str| {
            metadata
                .get(key)
                .and_then(PackValue::as_str)
                .unwrap_or(default)
                .to_string()
        };
        Self {
            code: text("code", "Neo.DatabaseError.General.UnknownError"),
            message: text("message", "unknown failure"),
        }
    }

    /// Returns the classification segment of a `Neo.<Class>.<Category>.<Title>`
    /// status code (`ClientError`, `TransientError`, `DatabaseError`).
    pub fn classification(&self) -> Option<&str> {
        self.code.split('.').nth(1)
    }
}

impl std::fmt::Display for ServerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
