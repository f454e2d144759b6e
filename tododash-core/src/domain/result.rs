//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected on the client before any request was made
    #[error("Validation error: {0}")]
    Validation(String),

    /// No session; the request was never attempted
    #[error("User not authenticated")]
    NotAuthenticated,

    /// The server answered 401; the persisted token has been cleared
    #[error("{0}")]
    Unauthorized(String),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Text suitable for an error banner
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Replace an empty remote message with a generic one
    pub fn or_message(self, fallback: &str) -> Self {
        match self {
            Self::Api { status, message } if message.trim().is_empty() => Self::Api {
                status,
                message: fallback.to_string(),
            },
            Self::Unauthorized(message) if message.trim().is_empty() => {
                Self::Unauthorized(fallback.to_string())
            }
            Self::Network(message) if message.trim().is_empty() => {
                Self::Network(fallback.to_string())
            }
            other => other,
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for `--json` output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Attach a context value
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(e.user_message()),
        }
    }
}
