// crates/session-lib/src/error.rs

//! Central error types for the session core.
use thiserror::Error;

use crate::validation::ValidationError;

/// Failures of a storage channel
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Encryption error: {0}")]
    Crypto(String),

    #[error("Corrupt entry for key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Session error types with error codes
#[derive(Error, Debug)]
pub enum SessionError {
    /// The request never produced a response (DNS, connect, timeout, ...)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// A 2xx response whose body did not have the expected shape
    #[error("Malformed response from {path}: {reason}")]
    MalformedResponse { path: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SessionError {
    /// HTTP status of the failed call, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            SessionError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for 401/403 answers, i.e. the credentials were refused
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            SessionError::Transport(_) => "NET_001",
            SessionError::Http { status: 401, .. } | SessionError::Http { status: 403, .. } => {
                "AUTH_001"
            },
            SessionError::Http { .. } => "HTTP_001",
            SessionError::MalformedResponse { .. } => "HTTP_002",
            SessionError::Storage(_) => "STORE_001",
            SessionError::Json(_) => "JSON_001",
            SessionError::Io(_) => "IO_001",
            SessionError::Validation(_) => "VAL_001",
            SessionError::Config(_) => "CFG_001",
        }
    }

    /// Get a message suitable for showing to an end user
    pub fn sanitized_message(&self) -> String {
        match self {
            SessionError::Transport(_) => {
                "Unable to reach the helpdesk server, please try again".to_string()
            },
            SessionError::Http { status: 401, .. } | SessionError::Http { status: 403, .. } => {
                "Invalid email or password".to_string()
            },
            SessionError::Http { status: 409, .. } => {
                "An account with this email already exists".to_string()
            },
            SessionError::Http { status, .. } if *status >= 500 => {
                "The helpdesk server encountered an error".to_string()
            },
            SessionError::Http { message, .. } => message.clone(),
            SessionError::MalformedResponse { .. } => {
                "Unexpected response from the helpdesk server".to_string()
            },
            SessionError::Storage(_) | SessionError::Io(_) | SessionError::Json(_) => {
                "Local session storage is unavailable".to_string()
            },
            SessionError::Validation(err) => err.to_string(),
            SessionError::Config(_) => "Invalid configuration".to_string(),
        }
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        SessionError::Transport(err.to_string())
    }
}
