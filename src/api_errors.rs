//! # API Error Types Module
//!
//! This module defines custom error types for the remote allergen backend client.
//! Every variant is recoverable from the caller's point of view: the detection
//! orchestrator answers any of them with the offline fallback path.

/// Custom error types for allergen API operations
#[derive(Debug, Clone)]
pub enum ApiError {
    /// Request could not be sent (connection refused, DNS, TLS)
    Transport(String),
    /// Server answered with a non-success HTTP status
    Status(u16, String),
    /// Response body could not be decoded into the expected shape
    Decode(String),
    /// Request exceeded the configured client timeout
    Timeout(String),
}

impl ApiError {
    /// HTTP status code carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status(code, _) => Some(*code),
            _ => None,
        }
    }

    /// Stable variant label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Transport(_) => "transport",
            ApiError::Status(_, _) => "status",
            ApiError::Decode(_) => "decode",
            ApiError::Timeout(_) => "timeout",
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Transport(msg) => write!(f, "[API_TRANSPORT] Request failed: {}", msg),
            ApiError::Status(code, msg) => write!(f, "[API_STATUS] Server returned {}: {}", code, msg),
            ApiError::Decode(msg) => write!(f, "[API_DECODE] Response decoding failed: {}", msg),
            ApiError::Timeout(msg) => write!(f, "[API_TIMEOUT] Request timed out: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Status(status.as_u16(), err.to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}
