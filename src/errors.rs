//! # Application Error Types
//!
//! This module defines common error types used throughout the allergen scanner.
//! It provides structured error handling for the various application components.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Validation errors (frame text, barcodes, inputs)
    Validation(String),
    /// Remote allergen API errors
    Api(String),
    /// Detection pipeline errors
    Detection(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Validation(msg) => write!(f, "[VALIDATION] {}", msg),
            AppError::Api(msg) => write!(f, "[API] {}", msg),
            AppError::Detection(msg) => write!(f, "[DETECTION] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::api_errors::ApiError> for AppError {
    fn from(err: crate::api_errors::ApiError) -> Self {
        AppError::Api(err.to_string())
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the application
pub mod error_logging {
    use tracing::error;

    /// Log remote API errors with endpoint context
    pub fn log_api_error(
        error: &impl std::fmt::Display,
        operation: &str,
        endpoint: Option<&str>,
        status: Option<u16>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            endpoint = ?endpoint,
            status = ?status,
            "Allergen API request failed"
        );
    }

    /// Log detection pipeline errors with frame context
    pub fn log_detection_error(
        error: &impl std::fmt::Display,
        operation: &str,
        text_chars: usize,
        source: Option<&str>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            text_chars = %text_chars,
            source = ?source,
            "Allergen detection failed"
        );
    }

    /// Log validation errors with input context
    pub fn log_validation_error(
        error: &impl std::fmt::Display,
        operation: &str,
        input_type: &str,
        input_value: Option<&str>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            input_type = %input_type,
            input_value = ?input_value.map(|v| {
                // Truncate by characters; OCR text is frequently multibyte
                if v.chars().count() > 100 {
                    let prefix: String = v.chars().take(100).collect();
                    format!("{}...", prefix)
                } else {
                    v.to_string()
                }
            }),
            "Validation failed"
        );
    }

    /// Log internal application errors with component context
    pub fn log_internal_error(
        error: &impl std::fmt::Display,
        component: &str,
        operation: &str,
    ) {
        error!(
            error = %error,
            component = %component,
            operation = %operation,
            "Internal application error"
        );
    }

    /// Log configuration errors during startup/initialization
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }
}
