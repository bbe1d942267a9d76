//! # Unified Application Configuration
//!
//! This module provides a centralized configuration system that consolidates
//! all application settings into a single, structured configuration object.
//! It supports loading from environment variables, validation, and provides
//! a clean interface for accessing configuration throughout the application.

use crate::detection_config::DetectionConfig;
use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use serde::{Deserialize, Serialize};
use std::env;

/// Allergen API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the allergen detection API
    pub base_url: String,
    /// HTTP client timeout in seconds
    pub timeout_secs: u64,
    /// Optional bearer token sent with every API request
    pub api_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout_secs: 10,
            api_token: None,
        }
    }
}

impl ApiConfig {
    /// Validate API configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(AppError::Config("API base URL cannot be empty".to_string()));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(AppError::Config(
                "API base URL must start with 'http://' or 'https://'".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(AppError::Config("API timeout cannot be 0".to_string()));
        }

        if self.timeout_secs > 300 {
            return Err(AppError::Config(
                "API timeout cannot be greater than 300 seconds".to_string(),
            ));
        }

        if let Some(token) = &self.api_token {
            if token.trim().is_empty() {
                return Err(AppError::Config(
                    "API token cannot be empty when set. Unset it to disable authentication"
                        .to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Server configuration for health checks and metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Health check server port
    pub health_port: u16,
    /// Metrics server port
    pub metrics_port: u16,
    /// Whether to allow privileged ports (< 1024)
    pub allow_privileged_ports: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            health_port: 8080,
            metrics_port: 9090,
            allow_privileged_ports: false,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> AppResult<()> {
        if !self.allow_privileged_ports {
            if self.health_port < 1024 {
                return Err(AppError::Config(format!(
                    "Health port {} is privileged. Set allow_privileged_ports=true or use port >= 1024",
                    self.health_port
                )));
            }
            if self.metrics_port < 1024 {
                return Err(AppError::Config(format!(
                    "Metrics port {} is privileged. Set allow_privileged_ports=true or use port >= 1024",
                    self.metrics_port
                )));
            }
        }

        if self.health_port == self.metrics_port {
            return Err(AppError::Config(
                "Health port and metrics port cannot be the same".to_string(),
            ));
        }

        Ok(())
    }
}

/// Unified application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Allergen API configuration
    pub api: ApiConfig,
    /// Detection pipeline configuration
    pub detection: DetectionConfig,
    /// Server configuration
    pub server: ServerConfig,
    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        // Load API configuration
        if let Ok(base_url) = env::var("ALLERGEN_API_BASE_URL") {
            config.api.base_url = base_url;
        }
        config.api.timeout_secs = env::var("ALLERGEN_API_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| {
                AppError::Config("ALLERGEN_API_TIMEOUT_SECS must be a valid number".to_string())
            })?;
        config.api.api_token = env::var("ALLERGEN_API_TOKEN").ok();

        // Load detection configuration
        config.detection.throttle_ms = env::var("DETECTION_THROTTLE_MS")
            .unwrap_or_else(|_| config.detection.throttle_ms.to_string())
            .parse()
            .map_err(|_| {
                AppError::Config("DETECTION_THROTTLE_MS must be a valid number".to_string())
            })?;
        config.detection.offline_delay_ms = env::var("DETECTION_OFFLINE_DELAY_MS")
            .unwrap_or_else(|_| config.detection.offline_delay_ms.to_string())
            .parse()
            .map_err(|_| {
                AppError::Config("DETECTION_OFFLINE_DELAY_MS must be a valid number".to_string())
            })?;
        config.detection.cache_capacity = env::var("DETECTION_CACHE_CAPACITY")
            .unwrap_or_else(|_| config.detection.cache_capacity.to_string())
            .parse()
            .map_err(|_| {
                AppError::Config("DETECTION_CACHE_CAPACITY must be a valid number".to_string())
            })?;

        // Load server configuration
        config.server.health_port = env::var("HEALTH_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| AppError::Config("HEALTH_PORT must be a valid port number".to_string()))?;
        config.server.metrics_port = env::var("METRICS_PORT")
            .unwrap_or_else(|_| "9090".to_string())
            .parse()
            .map_err(|_| {
                AppError::Config("METRICS_PORT must be a valid port number".to_string())
            })?;
        config.server.allow_privileged_ports = env::var("ALLOW_PRIVILEGED_PORTS")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            == "true";

        // Observability has its own env loading and validation
        config.observability = ObservabilityConfig::from_env();

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.api.validate()?;
        self.detection.validate()?;
        self.server.validate()?;
        self.observability.validate()?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: api_base_url={}, api_token={}, health_port={}, metrics_port={}, throttle_ms={}, offline_delay_ms={}, observability_enabled={}",
            self.api.base_url,
            if self.api.api_token.is_some() {
                "[REDACTED]"
            } else {
                "none"
            },
            self.server.health_port,
            self.server.metrics_port,
            self.detection.throttle_ms,
            self.detection.offline_delay_ms,
            self.observability.enable_metrics_export
        )
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            detection: DetectionConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
