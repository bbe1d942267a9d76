//! Observability module for centralized metrics, tracing, and logging setup.
//!
//! This module provides:
//! - Metrics collection and Prometheus export
//! - Distributed tracing with OpenTelemetry
//! - Structured logging with configurable levels
//! - Health check endpoints for monitoring
//! - Environment-specific configuration support

pub mod health_checks;
pub mod metrics;
pub mod tracing_mod;

use std::sync::Arc;

use anyhow::Result;

use crate::api::AllergenApiClient;
use crate::observability_config::ObservabilityConfig;

pub use health_checks::{perform_readiness_checks, start_health_metrics_recorder};
pub use metrics::start_session_metrics_recorder;
pub use tracing_mod::{api_span, detection_span, session_span};

/// Initialize the complete observability stack
pub async fn init_observability() -> Result<()> {
    let config = ObservabilityConfig::from_env();
    init_observability_with_config(config).await
}

/// Initialize the complete observability stack with custom configuration.
///
/// Without an API client the readiness probe only covers local checks
/// (the compiled-in keyword table).
pub async fn init_observability_with_config(config: ObservabilityConfig) -> Result<()> {
    init_stack(None, &config).await?;

    tracing::info!(
        environment = %config.environment,
        otlp_endpoint = ?config.otlp_endpoint,
        metrics_port = %config.metrics_port,
        "Observability stack initialized successfully"
    );
    Ok(())
}

/// Initialize observability with the backend client wired into the
/// readiness probe
pub async fn init_observability_with_health_checks(api: Arc<AllergenApiClient>) -> Result<()> {
    let config = ObservabilityConfig::from_env();
    init_observability_with_health_checks_and_config(api, config).await
}

/// Initialize observability with the backend client and custom
/// configuration
pub async fn init_observability_with_health_checks_and_config(
    api: Arc<AllergenApiClient>,
    config: ObservabilityConfig,
) -> Result<()> {
    init_stack(Some(Arc::clone(&api)), &config).await?;

    tracing::info!(
        environment = %config.environment,
        api_base_url = %api.base_url(),
        metrics_port = %config.metrics_port,
        "Observability stack with health checks initialized successfully"
    );
    Ok(())
}

async fn init_stack(api: Option<Arc<AllergenApiClient>>, config: &ObservabilityConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;

    // Tracing first so the rest of the startup sequence is logged
    tracing_mod::init_tracing_with_config(config)?;

    let metrics_handle = metrics::init_metrics_with_config(config)?;

    tracing_mod::init_opentelemetry_tracing_with_config(config).await?;

    metrics::start_metrics_server_with_config(metrics_handle, config.metrics_port, api).await?;

    Ok(())
}
