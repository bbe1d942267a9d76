//! Health check functionality module.
//!
//! This module provides:
//! - Backend API connectivity checks
//! - Compiled-in keyword table sanity checks
//! - Comprehensive readiness checks
//! - A background recorder feeding health metrics

use std::sync::Arc;

use anyhow::Result;

use crate::api::AllergenApiClient;
use crate::text_processing;

/// Perform comprehensive readiness checks.
///
/// The keyword table check always runs; the backend check only when a
/// client is supplied, so an offline-only deployment still reports ready.
pub async fn perform_readiness_checks(api: Option<Arc<AllergenApiClient>>) -> Result<()> {
    check_keyword_table_health()?;

    if let Some(api) = &api {
        check_api_health(api).await?;
    }

    Ok(())
}

/// Check backend connectivity via its health endpoint
pub async fn check_api_health(api: &AllergenApiClient) -> Result<()> {
    if let Err(e) = api.health().await {
        crate::errors::error_logging::log_api_error(
            &e,
            "health_check",
            Some(api.base_url()),
            e.status(),
        );
        return Err(anyhow::anyhow!("Backend API health check failed: {}", e));
    }

    tracing::debug!("Backend API health check passed");
    Ok(())
}

/// Check the compiled-in keyword table and its compiled patterns.
///
/// Forces compilation of the lazy regex set, so a malformed pattern
/// fails the first readiness probe instead of the first scan.
pub fn check_keyword_table_health() -> Result<()> {
    let pattern_count = text_processing::keyword_pattern_count();
    if pattern_count == 0 {
        return Err(anyhow::anyhow!("Keyword table is empty"));
    }

    tracing::debug!(patterns = pattern_count, "Keyword table health check passed");
    Ok(())
}

/// Start a background task to periodically record health check metrics
pub fn start_health_metrics_recorder(
    api: Option<Arc<AllergenApiClient>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));

        loop {
            interval.tick().await;

            let check_start = std::time::Instant::now();
            let table_healthy = check_keyword_table_health().is_ok();
            crate::observability::metrics::record_health_check_metrics(
                "keyword_table",
                table_healthy,
                check_start.elapsed(),
            );

            if let Some(api) = &api {
                let check_start = std::time::Instant::now();
                let api_healthy = check_api_health(api).await.is_ok();
                crate::observability::metrics::record_health_check_metrics(
                    "backend_api",
                    api_healthy,
                    check_start.elapsed(),
                );
            }
        }
    })
}
