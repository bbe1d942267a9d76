//! Metrics collection and Prometheus export module.
//!
//! This module provides:
//! - Rate limiting and authentication for the metrics endpoint
//! - Prometheus metrics server setup
//! - Recording functions for the detection pipeline, cache, frame guard,
//!   scan session and backend API client

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use parking_lot::Mutex;
use tokio::net::TcpListener;

use crate::api::AllergenApiClient;
use crate::cache::CacheStats;
use crate::observability_config::ObservabilityConfig;

/// Simple rate limiter for HTTP requests
#[derive(Debug)]
pub struct RateLimiter {
    requests: Mutex<HashMap<String, Vec<Instant>>>,
    max_requests: u32,
    window_secs: u64,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            max_requests,
            window_secs,
        }
    }

    /// Check if request is allowed for the given IP
    pub fn is_allowed(&self, ip: &str) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(self.window_secs);

        let mut requests = self.requests.lock();
        let client_requests = requests.entry(ip.to_string()).or_default();

        // Remove old requests outside the window
        client_requests.retain(|&time| now.duration_since(time) < window);

        if client_requests.len() >= self.max_requests as usize {
            return false;
        }

        client_requests.push(now);
        true
    }
}

/// Check authentication token from the Authorization header.
/// No token is required when `METRICS_AUTH_TOKEN` is unset.
pub fn check_auth<B>(req: &hyper::Request<B>) -> bool {
    let expected_token = match std::env::var("METRICS_AUTH_TOKEN") {
        Ok(token) if !token.is_empty() => token,
        _ => return true,
    };

    if let Some(auth_header) = req.headers().get("authorization") {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return token == expected_token;
            }
        }
    }

    false
}

/// Check request size limit
pub fn check_request_size<B>(req: &hyper::Request<B>) -> bool {
    const MAX_REQUEST_SIZE: u64 = 1024 * 1024; // 1MB limit

    if let Some(content_length) = req.headers().get("content-length") {
        if let Ok(size_str) = content_length.to_str() {
            if let Ok(size) = size_str.parse::<u64>() {
                return size <= MAX_REQUEST_SIZE;
            }
        }
        return false; // Invalid content-length header
    }

    true // No content-length header (GET requests)
}

/// Initialize metrics collection with Prometheus exporter and configuration
pub fn init_metrics_with_config(config: &ObservabilityConfig) -> Result<PrometheusHandle> {
    let builder = PrometheusBuilder::new();
    let handle = builder.install_recorder()?;

    tracing::info!(
        metrics_enabled = %config.enable_metrics_export,
        "Metrics collection initialized"
    );
    Ok(handle)
}

/// Start the metrics server with liveness and readiness endpoints.
///
/// When an API client is supplied, the readiness probe checks backend
/// connectivity as well as the compiled-in keyword table.
pub async fn start_metrics_server_with_config(
    metrics_handle: PrometheusHandle,
    port: u16,
    api: Option<Arc<AllergenApiClient>>,
) -> Result<()> {
    // Localhost only unless explicitly configured otherwise
    let bind_all = std::env::var("METRICS_BIND_ALL_INTERFACES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    let addr = if bind_all {
        SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port)
    } else {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    };

    tracing::info!(
        "Starting metrics server with health checks on {} (bind_all: {})",
        addr,
        bind_all
    );

    // 10 requests per minute per IP
    let rate_limiter = Arc::new(RateLimiter::new(10, 60));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on {}", addr);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let metrics_handle = metrics_handle.clone();
                    let api = api.clone();
                    let rate_limiter = rate_limiter.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = hyper::service::service_fn(
                            move |req: hyper::Request<hyper::body::Incoming>| {
                                let metrics_handle = metrics_handle.clone();
                                let api = api.clone();
                                let peer_ip = peer_addr.ip().to_string();
                                let rate_limiter = rate_limiter.clone();
                                async move {
                                    if !rate_limiter.is_allowed(&peer_ip) {
                                        let mut response =
                                            hyper::Response::new("Rate limit exceeded".to_string());
                                        *response.status_mut() =
                                            hyper::StatusCode::TOO_MANY_REQUESTS;
                                        return Ok::<_, std::convert::Infallible>(response);
                                    }

                                    if !check_request_size(&req) {
                                        let mut response =
                                            hyper::Response::new("Request too large".to_string());
                                        *response.status_mut() =
                                            hyper::StatusCode::PAYLOAD_TOO_LARGE;
                                        return Ok(response);
                                    }

                                    if !check_auth(&req) {
                                        let mut response =
                                            hyper::Response::new("Unauthorized".to_string());
                                        *response.status_mut() = hyper::StatusCode::UNAUTHORIZED;
                                        response.headers_mut().insert(
                                            "www-authenticate",
                                            hyper::header::HeaderValue::from_static("Bearer"),
                                        );
                                        return Ok(response);
                                    }

                                    match (req.method(), req.uri().path()) {
                                        (&hyper::Method::GET, "/metrics") => {
                                            // Ensure at least one metric is registered to avoid empty render
                                            metrics::gauge!("uptime_seconds").set(1.0);
                                            let metrics = metrics_handle.render();
                                            let mut response = hyper::Response::new(metrics);
                                            response.headers_mut().insert(
                                                "content-type",
                                                hyper::header::HeaderValue::from_static(
                                                    "text/plain; version=0.0.4; charset=utf-8",
                                                ),
                                            );
                                            Ok::<_, std::convert::Infallible>(response)
                                        }
                                        (&hyper::Method::GET, "/health/live") => {
                                            // Liveness probe - just check if the service is running
                                            Ok(hyper::Response::new("OK".to_string()))
                                        }
                                        (&hyper::Method::GET, "/health/ready") => {
                                            match crate::observability::health_checks::perform_readiness_checks(
                                                api.clone(),
                                            )
                                            .await
                                            {
                                                Ok(_) => Ok(hyper::Response::new("OK".to_string())),
                                                Err(e) => {
                                                    let mut response = hyper::Response::new(
                                                        format!("NOT READY: {}", e),
                                                    );
                                                    *response.status_mut() =
                                                        hyper::StatusCode::SERVICE_UNAVAILABLE;
                                                    Ok(response)
                                                }
                                            }
                                        }
                                        _ => {
                                            let mut response =
                                                hyper::Response::new("Not Found".to_string());
                                            *response.status_mut() = hyper::StatusCode::NOT_FOUND;
                                            Ok(response)
                                        }
                                    }
                                }
                            },
                        );

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await
                        {
                            crate::errors::error_logging::log_internal_error(
                                &err,
                                "metrics_server",
                                "serve_http_connection",
                            );
                        }
                    });
                }
                Err(e) => {
                    crate::errors::error_logging::log_internal_error(
                        &e,
                        "metrics_server",
                        "accept_tcp_connection",
                    );
                }
            }
        }
    });

    Ok(())
}

/// Record one completed detection attempt
pub fn record_detection_metrics(source: &str, has_allergens: bool, duration: Duration) {
    let source = source.to_string();
    let result = if has_allergens { "allergens" } else { "clean" };
    metrics::counter!("detection_operations_total", "source" => source.clone(), "result" => result.to_string())
        .increment(1);
    metrics::histogram!("detection_duration_seconds", "source" => source)
        .record(duration.as_secs_f64());
}

/// Record a fingerprint cache lookup
pub fn record_cache_lookup(hit: bool) {
    metrics::counter!("detection_cache_lookups_total", "result" => if hit { "hit" } else { "miss" })
        .increment(1);
}

/// Update fingerprint cache gauges from a stats snapshot
pub fn update_cache_gauges(stats: &CacheStats) {
    metrics::gauge!("detection_cache_entries").set(stats.entries as f64);
    metrics::gauge!("detection_cache_hit_rate").set(stats.hit_rate);
    metrics::gauge!("detection_cache_evictions").set(stats.evictions as f64);
}

/// Record an online detection failure that fell back to the offline scan
pub fn record_online_fallback(kind: &str) {
    let kind = kind.to_string();
    metrics::counter!("online_fallbacks_total", "reason" => kind).increment(1);
}

/// Record a frame guard decision (proceed, in_flight, throttled, too_similar)
pub fn record_guard_decision(decision: &str) {
    let decision = decision.to_string();
    metrics::counter!("frame_guard_decisions_total", "decision" => decision).increment(1);
}

/// Record a frame rejected by validation before reaching the guard
pub fn record_frame_rejected(reason: &str) {
    let reason = reason.to_string();
    metrics::counter!("frames_rejected_total", "reason" => reason).increment(1);
}

/// Record an alert dialog raised by a completed scan
pub fn record_scan_alert(kind: &str) {
    let kind = kind.to_string();
    metrics::counter!("scan_alerts_total", "kind" => kind).increment(1);
}

/// Update session state gauges after a state transition
pub fn update_session_gauges(is_scanning: bool, is_processing: bool, paused: bool) {
    metrics::gauge!("session_scanning").set(if is_scanning { 1.0 } else { 0.0 });
    metrics::gauge!("session_processing").set(if is_processing { 1.0 } else { 0.0 });
    metrics::gauge!("session_paused").set(if paused { 1.0 } else { 0.0 });
}

/// Record one backend API request with its outcome label
pub fn record_api_request_metrics(operation: &str, status: &str, duration: Duration) {
    let operation = operation.to_string();
    let status = status.to_string();
    metrics::counter!("api_requests_total", "operation" => operation.clone(), "status" => status)
        .increment(1);
    metrics::histogram!("api_request_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}

/// Record health check metrics
pub fn record_health_check_metrics(check_type: &str, success: bool, duration: Duration) {
    let check_type = check_type.to_string();
    metrics::counter!("health_checks_total", "type" => check_type.clone(), "result" => if success { "success" } else { "failure" }.to_string()).increment(1);
    metrics::histogram!("health_check_duration_seconds", "type" => check_type.clone())
        .record(duration.as_secs_f64());

    metrics::gauge!("health_check_status", "type" => check_type).set(if success {
        1.0
    } else {
        0.0
    });
}

/// Record error rate metrics
pub fn record_error_metrics(error_type: &str, component: &str) {
    let error_type = error_type.to_string();
    let component = component.to_string();
    metrics::counter!("errors_total", "type" => error_type, "component" => component).increment(1);
}

/// Record application startup metrics
pub fn record_startup_metrics(duration: Duration) {
    metrics::histogram!("application_startup_duration_seconds").record(duration.as_secs_f64());
    metrics::counter!("application_starts_total").increment(1);
}

/// Record application uptime
pub fn record_uptime(uptime_secs: f64) {
    metrics::gauge!("application_uptime_seconds").set(uptime_secs);
}

/// Start a background task that periodically publishes cache gauges and
/// uptime from the running session.
///
/// The closure decouples this module from the session type; callers pass
/// something like `move || session.cache_stats()`.
pub fn start_session_metrics_recorder<F>(cache_stats: F) -> tokio::task::JoinHandle<()>
where
    F: Fn() -> CacheStats + Send + 'static,
{
    let started = Instant::now();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));

        loop {
            interval.tick().await;
            update_cache_gauges(&cache_stats());
            record_uptime(started.elapsed().as_secs_f64());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_allows_within_limit() {
        let limiter = RateLimiter::new(3, 60);
        assert!(limiter.is_allowed("10.0.0.1"));
        assert!(limiter.is_allowed("10.0.0.1"));
        assert!(limiter.is_allowed("10.0.0.1"));
        assert!(!limiter.is_allowed("10.0.0.1"));
        // Different client, separate budget
        assert!(limiter.is_allowed("10.0.0.2"));
    }

    #[test]
    fn test_check_request_size_limits() {
        let small = hyper::Request::builder()
            .header("content-length", "512")
            .body(String::new())
            .unwrap();
        assert!(check_request_size(&small));

        let large = hyper::Request::builder()
            .header("content-length", (2 * 1024 * 1024).to_string())
            .body(String::new())
            .unwrap();
        assert!(!check_request_size(&large));

        let invalid = hyper::Request::builder()
            .header("content-length", "not-a-number")
            .body(String::new())
            .unwrap();
        assert!(!check_request_size(&invalid));

        let absent = hyper::Request::builder().body(String::new()).unwrap();
        assert!(check_request_size(&absent));
    }

    #[test]
    fn test_check_auth_with_token_configured() {
        std::env::set_var("METRICS_AUTH_TOKEN", "secret-token");

        let authorized = hyper::Request::builder()
            .header("authorization", "Bearer secret-token")
            .body(String::new())
            .unwrap();
        assert!(check_auth(&authorized));

        let wrong = hyper::Request::builder()
            .header("authorization", "Bearer wrong")
            .body(String::new())
            .unwrap();
        assert!(!check_auth(&wrong));

        let missing = hyper::Request::builder().body(String::new()).unwrap();
        assert!(!check_auth(&missing));

        std::env::remove_var("METRICS_AUTH_TOKEN");
    }
}
