//! # Test Helper Library
//!
//! This module provides common setup functions shared by the integration
//! tests: detector and session constructors wired to an unreachable
//! backend (forcing the offline path), a canned-response stub standing in
//! for the allergen API, and localization setup.

// Each integration test crate compiles this module separately and uses
// its own subset of the helpers.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::watch;

use allergen_scanner::api::AllergenApiClient;
use allergen_scanner::config::ApiConfig;
use allergen_scanner::detection_config::DetectionConfig;
use allergen_scanner::detector::AllergenDetector;
use allergen_scanner::localization::{create_localization_manager, LocalizationManager};
use allergen_scanner::session::{ScanSession, ScanState};
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;

/// API configuration pointing at an unroutable endpoint, so every online
/// attempt fails fast and detection falls through to the offline scan
pub fn offline_api_config() -> ApiConfig {
    ApiConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        timeout_secs: 1,
        api_token: None,
    }
}

/// Build an API client for an arbitrary base URL
pub fn client_for(base_url: &str) -> AllergenApiClient {
    let config = ApiConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        api_token: None,
    };
    AllergenApiClient::new(&config).expect("Failed to build API client")
}

/// Build an API client sending a bearer token with every request
pub fn client_with_token(base_url: &str, token: &str) -> AllergenApiClient {
    let config = ApiConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        api_token: Some(token.to_string()),
    };
    AllergenApiClient::new(&config).expect("Failed to build API client")
}

/// Detector whose online tier always fails (unroutable endpoint) and
/// whose offline tier runs without the artificial processing delay
pub fn offline_detector() -> AllergenDetector {
    let api = AllergenApiClient::new(&offline_api_config()).expect("Failed to build API client");
    AllergenDetector::new(api, DetectionConfig::for_tests())
}

/// Detector talking to the given base URL, test detection settings
pub fn detector_for(base_url: &str) -> AllergenDetector {
    AllergenDetector::new(client_for(base_url), DetectionConfig::for_tests())
}

/// Session whose detection always resolves through the offline tier
pub fn offline_session() -> ScanSession {
    ScanSession::new(offline_detector())
}

/// Setup a shared localization manager for tests
pub fn setup_test_localization() -> Arc<LocalizationManager> {
    create_localization_manager().expect("Failed to create localization manager")
}

/// Wait until the published session state satisfies `done`, or panic
/// after five seconds
pub async fn wait_for_state(
    rx: &mut watch::Receiver<ScanState>,
    done: impl Fn(&ScanState) -> bool,
) -> ScanState {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            {
                let state = rx.borrow_and_update();
                if done(&state) {
                    return state.clone();
                }
            }
            rx.changed().await.expect("session should outlive the test");
        }
    })
    .await
    .expect("state condition not reached in time")
}

/// One request captured by the stub backend
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path_and_query: String,
    pub authorization: Option<String>,
}

/// Minimal canned-response HTTP server standing in for the allergen
/// backend.
///
/// Every request receives the same status and body; request lines and
/// authorization headers are recorded for assertion. The accept loop is
/// aborted on drop.
pub struct StubBackend {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    accept_task: tokio::task::JoinHandle<()>,
}

impl StubBackend {
    /// Bind to an ephemeral localhost port and start serving the canned
    /// response
    pub async fn start(status: u16, body: &str) -> StubBackend {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("stub backend should bind");
        let addr = listener
            .local_addr()
            .expect("stub backend should know its address");
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        let body = body.to_string();
        let accept_task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let recorded = Arc::clone(&recorded);
                let body = body.clone();
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = hyper::service::service_fn(
                        move |req: hyper::Request<hyper::body::Incoming>| {
                            let recorded = Arc::clone(&recorded);
                            let body = body.clone();
                            async move {
                                recorded.lock().push(RecordedRequest {
                                    method: req.method().to_string(),
                                    path_and_query: req
                                        .uri()
                                        .path_and_query()
                                        .map(|pq| pq.to_string())
                                        .unwrap_or_else(|| req.uri().path().to_string()),
                                    authorization: req
                                        .headers()
                                        .get(hyper::header::AUTHORIZATION)
                                        .and_then(|value| value.to_str().ok())
                                        .map(str::to_string),
                                });

                                let mut response = hyper::Response::new(body);
                                *response.status_mut() = hyper::StatusCode::from_u16(status)
                                    .expect("stub status should be valid");
                                response.headers_mut().insert(
                                    "content-type",
                                    hyper::header::HeaderValue::from_static("application/json"),
                                );
                                Ok::<_, std::convert::Infallible>(response)
                            }
                        },
                    );
                    let _ = http1::Builder::new().serve_connection(io, service).await;
                });
            }
        });

        StubBackend {
            addr,
            requests,
            accept_task,
        }
    }

    /// Base URL clients should be pointed at
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}
