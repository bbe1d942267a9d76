//! # Detection Integration Tests
//!
//! End-to-end coverage of the two-tier detection strategy: online
//! detection against a stub backend, offline fallback on server errors
//! and unreachable endpoints, and fingerprint cache replay across tiers.

mod test_helpers;

use allergen_scanner::models::DetectionSource;
use test_helpers::{detector_for, offline_detector, StubBackend};

#[tokio::test]
async fn test_online_detection_against_stub_backend() {
    let stub = StubBackend::start(
        200,
        r#"{"allergens": [{"id": 2, "name": "Susu", "severity_level": 2}], "has_allergens": true}"#,
    )
    .await;
    let detector = detector_for(&stub.base_url());

    let result = detector
        .detect("Contains milk")
        .await
        .expect("online detection should succeed");

    assert_eq!(result.source, DetectionSource::Online);
    assert!(result.has_allergens);
    assert_eq!(result.allergens.len(), 1);
    assert_eq!(result.allergens[0].name, "Susu");

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path_and_query, "/allergens/detect");
}

#[tokio::test]
async fn test_online_clean_result() {
    let stub = StubBackend::start(200, r#"{"allergens": [], "has_allergens": false}"#).await;
    let detector = detector_for(&stub.base_url());

    let result = detector
        .detect("Pure water, nothing else")
        .await
        .expect("online detection should succeed");

    assert_eq!(result.source, DetectionSource::Online);
    assert!(!result.has_allergens);
    assert!(result.allergens.is_empty());
}

#[tokio::test]
async fn test_server_error_falls_back_to_offline() {
    let stub = StubBackend::start(500, r#"{"error": "internal"}"#).await;
    let detector = detector_for(&stub.base_url());

    // The server failure is absorbed; the offline scan answers the frame
    let result = detector
        .detect("Contains milk and wheat flour")
        .await
        .expect("fallback should absorb the server error");

    assert_eq!(result.source, DetectionSource::Offline);
    let mut names: Vec<&str> = result.allergens.iter().map(|a| a.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["Gandum", "Susu"]);
}

#[tokio::test]
async fn test_undecodable_body_falls_back_to_offline() {
    let stub = StubBackend::start(200, "this is not json").await;
    let detector = detector_for(&stub.base_url());

    let result = detector
        .detect("Contains milk")
        .await
        .expect("fallback should absorb the decode failure");

    assert_eq!(result.source, DetectionSource::Offline);
    assert!(result.has_allergens);
}

#[tokio::test]
async fn test_unreachable_backend_falls_back_to_offline() {
    let detector = offline_detector();

    let result = detector
        .detect("Contains milk")
        .await
        .expect("fallback should absorb the connection failure");

    assert_eq!(result.source, DetectionSource::Offline);
    assert!(result.has_allergens);
}

#[tokio::test]
async fn test_online_result_replayed_from_cache() {
    let stub = StubBackend::start(
        200,
        r#"{"allergens": [{"id": 2, "name": "Susu", "severity_level": 2}], "has_allergens": true}"#,
    )
    .await;
    let detector = detector_for(&stub.base_url());

    let first = detector.detect("Contains milk").await.unwrap();
    assert_eq!(first.source, DetectionSource::Online);

    // Same text, different casing: the fingerprint is case-insensitive
    let second = detector.detect("CONTAINS MILK").await.unwrap();
    assert_eq!(second.source, DetectionSource::Cache);
    assert_eq!(second.allergens, first.allergens);

    // Only the first frame reached the backend
    assert_eq!(stub.requests().len(), 1);
}

#[tokio::test]
async fn test_fallback_result_replayed_from_cache() {
    let stub = StubBackend::start(503, "service unavailable").await;
    let detector = detector_for(&stub.base_url());

    let first = detector.detect("Contains wheat").await.unwrap();
    assert_eq!(first.source, DetectionSource::Offline);

    let second = detector.detect("Contains wheat").await.unwrap();
    assert_eq!(second.source, DetectionSource::Cache);
    assert_eq!(second.allergens, first.allergens);

    assert_eq!(stub.requests().len(), 1);
}

#[tokio::test]
async fn test_clean_offline_result_is_cached_too() {
    let detector = offline_detector();

    let first = detector.detect("Pure water, nothing else").await.unwrap();
    assert_eq!(first.source, DetectionSource::Offline);
    assert!(!first.has_allergens);

    // "Checked, nothing found" is a cache entry, not a miss
    let second = detector.detect("Pure water, nothing else").await.unwrap();
    assert_eq!(second.source, DetectionSource::Cache);
    assert!(!second.has_allergens);

    let stats = detector.cache_stats();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn test_cache_differentiates_beyond_fingerprint_scope() {
    let stub = StubBackend::start(500, "{}").await;
    let detector = detector_for(&stub.base_url());

    detector.detect("Contains milk").await.unwrap();
    let other = detector.detect("Contains soy").await.unwrap();

    // Different text within the fingerprint window is a fresh detection
    assert_eq!(other.source, DetectionSource::Offline);
    assert_eq!(other.allergens[0].name, "Kedelai");
    assert_eq!(detector.cache_stats().entries, 2);
}
