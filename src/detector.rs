//! # Two-Tier Detection Module
//!
//! Orchestrates one detection attempt per OCR frame: fingerprint cache
//! first, then the online endpoint, then the offline keyword scan when
//! the online path fails for any reason.
//!
//! The fallback policy is deliberate: a network failure must never stall
//! the scanning experience, so every online error (transport, HTTP
//! status, decode, timeout) is absorbed into an offline attempt for that
//! frame. There is no retry, backoff or breaker here; the online endpoint
//! is tried afresh on every new, non-cached, unthrottled frame.

use crate::api::AllergenApiClient;
use crate::cache::{CacheStats, DetectionCache, Fingerprint};
use crate::detection_config::DetectionConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{DetectionResult, DetectionSource};
use crate::observability::detection_span;
use crate::observability::metrics::{
    record_cache_lookup, record_detection_metrics, record_online_fallback,
};
use crate::text_processing::KeywordDetector;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn, Instrument};

/// Two-tier allergen detector owning the fingerprint cache
pub struct AllergenDetector {
    api: AllergenApiClient,
    keywords: KeywordDetector,
    cache: Arc<DetectionCache>,
    config: DetectionConfig,
}

impl AllergenDetector {
    pub fn new(api: AllergenApiClient, config: DetectionConfig) -> Self {
        Self {
            api,
            keywords: KeywordDetector::new(),
            cache: Arc::new(DetectionCache::new(config.cache_capacity)),
            config,
        }
    }

    /// The backend client, exposed for scan-history calls and the
    /// readiness probe
    pub fn api(&self) -> &AllergenApiClient {
        &self.api
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Statistics of the owned fingerprint cache
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop all cached fingerprints. Called by the owning session on
    /// teardown.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn fingerprint(&self, text: &str) -> Fingerprint {
        Fingerprint::with_max_chars(text, self.config.fingerprint_chars)
    }

    fn check_frame_length(&self, text: &str) -> AppResult<()> {
        let chars = text.chars().count();
        if chars > self.config.max_frame_chars {
            return Err(AppError::Validation(format!(
                "OCR frame too long: {} characters (max {})",
                chars, self.config.max_frame_chars
            )));
        }
        Ok(())
    }

    /// Run one detection attempt: cache, then online, then offline
    /// fallback on any online failure.
    #[instrument(skip_all, fields(text_chars = text.chars().count()))]
    pub async fn detect(&self, text: &str) -> AppResult<DetectionResult> {
        self.check_frame_length(text)?;
        let started = Instant::now();

        let fingerprint = self.fingerprint(text);
        if let Some(allergens) = self.cache.get(&fingerprint) {
            record_cache_lookup(true);
            debug!(
                fingerprint = fingerprint.as_str(),
                allergens = allergens.len(),
                "Detection served from cache"
            );
            let result =
                DetectionResult::new(text.to_string(), allergens, DetectionSource::Cache);
            record_detection_metrics("cache", result.has_allergens, started.elapsed());
            return Ok(result);
        }
        record_cache_lookup(false);

        match self.api.detect(text).await {
            Ok(result) => {
                self.cache.put(fingerprint, result.allergens.clone());
                debug!(
                    allergens = result.allergens.len(),
                    has_allergens = result.has_allergens,
                    "Online detection succeeded"
                );
                record_detection_metrics("online", result.has_allergens, started.elapsed());
                Ok(result)
            }
            Err(api_error) => {
                // Absorbed by design: the offline path answers this frame
                warn!(
                    error = %api_error,
                    "Online detection failed, falling back to offline scan"
                );
                record_online_fallback(api_error.kind());

                let result = self
                    .run_offline_scan(text, fingerprint)
                    .instrument(detection_span("offline"))
                    .await?;
                record_detection_metrics("offline", result.has_allergens, started.elapsed());
                Ok(result)
            }
        }
    }

    /// Run the offline keyword scan directly, bypassing cache lookup and
    /// the online endpoint. The result still updates the cache.
    pub async fn detect_offline(&self, text: &str) -> AppResult<DetectionResult> {
        self.check_frame_length(text)?;
        let started = Instant::now();
        let fingerprint = self.fingerprint(text);
        let result = self
            .run_offline_scan(text, fingerprint)
            .instrument(detection_span("offline"))
            .await?;
        record_detection_metrics("offline", result.has_allergens, started.elapsed());
        Ok(result)
    }

    async fn run_offline_scan(
        &self,
        text: &str,
        fingerprint: Fingerprint,
    ) -> AppResult<DetectionResult> {
        // Perceived-processing delay, UX smoothing only. Zero in tests.
        if self.config.offline_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.offline_delay_ms)).await;
        }

        let allergens = self.keywords.scan(text);
        self.cache.put(fingerprint, allergens.clone());

        Ok(DetectionResult::new(
            text.to_string(),
            allergens,
            DetectionSource::Offline,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;

    fn offline_only_detector() -> AllergenDetector {
        // Unroutable endpoint so every online attempt fails fast
        let api_config = ApiConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 1,
            api_token: None,
        };
        let api = AllergenApiClient::new(&api_config).expect("client should build");
        AllergenDetector::new(api, DetectionConfig::for_tests())
    }

    #[tokio::test]
    async fn test_offline_scan_finds_allergens_and_caches() {
        let detector = offline_only_detector();

        let result = detector
            .detect_offline("Contains milk and wheat flour")
            .await
            .expect("offline scan should succeed");

        assert!(result.has_allergens);
        assert_eq!(result.source, DetectionSource::Offline);
        let mut names: Vec<&str> = result.allergens.iter().map(|a| a.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Gandum", "Susu"]);

        assert_eq!(detector.cache_stats().entries, 1);
    }

    #[tokio::test]
    async fn test_offline_scan_empty_result_is_cached() {
        let detector = offline_only_detector();

        let result = detector
            .detect_offline("Pure water, nothing else")
            .await
            .expect("offline scan should succeed");
        assert!(!result.has_allergens);
        assert!(result.allergens.is_empty());

        // Second detection replays the cached empty result
        let replay = detector
            .detect("Pure water, nothing else")
            .await
            .expect("cached detection should succeed");
        assert_eq!(replay.source, DetectionSource::Cache);
        assert!(!replay.has_allergens);
    }

    #[tokio::test]
    async fn test_online_failure_falls_back_to_offline() {
        let detector = offline_only_detector();

        let result = detector
            .detect("Contains milk")
            .await
            .expect("fallback should absorb the online failure");

        assert_eq!(result.source, DetectionSource::Offline);
        assert!(result.has_allergens);
    }

    #[tokio::test]
    async fn test_cache_replay_after_fallback() {
        let detector = offline_only_detector();

        let first = detector.detect("Contains milk").await.unwrap();
        assert_eq!(first.source, DetectionSource::Offline);

        let second = detector.detect("contains milk").await.unwrap();
        assert_eq!(second.source, DetectionSource::Cache);
        assert_eq!(second.allergens, first.allergens);
    }

    #[tokio::test]
    async fn test_overlong_frame_is_rejected() {
        let detector = offline_only_detector();
        let frame = "a".repeat(10_000);

        let error = detector.detect(&frame).await.unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let detector = offline_only_detector();
        detector.detect_offline("Contains milk").await.unwrap();
        assert_eq!(detector.cache_stats().entries, 1);

        detector.clear_cache();
        assert_eq!(detector.cache_stats().entries, 0);
    }
}
