//! # Detection Configuration Module
//!
//! This module defines the tuning knobs of the allergen detection pipeline:
//! the frame throttle window, similarity prefix, cache fingerprint length,
//! the artificial offline-processing delay and the cache bound.

// Constants for detection configuration
pub const DEFAULT_THROTTLE_MS: u64 = 3000;
pub const DEFAULT_SIMILARITY_PREFIX_CHARS: usize = 50;
pub const DEFAULT_FINGERPRINT_CHARS: usize = 100;
pub const DEFAULT_OFFLINE_DELAY_MS: u64 = 800;
pub const DEFAULT_CACHE_CAPACITY: usize = 256;
pub const DEFAULT_MAX_FRAME_CHARS: usize = 2000;

/// Configuration structure for the detection pipeline
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Minimum interval between consecutive detection attempts in milliseconds
    pub throttle_ms: u64,
    /// Number of leading characters compared by the frame similarity guard
    pub similarity_prefix_chars: usize,
    /// Number of leading characters kept in a cache fingerprint
    pub fingerprint_chars: usize,
    /// Artificial delay applied to the offline path in milliseconds.
    /// UX smoothing only; zero disables it (tests run with zero).
    pub offline_delay_ms: u64,
    /// Maximum number of fingerprints held by the detection cache
    pub cache_capacity: usize,
    /// Maximum accepted OCR frame length in characters
    pub max_frame_chars: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            throttle_ms: DEFAULT_THROTTLE_MS,
            similarity_prefix_chars: DEFAULT_SIMILARITY_PREFIX_CHARS,
            fingerprint_chars: DEFAULT_FINGERPRINT_CHARS,
            offline_delay_ms: DEFAULT_OFFLINE_DELAY_MS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_frame_chars: DEFAULT_MAX_FRAME_CHARS,
        }
    }
}

impl DetectionConfig {
    /// Validate detection configuration parameters
    pub fn validate(&self) -> crate::errors::AppResult<()> {
        if self.throttle_ms == 0 {
            return Err(crate::errors::AppError::Config(
                "throttle_ms must be greater than 0".to_string(),
            ));
        }
        if self.similarity_prefix_chars == 0 {
            return Err(crate::errors::AppError::Config(
                "similarity_prefix_chars must be greater than 0".to_string(),
            ));
        }
        if self.fingerprint_chars == 0 {
            return Err(crate::errors::AppError::Config(
                "fingerprint_chars must be greater than 0".to_string(),
            ));
        }
        if self.offline_delay_ms > 10_000 {
            return Err(crate::errors::AppError::Config(format!(
                "offline_delay_ms ({}) must not exceed 10000",
                self.offline_delay_ms
            )));
        }
        if self.cache_capacity == 0 {
            return Err(crate::errors::AppError::Config(
                "cache_capacity must be greater than 0".to_string(),
            ));
        }
        if self.max_frame_chars < self.fingerprint_chars {
            return Err(crate::errors::AppError::Config(format!(
                "max_frame_chars ({}) must be >= fingerprint_chars ({})",
                self.max_frame_chars, self.fingerprint_chars
            )));
        }
        Ok(())
    }

    /// Configuration suitable for tests: no artificial offline delay
    pub fn for_tests() -> Self {
        Self {
            offline_delay_ms: 0,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(unused_assignments)]
    fn test_detection_config_validation() {
        let mut config = DetectionConfig::default();

        // Valid config should pass
        assert!(config.validate().is_ok());

        // Test invalid throttle_ms
        config.throttle_ms = 0;
        assert!(config.validate().is_err());
        config.throttle_ms = DEFAULT_THROTTLE_MS;

        // Test invalid similarity_prefix_chars
        config.similarity_prefix_chars = 0;
        assert!(config.validate().is_err());
        config.similarity_prefix_chars = DEFAULT_SIMILARITY_PREFIX_CHARS;

        // Test invalid fingerprint_chars
        config.fingerprint_chars = 0;
        assert!(config.validate().is_err());
        config.fingerprint_chars = DEFAULT_FINGERPRINT_CHARS;

        // Test excessive offline_delay_ms
        config.offline_delay_ms = 60_000;
        assert!(config.validate().is_err());
        config.offline_delay_ms = DEFAULT_OFFLINE_DELAY_MS;

        // Test invalid cache_capacity
        config.cache_capacity = 0;
        assert!(config.validate().is_err());
        config.cache_capacity = DEFAULT_CACHE_CAPACITY;

        // Test max_frame_chars < fingerprint_chars
        config.max_frame_chars = 10;
        assert!(config.validate().is_err());
        config.max_frame_chars = DEFAULT_MAX_FRAME_CHARS;
    }

    #[test]
    fn test_zero_offline_delay_is_valid() {
        let config = DetectionConfig {
            offline_delay_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_for_tests_preset() {
        let config = DetectionConfig::for_tests();
        assert_eq!(config.offline_delay_ms, 0);
        assert_eq!(config.throttle_ms, DEFAULT_THROTTLE_MS);
        assert!(config.validate().is_ok());
    }
}
