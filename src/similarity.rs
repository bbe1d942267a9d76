//! # Frame Similarity Guard Module
//!
//! This module decides whether a new OCR frame deserves a detection
//! attempt. Camera preview frames arrive continuously, and consecutive
//! frames of the same label are near-identical; reprocessing each one
//! would hammer the backend and the offline matcher for no benefit.
//!
//! The guard rejects a frame when a detection is already in flight, when
//! the cooldown window since the last allowed frame has not elapsed, or
//! when the text is too similar to the last processed text. The decision
//! is pure: callers commit the timestamp and last-text memory only when
//! they actually proceed.

use crate::detection_config::DetectionConfig;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::trace;

/// Pluggable text similarity test.
///
/// The production metric is deliberately crude (see
/// [`PrefixContainment`]); the trait exists so a real string-distance
/// metric can replace it without touching the guard or the session.
pub trait SimilarityMetric: Send + Sync {
    /// True if the two texts are similar enough to treat the newer one
    /// as a repeat frame.
    fn is_too_similar(&self, a: &str, b: &str) -> bool;
}

/// Containment check over normalized text prefixes.
///
/// Takes up to the first `prefix_chars` characters of each string,
/// trimmed and lowercased, and judges the texts similar when one prefix
/// is a substring of the other. This is a containment check, not edit
/// distance: "conta" and "contains milk" compare similar, while two
/// labels differing in their first characters never do. Known to be
/// imprecise for OCR noise in the middle of long labels.
#[derive(Debug, Clone)]
pub struct PrefixContainment {
    prefix_chars: usize,
}

impl PrefixContainment {
    pub fn new(prefix_chars: usize) -> Self {
        Self { prefix_chars }
    }

    fn prefix(&self, text: &str) -> String {
        text.trim()
            .to_lowercase()
            .chars()
            .take(self.prefix_chars)
            .collect()
    }
}

impl SimilarityMetric for PrefixContainment {
    fn is_too_similar(&self, a: &str, b: &str) -> bool {
        let prefix_a = self.prefix(a);
        let prefix_b = self.prefix(b);
        prefix_a.contains(&prefix_b) || prefix_b.contains(&prefix_a)
    }
}

/// Outcome of a guard evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Frame should be processed; caller must call `commit`
    Proceed,
    /// A detection is already in flight
    InFlight,
    /// Cooldown window since the last allowed frame has not elapsed
    Throttled,
    /// Text is too similar to the last processed text
    TooSimilar,
}

impl GuardDecision {
    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardDecision::Proceed => "proceed",
            GuardDecision::InFlight => "in_flight",
            GuardDecision::Throttled => "throttled",
            GuardDecision::TooSimilar => "too_similar",
        }
    }
}

#[derive(Debug, Default)]
struct GuardMemory {
    /// When the last allowed frame was committed
    last_allowed_at: Option<Instant>,
    /// Text of the last committed frame. `None` until the first commit,
    /// so the very first frame is never judged similar to anything.
    last_text: Option<String>,
}

/// Frame admission guard combining the in-flight check, the cooldown
/// window and the similarity test.
pub struct FrameGuard {
    throttle: Duration,
    metric: Box<dyn SimilarityMetric>,
    memory: Mutex<GuardMemory>,
}

impl FrameGuard {
    /// Create a guard with the default containment metric
    pub fn new(config: &DetectionConfig) -> Self {
        Self::with_metric(
            config,
            Box::new(PrefixContainment::new(config.similarity_prefix_chars)),
        )
    }

    /// Create a guard with a custom similarity metric
    pub fn with_metric(config: &DetectionConfig, metric: Box<dyn SimilarityMetric>) -> Self {
        Self {
            throttle: Duration::from_millis(config.throttle_ms),
            metric,
            memory: Mutex::new(GuardMemory::default()),
        }
    }

    /// Decide whether a new frame should be processed.
    ///
    /// Checks, in order: detection already in flight, cooldown window,
    /// similarity to the last committed text. Mutates nothing; a caller
    /// that proceeds must follow up with [`commit`](Self::commit).
    pub fn evaluate(&self, text: &str, in_flight: bool) -> GuardDecision {
        if in_flight {
            trace!("Frame rejected: detection already in flight");
            return GuardDecision::InFlight;
        }

        let memory = self.memory.lock();

        if let Some(last_allowed_at) = memory.last_allowed_at {
            if last_allowed_at.elapsed() < self.throttle {
                trace!(
                    elapsed_ms = last_allowed_at.elapsed().as_millis() as u64,
                    throttle_ms = self.throttle.as_millis() as u64,
                    "Frame rejected: inside throttle window"
                );
                return GuardDecision::Throttled;
            }
        }

        if let Some(last_text) = &memory.last_text {
            if self.metric.is_too_similar(text, last_text) {
                trace!("Frame rejected: too similar to last processed text");
                return GuardDecision::TooSimilar;
            }
        }

        GuardDecision::Proceed
    }

    /// Record a frame that was allowed to proceed. Updates the throttle
    /// timestamp and the last-text memory.
    pub fn commit(&self, text: &str) {
        let mut memory = self.memory.lock();
        memory.last_allowed_at = Some(Instant::now());
        memory.last_text = Some(text.to_string());
    }

    /// Forget the throttle timestamp and last-text memory
    pub fn reset(&self) {
        *self.memory.lock() = GuardMemory::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn guard_with_throttle_ms(throttle_ms: u64) -> FrameGuard {
        let config = DetectionConfig {
            throttle_ms,
            ..DetectionConfig::for_tests()
        };
        FrameGuard::new(&config)
    }

    #[test]
    fn test_containment_is_symmetric_on_prefixes() {
        let metric = PrefixContainment::new(50);
        assert!(metric.is_too_similar("contains milk", "Contains Milk and wheat"));
        assert!(metric.is_too_similar("Contains Milk and wheat", "contains milk"));
        assert!(!metric.is_too_similar("contains milk", "pure water"));
    }

    #[test]
    fn test_containment_only_compares_prefixes() {
        let metric = PrefixContainment::new(10);
        // Identical first 10 chars, divergent tails
        assert!(metric.is_too_similar(
            "ingredient list: milk, sugar",
            "ingredient register: water"
        ));
    }

    #[test]
    fn test_containment_ignores_case_and_whitespace() {
        let metric = PrefixContainment::new(50);
        assert!(metric.is_too_similar("  MILK AND WHEAT  ", "milk and wheat"));
    }

    #[test]
    fn test_first_frame_proceeds() {
        let guard = guard_with_throttle_ms(3000);
        assert_eq!(guard.evaluate("contains milk", false), GuardDecision::Proceed);
    }

    #[test]
    fn test_in_flight_rejects_before_anything_else() {
        let guard = guard_with_throttle_ms(3000);
        assert_eq!(
            guard.evaluate("contains milk", true),
            GuardDecision::InFlight
        );
    }

    #[test]
    fn test_throttle_window_rejects_second_frame() {
        let guard = guard_with_throttle_ms(3000);
        assert_eq!(guard.evaluate("contains milk", false), GuardDecision::Proceed);
        guard.commit("contains milk");

        // Different text, still inside the window
        assert_eq!(
            guard.evaluate("pure water bottle", false),
            GuardDecision::Throttled
        );
    }

    #[test]
    fn test_similarity_rejects_after_window_elapses() {
        let guard = guard_with_throttle_ms(10);
        assert_eq!(guard.evaluate("contains milk", false), GuardDecision::Proceed);
        guard.commit("contains milk");

        thread::sleep(Duration::from_millis(30));

        assert_eq!(
            guard.evaluate("CONTAINS MILK", false),
            GuardDecision::TooSimilar
        );
        assert_eq!(
            guard.evaluate("pure water bottle", false),
            GuardDecision::Proceed
        );
    }

    #[test]
    fn test_evaluate_without_commit_leaves_memory_untouched() {
        let guard = guard_with_throttle_ms(3000);
        assert_eq!(guard.evaluate("contains milk", false), GuardDecision::Proceed);
        // No commit: the same frame is still allowed
        assert_eq!(guard.evaluate("contains milk", false), GuardDecision::Proceed);
    }

    #[test]
    fn test_reset_forgets_throttle_and_text() {
        let guard = guard_with_throttle_ms(3000);
        guard.commit("contains milk");
        assert_eq!(
            guard.evaluate("contains milk", false),
            GuardDecision::Throttled
        );

        guard.reset();
        assert_eq!(guard.evaluate("contains milk", false), GuardDecision::Proceed);
    }

    #[test]
    fn test_custom_metric_is_honored() {
        struct AlwaysSimilar;
        impl SimilarityMetric for AlwaysSimilar {
            fn is_too_similar(&self, _: &str, _: &str) -> bool {
                true
            }
        }

        let config = DetectionConfig {
            throttle_ms: 10,
            ..DetectionConfig::for_tests()
        };
        let guard = FrameGuard::with_metric(&config, Box::new(AlwaysSimilar));
        guard.commit("anything");
        thread::sleep(Duration::from_millis(30));
        assert_eq!(
            guard.evaluate("completely different", false),
            GuardDecision::TooSimilar
        );
    }
}
