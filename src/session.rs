//! Scan session state machine driving the scanning screen.
//!
//! One `ScanSession` lives for the lifetime of a scanning screen. It owns
//! the two-tier detector, the frame guard and a single mutable state
//! snapshot that the UI observes. Every state transition replaces the
//! whole snapshot and publishes it on a watch channel, so observers never
//! see a half-applied update.
//!
//! Detection runs as a spawned task, at most one in flight. The in-flight
//! slot holds the task's `JoinHandle`; a new frame is rejected while the
//! previous task is still running, and `reset_state` or dropping the
//! session aborts it outright.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::detector::AllergenDetector;
use crate::errors::{error_logging, AppError};
use crate::models::{Allergen, DetectionResult, DetectionSource};
use crate::observability::metrics::{
    record_error_metrics, record_frame_rejected, record_guard_decision, record_scan_alert,
    update_session_gauges,
};
use crate::observability::session_span;
use crate::similarity::{FrameGuard, GuardDecision};
use crate::validation::validate_frame_text;

/// Snapshot of everything the scanning screen renders.
///
/// Replaced wholesale on every transition. `temporary_pause_scan` is the
/// guard flag that suppresses new detection attempts while an alert is
/// visible or the user paused manually.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanState {
    pub is_scanning: bool,
    pub is_processing: bool,
    pub temporary_pause_scan: bool,
    pub ocr_text: String,
    pub detected_allergens: Vec<Allergen>,
    pub has_allergens: bool,
    pub show_allergen_alert: bool,
    pub show_safe_product_alert: bool,
    pub source: Option<DetectionSource>,
    pub error_message: Option<String>,
}

impl ScanState {
    /// True while either alert dialog is up
    pub fn alert_visible(&self) -> bool {
        self.show_allergen_alert || self.show_safe_product_alert
    }
}

struct SessionInner {
    detector: AllergenDetector,
    guard: FrameGuard,
    state: Mutex<ScanState>,
    state_tx: watch::Sender<ScanState>,
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl SessionInner {
    /// Apply a mutation to the state snapshot and publish the new copy.
    ///
    /// The lock is held across the publish so observers receive updates
    /// in the order they were applied.
    fn update_state(&self, mutate: impl FnOnce(&mut ScanState)) {
        let mut state = self.state.lock();
        mutate(&mut state);
        update_session_gauges(
            state.is_scanning,
            state.is_processing,
            state.temporary_pause_scan,
        );
        self.state_tx.send_replace(state.clone());
    }

    /// True if a previously spawned detection task is still running.
    /// Finished handles are dropped from the slot as a side effect.
    fn detection_in_flight(&self) -> bool {
        let mut slot = self.in_flight.lock();
        match slot.as_ref() {
            Some(handle) if handle.is_finished() => {
                *slot = None;
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    fn abort_in_flight(&self) {
        if let Some(handle) = self.in_flight.lock().take() {
            handle.abort();
        }
    }

    fn apply_result(&self, result: DetectionResult) {
        let alert_kind = if result.has_allergens {
            "allergen"
        } else {
            "safe"
        };
        record_scan_alert(alert_kind);
        info!(
            allergens = result.allergens.len(),
            has_allergens = result.has_allergens,
            source = result.source.as_str(),
            "Detection complete, pausing scan for alert"
        );

        self.update_state(|state| {
            state.is_processing = false;
            state.ocr_text = result.ocr_text.clone();
            state.detected_allergens = result.allergens.clone();
            state.has_allergens = result.has_allergens;
            state.source = Some(result.source);
            state.show_allergen_alert = result.has_allergens;
            state.show_safe_product_alert = !result.has_allergens;
            state.temporary_pause_scan = true;
            state.error_message = None;
        });
    }

    fn apply_failure(&self, frame: &str, error: AppError) {
        // Online failures never reach here (the detector absorbs them
        // into an offline attempt); this is the offline scan itself
        // failing. Scanning continues on the next frame.
        error_logging::log_detection_error(
            &error,
            "detect_allergens",
            frame.chars().count(),
            None,
        );
        record_error_metrics("detection", "session");
        self.update_state(|state| {
            state.is_processing = false;
            state.error_message = Some(error.to_string());
        });
    }
}

/// Owns one scanning screen's detection pipeline and observable state.
///
/// Not cloneable: the session is the single writer of its state. Dropping
/// it aborts any in-flight detection and clears the fingerprint cache.
pub struct ScanSession {
    inner: Arc<SessionInner>,
}

impl ScanSession {
    pub fn new(detector: AllergenDetector) -> Self {
        let guard = FrameGuard::new(detector.config());
        let (state_tx, _) = watch::channel(ScanState::default());
        Self {
            inner: Arc::new(SessionInner {
                detector,
                guard,
                state: Mutex::new(ScanState::default()),
                state_tx,
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> ScanState {
        self.inner.state.lock().clone()
    }

    /// Subscribe to state snapshots. Each published transition replaces
    /// the receiver's value; `changed().await` wakes on every one.
    pub fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.inner.state_tx.subscribe()
    }

    pub fn start_scanning(&self) {
        debug!("Scan started");
        self.inner.update_state(|state| {
            state.is_scanning = true;
            state.temporary_pause_scan = false;
            state.error_message = None;
        });
    }

    /// Stop accepting new frames. An already in-flight detection is left
    /// to finish and its result still lands in state, so an alert raised
    /// a moment after stopping is expected.
    pub fn stop_scanning(&self) {
        debug!("Scan stopped");
        self.inner.update_state(|state| {
            state.is_scanning = false;
        });
    }

    /// Manual pause, independent of the alert-driven pause flag
    pub fn pause_scanning(&self) {
        self.inner.update_state(|state| {
            state.temporary_pause_scan = true;
        });
    }

    pub fn resume_scanning(&self) {
        self.inner.update_state(|state| {
            state.temporary_pause_scan = false;
        });
    }

    pub fn dismiss_allergen_alert(&self) {
        self.inner.update_state(|state| {
            state.show_allergen_alert = false;
            state.temporary_pause_scan = false;
        });
    }

    pub fn dismiss_safe_product_alert(&self) {
        self.inner.update_state(|state| {
            state.show_safe_product_alert = false;
            state.temporary_pause_scan = false;
        });
    }

    /// Abort any in-flight detection, forget the last processed frame and
    /// return the screen to its initial state. The fingerprint cache is
    /// kept: previously checked labels stay instant after a reset.
    pub fn reset_state(&self) {
        debug!("Session state reset");
        self.inner.abort_in_flight();
        self.inner.guard.reset();
        self.inner.update_state(|state| {
            *state = ScanState::default();
        });
    }

    /// Feed one OCR frame into the pipeline.
    ///
    /// Frames are dropped without surfacing anything when the session is
    /// not scanning, is paused, fails validation, or the guard rejects
    /// them (in-flight, throttled, or too similar to the last frame).
    /// When a frame is accepted, detection runs as a spawned task and the
    /// result arrives through the state channel.
    pub fn detect_allergens(&self, text: &str) {
        let span = session_span("detect_allergens");
        let _enter = span.enter();

        {
            let state = self.inner.state.lock();
            if !state.is_scanning || state.temporary_pause_scan {
                debug!(
                    is_scanning = state.is_scanning,
                    paused = state.temporary_pause_scan,
                    "Frame dropped, session not accepting frames"
                );
                return;
            }
        }

        let max_chars = self.inner.detector.config().max_frame_chars;
        let frame = match validate_frame_text(text, max_chars) {
            Ok(frame) => frame,
            Err(reason) => {
                debug!(reason, "Frame rejected by validation");
                record_frame_rejected(reason);
                return;
            }
        };

        let in_flight = self.inner.detection_in_flight();
        let decision = self.inner.guard.evaluate(frame, in_flight);
        record_guard_decision(decision.as_str());
        if decision != GuardDecision::Proceed {
            debug!(decision = decision.as_str(), "Frame skipped by guard");
            return;
        }
        self.inner.guard.commit(frame);

        self.inner.update_state(|state| {
            state.is_processing = true;
            state.ocr_text = frame.to_string();
        });

        let inner = Arc::clone(&self.inner);
        let frame = frame.to_string();
        let handle = tokio::spawn(async move {
            match inner.detector.detect(&frame).await {
                Ok(result) => inner.apply_result(result),
                Err(error) => inner.apply_failure(&frame, error),
            }
        });
        *self.inner.in_flight.lock() = Some(handle);
    }

    /// Cache statistics of the owned detector, for teardown logging
    pub fn cache_stats(&self) -> crate::cache::CacheStats {
        self.inner.detector.cache_stats()
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.inner.abort_in_flight();
        let stats = self.inner.detector.cache_stats();
        debug!(
            entries = stats.entries,
            hits = stats.hits,
            misses = stats.misses,
            "Session dropped, clearing detection cache"
        );
        self.inner.detector.clear_cache();
    }
}
