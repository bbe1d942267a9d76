//! # Domain Models
//!
//! Shared types of the detection pipeline: the allergen record, the
//! per-frame detection result with its source tag, and the scan-history
//! payload sent to the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A detected allergen.
///
/// Identity is by `id`. Ids and severities are source-defined: online
/// results carry remote catalog ids, offline results carry the local
/// table ids, and the two are not reconciled (see [`DetectionSource`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allergen {
    pub id: i64,
    pub name: String,
    /// Ordinal risk indicator, 1 (mild) to 3 (severe) in the offline
    /// table; the remote catalog may use a wider range.
    pub severity_level: u8,
    pub description: Option<String>,
    pub alternative_names: Option<String>,
}

/// Which tier produced a detection result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionSource {
    /// Remote detection endpoint
    Online,
    /// Local keyword table fallback
    Offline,
    /// Previously computed result replayed from the fingerprint cache
    Cache,
}

impl DetectionSource {
    /// Stable lowercase label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionSource::Online => "online",
            DetectionSource::Offline => "offline",
            DetectionSource::Cache => "cache",
        }
    }
}

/// Outcome of one detection attempt for one OCR frame. Ephemeral,
/// recomputed per frame, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub ocr_text: String,
    pub allergens: Vec<Allergen>,
    pub has_allergens: bool,
    pub source: DetectionSource,
}

impl DetectionResult {
    pub fn new(ocr_text: String, allergens: Vec<Allergen>, source: DetectionSource) -> Self {
        let has_allergens = !allergens.is_empty();
        Self {
            ocr_text,
            allergens,
            has_allergens,
            source,
        }
    }
}

/// One scan-history entry as accepted by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub barcode: Option<String>,
    pub ocr_text: String,
    pub allergens: Vec<Allergen>,
    pub has_allergens: bool,
    pub recorded_at: DateTime<Utc>,
}

/// A product looked up by barcode from the backend catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub barcode: String,
    pub name: String,
    pub ingredients_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_result_derives_has_allergens() {
        let empty = DetectionResult::new("text".to_string(), vec![], DetectionSource::Offline);
        assert!(!empty.has_allergens);

        let allergen = Allergen {
            id: 1,
            name: "Susu".to_string(),
            severity_level: 2,
            description: None,
            alternative_names: None,
        };
        let found =
            DetectionResult::new("text".to_string(), vec![allergen], DetectionSource::Online);
        assert!(found.has_allergens);
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(DetectionSource::Online.as_str(), "online");
        assert_eq!(DetectionSource::Offline.as_str(), "offline");
        assert_eq!(DetectionSource::Cache.as_str(), "cache");
    }
}
