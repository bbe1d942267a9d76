//! # Allergen Scanner
//!
//! Client-side core of a food allergen scanning app: OCR text from a
//! camera pipeline is matched against a remote allergen catalog, with a
//! compiled-in keyword table as the offline fallback. Detection results
//! are cached per text fingerprint and near-identical consecutive frames
//! are throttled before they reach the network.

pub mod allergen_table;
pub mod api;
pub mod api_errors;
pub mod cache;
pub mod config;
pub mod detection_config;
pub mod detector;
pub mod errors;
pub mod localization;
pub mod models;
pub mod observability;
pub mod observability_config;
pub mod session;
pub mod similarity;
pub mod text_processing;
pub mod validation;

// Re-export types for easier access
pub use detector::AllergenDetector;
pub use models::{Allergen, DetectionResult, DetectionSource};
pub use session::{ScanSession, ScanState};
