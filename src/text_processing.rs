//! # Offline Allergen Detection Module
//!
//! This module provides the offline half of the two-tier detection
//! strategy: regex scanning of OCR text against the compiled-in allergen
//! keyword table.
//!
//! ## Features
//!
//! - Word-boundary matching (`\bkeyword\b`) per table keyword, so
//!   "milkshake" does not trigger the "milk" row
//! - Case-insensitive matching via lowercased input
//! - Deduplication by canonical allergen name: one reported allergen per
//!   canonical entry no matter how many synonyms matched
//! - Patterns compiled once at first use

use crate::allergen_table::{KeywordEntry, KEYWORD_TABLE};
use crate::models::Allergen;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Build one word-boundary regex per keyword row.
///
/// Keywords are sorted longest first, matching the table scan order used
/// for reporting: when several synonyms of one canonical entry match, the
/// longest keyword is the one that "wins" (the rows carry identical
/// canonical fields, so this only fixes iteration order).
fn build_keyword_patterns() -> Vec<(Regex, &'static KeywordEntry)> {
    let mut entries: Vec<&'static KeywordEntry> = KEYWORD_TABLE.iter().collect();
    entries.sort_by(|a, b| {
        b.keyword
            .len()
            .cmp(&a.keyword.len())
            .then(a.keyword.cmp(b.keyword))
    });

    entries
        .into_iter()
        .map(|entry| {
            let pattern = format!(r"\b{}\b", regex::escape(entry.keyword));
            let regex = Regex::new(&pattern).expect("keyword pattern should be valid");
            (regex, entry)
        })
        .collect()
}

// Lazy static patterns to avoid recompilation
lazy_static! {
    static ref KEYWORD_PATTERNS: Vec<(Regex, &'static KeywordEntry)> = build_keyword_patterns();
}

/// Number of compiled keyword patterns. Forces compilation of the lazy
/// pattern set; used by the readiness probe.
pub fn keyword_pattern_count() -> usize {
    KEYWORD_PATTERNS.len()
}

/// Keyword detector scanning OCR text against the static allergen table
pub struct KeywordDetector {
    /// Compiled word-boundary patterns, one per table keyword
    patterns: &'static [(Regex, &'static KeywordEntry)],
}

impl KeywordDetector {
    /// Create a new keyword detector backed by the compiled-in table
    pub fn new() -> Self {
        Self {
            patterns: KEYWORD_PATTERNS.as_slice(),
        }
    }

    /// Scan OCR text and return the matched allergens, deduplicated by
    /// canonical name.
    ///
    /// Severity and alternate names come from the static table, not from
    /// the remote catalog, so results from this path may differ in id and
    /// severity from the online result for the same substance.
    pub fn scan(&self, ocr_text: &str) -> Vec<Allergen> {
        let lowered = ocr_text.to_lowercase();
        let mut seen_canonical: HashSet<&'static str> = HashSet::new();
        let mut allergens = Vec::new();

        for (pattern, entry) in self.patterns {
            if !pattern.is_match(&lowered) {
                continue;
            }
            if !seen_canonical.insert(entry.canonical_name) {
                trace!(
                    keyword = entry.keyword,
                    canonical = entry.canonical_name,
                    "Synonym match deduplicated"
                );
                continue;
            }
            debug!(
                keyword = entry.keyword,
                canonical = entry.canonical_name,
                severity = entry.severity_level,
                "Offline keyword match"
            );
            allergens.push(Allergen {
                id: entry.canonical_id,
                name: entry.canonical_name.to_string(),
                severity_level: entry.severity_level,
                description: None,
                alternative_names: Some(entry.alternative_names.to_string()),
            });
        }

        debug!(
            text_chars = ocr_text.chars().count(),
            matches = allergens.len(),
            "Offline keyword scan complete"
        );
        allergens
    }
}

impl Default for KeywordDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(allergens: &[Allergen]) -> Vec<&str> {
        allergens.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn test_single_keyword_match() {
        let detector = KeywordDetector::new();
        let result = detector.scan("contains milk");
        assert_eq!(names(&result), vec!["Susu"]);
    }

    #[test]
    fn test_case_insensitive_match() {
        let detector = KeywordDetector::new();
        let upper = detector.scan("CONTAINS MILK");
        let lower = detector.scan("contains milk");
        assert_eq!(names(&upper), names(&lower));
    }

    #[test]
    fn test_word_boundary_respected() {
        let detector = KeywordDetector::new();
        // "milkshake" contains "milk" as a substring but not as a word
        assert!(detector.scan("milkshake").is_empty());
        assert_eq!(names(&detector.scan("milk shake")), vec!["Susu"]);
    }

    #[test]
    fn test_synonyms_deduplicate_to_one_canonical() {
        let detector = KeywordDetector::new();
        let result = detector.scan("susu, milk, cheese and butter");
        assert_eq!(names(&result), vec!["Susu"]);
    }

    #[test]
    fn test_multiple_canonicals() {
        let detector = KeywordDetector::new();
        let result = detector.scan("wheat, milk and sesame");
        let mut found = names(&result);
        found.sort();
        assert_eq!(found, vec!["Gandum", "Susu", "Wijen"]);
    }

    #[test]
    fn test_offline_fields_come_from_table() {
        let detector = KeywordDetector::new();
        let result = detector.scan("peanut butter cookie");
        let kacang = result
            .iter()
            .find(|a| a.name == "Kacang")
            .expect("peanut should match Kacang");
        assert_eq!(kacang.severity_level, 3);
        assert!(kacang.description.is_none());
        assert!(kacang
            .alternative_names
            .as_deref()
            .is_some_and(|names| names.contains("Groundnut")));
    }

    #[test]
    fn test_no_match_returns_empty() {
        let detector = KeywordDetector::new();
        assert!(detector.scan("pure spring water").is_empty());
        assert!(detector.scan("").is_empty());
    }
}
