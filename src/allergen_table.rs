//! # Offline Allergen Keyword Table
//!
//! Compiled-in mapping from lowercase ingredient keywords to canonical
//! allergen entries. This table backs the offline detector: every keyword
//! row carries the canonical name, an ordinal severity (1-3) and a display
//! string of alternate names. Several keyword rows may share one canonical
//! entry (synonyms in English and Indonesian); detection deduplicates by
//! canonical name.
//!
//! The ids in this table are local to the offline path and intentionally
//! independent from the remote catalog ids (see [`online_name_for_id`]).

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Lowest severity carried by table entries
pub const SEVERITY_MIN: u8 = 1;
/// Highest severity carried by table entries
pub const SEVERITY_MAX: u8 = 3;

/// One keyword row of the offline table
#[derive(Debug, Clone, Copy)]
pub struct KeywordEntry {
    /// Lowercase keyword matched with word boundaries against OCR text
    pub keyword: &'static str,
    /// Stable id of the canonical allergen, local to the offline table
    pub canonical_id: i64,
    /// Canonical allergen name reported to the user
    pub canonical_name: &'static str,
    /// Ordinal severity, 1 (mild) to 3 (severe)
    pub severity_level: u8,
    /// Comma-separated alternate names for display
    pub alternative_names: &'static str,
}

const fn entry(
    keyword: &'static str,
    canonical_id: i64,
    canonical_name: &'static str,
    severity_level: u8,
    alternative_names: &'static str,
) -> KeywordEntry {
    KeywordEntry {
        keyword,
        canonical_id,
        canonical_name,
        severity_level,
        alternative_names,
    }
}

/// Static keyword table.
///
/// Note: "flour" is deliberately absent. Plain flour is only an allergen
/// when it is wheat flour, which the "wheat"/"gandum"/"terigu" and
/// "tepung" rows already cover.
pub const KEYWORD_TABLE: &[KeywordEntry] = &[
    // Susu (milk and dairy derivatives)
    entry("milk", 1, "Susu", 2, "Dairy, Laktosa, Whey"),
    entry("susu", 1, "Susu", 2, "Dairy, Laktosa, Whey"),
    entry("dairy", 1, "Susu", 2, "Dairy, Laktosa, Whey"),
    entry("whey", 1, "Susu", 2, "Dairy, Laktosa, Whey"),
    entry("lactose", 1, "Susu", 2, "Dairy, Laktosa, Whey"),
    entry("laktosa", 1, "Susu", 2, "Dairy, Laktosa, Whey"),
    entry("cheese", 1, "Susu", 2, "Dairy, Laktosa, Whey"),
    entry("keju", 1, "Susu", 2, "Dairy, Laktosa, Whey"),
    entry("butter", 1, "Susu", 2, "Dairy, Laktosa, Whey"),
    entry("mentega", 1, "Susu", 2, "Dairy, Laktosa, Whey"),
    entry("cream", 1, "Susu", 2, "Dairy, Laktosa, Whey"),
    entry("krim", 1, "Susu", 2, "Dairy, Laktosa, Whey"),
    // Telur (egg)
    entry("egg", 2, "Telur", 2, "Albumin, Mayones"),
    entry("telur", 2, "Telur", 2, "Albumin, Mayones"),
    entry("albumin", 2, "Telur", 2, "Albumin, Mayones"),
    entry("mayonnaise", 2, "Telur", 2, "Albumin, Mayones"),
    entry("mayones", 2, "Telur", 2, "Albumin, Mayones"),
    // Kacang (peanut)
    entry("peanut", 3, "Kacang", 3, "Kacang Tanah, Groundnut"),
    entry("kacang", 3, "Kacang", 3, "Kacang Tanah, Groundnut"),
    entry("groundnut", 3, "Kacang", 3, "Kacang Tanah, Groundnut"),
    // Gandum (wheat)
    entry("wheat", 4, "Gandum", 2, "Terigu, Wheat"),
    entry("gandum", 4, "Gandum", 2, "Terigu, Wheat"),
    entry("terigu", 4, "Gandum", 2, "Terigu, Wheat"),
    // Tepung (generic flour, Indonesian labelling)
    entry("tepung", 5, "Tepung", 1, "Tepung Terigu"),
    // Kedelai (soy)
    entry("soy", 6, "Kedelai", 2, "Soya, Tahu, Tempe"),
    entry("soya", 6, "Kedelai", 2, "Soya, Tahu, Tempe"),
    entry("soybean", 6, "Kedelai", 2, "Soya, Tahu, Tempe"),
    entry("kedelai", 6, "Kedelai", 2, "Soya, Tahu, Tempe"),
    entry("tofu", 6, "Kedelai", 2, "Soya, Tahu, Tempe"),
    entry("tahu", 6, "Kedelai", 2, "Soya, Tahu, Tempe"),
    entry("tempe", 6, "Kedelai", 2, "Soya, Tahu, Tempe"),
    // Udang (shrimp)
    entry("shrimp", 7, "Udang", 3, "Prawn"),
    entry("udang", 7, "Udang", 3, "Prawn"),
    entry("prawn", 7, "Udang", 3, "Prawn"),
    // Kepiting (crab)
    entry("crab", 8, "Kepiting", 3, "Crab"),
    entry("kepiting", 8, "Kepiting", 3, "Crab"),
    // Kerang (shellfish)
    entry("shellfish", 9, "Kerang", 3, "Tiram, Clam"),
    entry("kerang", 9, "Kerang", 3, "Tiram, Clam"),
    entry("clam", 9, "Kerang", 3, "Tiram, Clam"),
    entry("oyster", 9, "Kerang", 3, "Tiram, Clam"),
    entry("tiram", 9, "Kerang", 3, "Tiram, Clam"),
    // Ikan (fish)
    entry("fish", 10, "Ikan", 2, "Teri, Tuna, Salmon"),
    entry("ikan", 10, "Ikan", 2, "Teri, Tuna, Salmon"),
    entry("anchovy", 10, "Ikan", 2, "Teri, Tuna, Salmon"),
    entry("teri", 10, "Ikan", 2, "Teri, Tuna, Salmon"),
    entry("tuna", 10, "Ikan", 2, "Teri, Tuna, Salmon"),
    entry("salmon", 10, "Ikan", 2, "Teri, Tuna, Salmon"),
    // Gluten
    entry("gluten", 11, "Gluten", 2, "Gluten"),
    // Wijen (sesame)
    entry("sesame", 12, "Wijen", 2, "Tahini"),
    entry("wijen", 12, "Wijen", 2, "Tahini"),
    entry("tahini", 12, "Wijen", 2, "Tahini"),
];

lazy_static! {
    /// Keyword -> entry lookup built from [`KEYWORD_TABLE`]
    static ref KEYWORD_INDEX: HashMap<&'static str, &'static KeywordEntry> = {
        let mut index = HashMap::with_capacity(KEYWORD_TABLE.len());
        for entry in KEYWORD_TABLE {
            index.insert(entry.keyword, entry);
        }
        index
    };

    /// Remote catalog id -> canonical name, used when the detection API
    /// returns an allergen record without any usable name field. These ids
    /// belong to the remote catalog and do not line up with the offline
    /// `canonical_id` values.
    static ref ONLINE_ID_NAMES: HashMap<i64, &'static str> = {
        let mut names = HashMap::new();
        names.insert(1, "Gluten");
        names.insert(2, "Susu");
        names.insert(3, "Telur");
        names.insert(4, "Kacang");
        names.insert(5, "Kedelai");
        names.insert(6, "Ikan");
        names.insert(7, "Udang");
        names.insert(8, "Gandum");
        names.insert(9, "Wijen");
        names.insert(10, "Kerang");
        names
    };
}

/// Look up a keyword row by its exact lowercase keyword
pub fn entry_for_keyword(keyword: &str) -> Option<&'static KeywordEntry> {
    KEYWORD_INDEX.get(keyword).copied()
}

/// Resolve a remote catalog id to a display name, if known
pub fn online_name_for_id(id: i64) -> Option<&'static str> {
    ONLINE_ID_NAMES.get(&id).copied()
}
