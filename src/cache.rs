//! Detection result caching
//!
//! This module provides the fingerprint cache that lets the scan session
//! skip repeated detection work for text it has already checked.
//!
//! ## Semantics
//!
//! - Keys are normalized text fingerprints ([`Fingerprint`]): lowercased,
//!   trimmed, truncated to a fixed number of characters.
//! - A hit with an empty allergen list means "checked, none found" and is
//!   distinct from a miss ("not yet checked"). Callers route the former to
//!   the safe-product path without re-detecting.
//! - Bounded LRU: the least recently used entry is evicted once the
//!   configured capacity is exceeded. The owning session clears the cache
//!   on teardown.

use crate::detection_config::DEFAULT_FINGERPRINT_CHARS;
use crate::models::Allergen;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Normalized cache key derived from OCR text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Build a fingerprint with the default truncation length
    pub fn new(text: &str) -> Self {
        Self::with_max_chars(text, DEFAULT_FINGERPRINT_CHARS)
    }

    /// Build a fingerprint truncated to `max_chars` characters.
    ///
    /// Normalization order: trim, lowercase, truncate. Truncation counts
    /// characters, not bytes, so multibyte text never splits a character.
    pub fn with_max_chars(text: &str, max_chars: usize) -> Self {
        let normalized: String = text.trim().to_lowercase().chars().take(max_chars).collect();
        Self(normalized)
    }

    /// The normalized key text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of characters in the normalized key
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Total number of entries
    pub entries: usize,
    /// Number of hits
    pub hits: u64,
    /// Number of misses
    pub misses: u64,
    /// Number of entries evicted by the capacity bound
    pub evictions: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

#[derive(Debug, Clone)]
struct CacheSlot {
    allergens: Vec<Allergen>,
    last_used: u64,
}

struct CacheInner {
    entries: HashMap<Fingerprint, CacheSlot>,
    /// Monotonic use counter backing the LRU ordering
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Thread-safe bounded LRU cache from fingerprints to allergen lists.
///
/// All methods take `&self`; the session and its spawned detection task
/// share one instance behind an `Arc`.
pub struct DetectionCache {
    capacity: usize,
    inner: RwLock<CacheInner>,
}

impl DetectionCache {
    /// Create a cache bounded to `capacity` entries. A zero capacity is
    /// rounded up to one so `put` always retains the newest entry.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: RwLock::new(CacheInner {
                entries: HashMap::new(),
                tick: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        }
    }

    /// Look up a fingerprint.
    ///
    /// `Some(vec![])` is a valid hit: the text was checked before and no
    /// allergens were found.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Vec<Allergen>> {
        let mut inner = self.inner.write();
        inner.tick += 1;
        let tick = inner.tick;

        match inner.entries.get_mut(fingerprint) {
            Some(slot) => {
                slot.last_used = tick;
                let allergens = slot.allergens.clone();
                inner.hits += 1;
                Some(allergens)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Insert or replace an entry, evicting the least recently used entry
    /// if the capacity bound is exceeded.
    pub fn put(&self, fingerprint: Fingerprint, allergens: Vec<Allergen>) {
        let mut inner = self.inner.write();
        inner.tick += 1;
        let tick = inner.tick;

        inner.entries.insert(
            fingerprint,
            CacheSlot {
                allergens,
                last_used: tick,
            },
        );

        if inner.entries.len() > self.capacity {
            if let Some(oldest) = inner
                .entries
                .iter()
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(key, _)| key.clone())
            {
                inner.entries.remove(&oldest);
                inner.evictions += 1;
                tracing::debug!(
                    fingerprint = oldest.as_str(),
                    "Evicted least recently used cache entry"
                );
            }
        }
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.read();
        let total_requests = inner.hits + inner.misses;
        let hit_rate = if total_requests > 0 {
            inner.hits as f64 / total_requests as f64
        } else {
            0.0
        };
        CacheStats {
            entries: inner.entries.len(),
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            hit_rate,
        }
    }

    /// Clear all entries and reset statistics
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.tick = 0;
        inner.hits = 0;
        inner.misses = 0;
        inner.evictions = 0;
    }
}
