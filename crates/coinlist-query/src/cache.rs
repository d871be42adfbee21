//! Session-wide query cache.
//!
//! Maps a `DisplayKey` to the rows of the most recent successful fetch for
//! that key. Created empty once per session and never evicted; entries are
//! only replaced by a later success for the same key.

use chrono::{DateTime, Utc};
use coinlist_core::{DisplayKey, MarketEntry};
use coinlist_telemetry::Metrics;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Shared, immutable page of rows.
pub type Rows = Arc<Vec<MarketEntry>>;

/// Cached page with insertion time.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: DisplayKey,
    pub value: Rows,
    pub inserted_at: DateTime<Utc>,
}

/// Display-key -> rows store.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: DashMap<DisplayKey, CacheEntry>,
}

impl QueryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows for a display key, if any success was stored.
    pub fn get(&self, key: &DisplayKey) -> Option<Rows> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Full entry including insertion time.
    pub fn get_entry(&self, key: &DisplayKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    /// Store rows for a display key. Last writer wins, no merge.
    pub fn set(&self, key: DisplayKey, value: Rows) {
        debug!(key = %key, rows = value.len(), "Cache set");
        let entry = CacheEntry {
            key: key.clone(),
            value,
            inserted_at: Utc::now(),
        };
        self.entries.insert(key, entry);
        Metrics::cache_entries(self.entries.len());
    }

    /// Check if rows exist for a display key.
    pub fn contains(&self, key: &DisplayKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached display keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All cached display keys.
    pub fn keys(&self) -> Vec<DisplayKey> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinlist_core::{PageSize, QueryParams, SortOrder};
    use rust_decimal_macros::dec;

    fn key(page: u32) -> DisplayKey {
        QueryParams::new("usd", SortOrder::MarketCapDesc, page, PageSize::Ten).display_key()
    }

    fn row(id: &str) -> MarketEntry {
        MarketEntry {
            id: id.to_string(),
            symbol: id.to_string(),
            name: id.to_string(),
            image_url: String::new(),
            current_price: Some(dec!(1)),
            market_cap: Some(dec!(100)),
            market_cap_rank: Some(1),
            circulating_supply: Some(dec!(100)),
            total_supply: None,
            max_supply: None,
            extra: Default::default(),
        }
    }

    #[test]
    fn test_cache_basic() {
        let cache = QueryCache::new();
        assert!(cache.get(&key(1)).is_none());
        assert!(cache.is_empty());

        cache.set(key(1), Arc::new(vec![row("bitcoin")]));

        let rows = cache.get(&key(1)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "bitcoin");
        assert!(cache.contains(&key(1)));
        assert!(!cache.contains(&key(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_set_overwrites() {
        let cache = QueryCache::new();
        cache.set(key(1), Arc::new(vec![row("bitcoin"), row("ethereum")]));
        let first = cache.get_entry(&key(1)).unwrap();

        cache.set(key(1), Arc::new(vec![row("solana")]));
        let second = cache.get_entry(&key(1)).unwrap();

        assert_eq!(second.value.len(), 1);
        assert_eq!(second.value[0].id, "solana");
        assert!(second.inserted_at >= first.inserted_at);
        assert_eq!(second.key, key(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let cache = QueryCache::new();
        cache.set(key(1), Arc::new(vec![row("bitcoin")]));
        cache.set(key(2), Arc::new(vec![row("dogecoin")]));

        assert_eq!(cache.get(&key(1)).unwrap()[0].id, "bitcoin");
        assert_eq!(cache.get(&key(2)).unwrap()[0].id, "dogecoin");

        let mut keys = cache.keys();
        keys.sort_by_key(|k| k.page);
        assert_eq!(keys, vec![key(1), key(2)]);
    }
}
