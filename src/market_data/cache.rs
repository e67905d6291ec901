// =============================================================================
// BarCache — short-lived cache of provider series per (symbol, interval)
// =============================================================================
//
// One coarse `parking_lot::RwLock` guards the map. Reads take a shared lock,
// writes replace the whole entry. Entries are never removed; a stale entry is
// simply bypassed and later overwritten.
// =============================================================================

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use super::bar::Bar;
use crate::types::Interval;

/// Default freshness window for cached series.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(20);

/// Composite key identifying one cached series.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct CacheKey {
    pub symbol: String,
    pub interval: Interval,
}

impl CacheKey {
    pub fn new(symbol: impl Into<String>, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}", self.symbol, self.interval)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    fetched_at: Instant,
    bars: Vec<Bar>,
}

/// Time-bounded cache of bar series.
pub struct BarCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl BarCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    #[cfg(test)]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached series for `key` if it is younger than the TTL.
    pub fn get_fresh(&self, key: &CacheKey) -> Option<Vec<Bar>> {
        self.get_fresh_at(key, Instant::now())
    }

    fn get_fresh_at(&self, key: &CacheKey, now: Instant) -> Option<Vec<Bar>> {
        let map = self.entries.read();
        map.get(key)
            .filter(|entry| now.saturating_duration_since(entry.fetched_at) < self.ttl)
            .map(|entry| entry.bars.clone())
    }

    /// Store `bars` for `key`, replacing any previous entry.
    pub fn insert(&self, key: CacheKey, bars: Vec<Bar>) {
        self.insert_at(key, bars, Instant::now());
    }

    fn insert_at(&self, key: CacheKey, bars: Vec<Bar>, fetched_at: Instant) {
        self.entries
            .write()
            .insert(key, CacheEntry { fetched_at, bars });
    }

    /// Number of keys ever stored (fresh or stale).
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}

impl Default for BarCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl std::fmt::Debug for BarCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarCache")
            .field("entries", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| Bar::new(i as i64 * 60, 10.0, 11.0, 9.0, 10.0, 5.0))
            .collect()
    }

    #[test]
    fn miss_on_empty_cache() {
        let cache = BarCache::default();
        assert!(cache.get_fresh(&CacheKey::new("IBM", Interval::FiveMin)).is_none());
    }

    #[test]
    fn hit_returns_identical_series() {
        let cache = BarCache::default();
        let key = CacheKey::new("IBM", Interval::FiveMin);
        cache.insert(key.clone(), bars(3));
        assert_eq!(cache.get_fresh(&key), Some(bars(3)));
    }

    #[test]
    fn keys_are_independent_per_interval() {
        let cache = BarCache::default();
        cache.insert(CacheKey::new("IBM", Interval::FiveMin), bars(3));
        assert!(cache.get_fresh(&CacheKey::new("IBM", Interval::OneMin)).is_none());
        assert!(cache.get_fresh(&CacheKey::new("MSFT", Interval::FiveMin)).is_none());
    }

    #[test]
    fn entry_expires_after_ttl() {
        let cache = BarCache::new(Duration::from_secs(20));
        let key = CacheKey::new("IBM", Interval::FiveMin);
        let t0 = Instant::now();
        cache.insert_at(key.clone(), bars(2), t0);

        assert!(cache.get_fresh_at(&key, t0 + Duration::from_secs(19)).is_some());
        assert!(cache.get_fresh_at(&key, t0 + Duration::from_secs(20)).is_none());
    }

    #[test]
    fn insert_overwrites_previous_entry() {
        let cache = BarCache::default();
        let key = CacheKey::new("IBM", Interval::FiveMin);
        cache.insert(key.clone(), bars(2));
        cache.insert(key.clone(), bars(4));
        assert_eq!(cache.get_fresh(&key).map(|b| b.len()), Some(4));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn key_display() {
        assert_eq!(CacheKey::new("IBM", Interval::SixtyMin).to_string(), "IBM|60min");
    }
}
