//! Seen-packet cache with combined LRU + sliding-TTL eviction
//!
//! Memory is bounded to `max_size` entries while inactive entries expire
//! after `max_age` of no touches.
//!
//! Every touch refreshes both the recency position and the deadline, so the
//! LRU end of the cache is always the soonest-to-expire entry. That ordering
//! lets a single `purge_expired` sweep replace per-entry timers without
//! changing observable eviction behavior.

use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use tokio::time::Instant;

use murmur_core::PacketId;

/// Default time-to-live for cached ids
pub const DEFAULT_MAX_AGE: Duration = Duration::from_millis(10_000);

/// Default maximum number of cached ids
pub const DEFAULT_MAX_SIZE: usize = 100;

/// Tuning for a [`SeenCache`]
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Sliding time-to-live of an entry
    pub max_age: Duration,
    /// Maximum number of entries held at once
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            max_age: DEFAULT_MAX_AGE,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

/// Bounded set of recently seen packet identifiers
///
/// Each entry carries a deadline `max_age` after its last touch. Both
/// [`add`](SeenCache::add) and [`has`](SeenCache::has) count as touches:
/// they re-arm the deadline and move the entry to the most-recently-used
/// position. Inserting a new id at capacity evicts the least-recently
/// touched entry first.
pub struct SeenCache {
    /// id -> expiry deadline, in recency order
    entries: LruCache<PacketId, Instant>,
    max_age: Duration,
}

impl SeenCache {
    /// Create a cache with the given bounds (`max_size` is clamped to >= 1)
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_size).unwrap_or(NonZeroUsize::MIN);
        SeenCache {
            entries: LruCache::new(capacity),
            max_age: config.max_age,
        }
    }

    /// Insert an id, or refresh it if already present
    ///
    /// Refreshing re-arms the expiry deadline; the old deadline is replaced,
    /// never left live alongside the new one.
    pub fn add(&mut self, id: PacketId) {
        let deadline = Instant::now() + self.max_age;
        self.entries.put(id, deadline);
    }

    /// Membership probe that doubles as a touch
    ///
    /// A live entry is re-armed and promoted. An entry past its deadline is
    /// removed and reported absent, so callers observe TTL expiry exactly as
    /// if a timer had fired.
    pub fn has(&mut self, id: PacketId) -> bool {
        let now = Instant::now();
        let expired = match self.entries.get_mut(&id) {
            Some(deadline) => {
                if *deadline > now {
                    *deadline = now + self.max_age;
                    return true;
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.pop(&id);
        }
        false
    }

    /// Remove an id unconditionally; no-op if absent
    pub fn remove(&mut self, id: PacketId) {
        self.entries.pop(&id);
    }

    /// Evict every entry whose deadline has passed, returning the count
    ///
    /// Deadline order equals recency order, so eviction pops from the LRU
    /// end and stops at the first live entry.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let mut evicted = 0;
        while let Some((_, deadline)) = self.entries.peek_lru() {
            if *deadline > now {
                break;
            }
            self.entries.pop_lru();
            evicted += 1;
        }
        evicted
    }

    /// Drop every entry, cancelling all pending expiries
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Capacity bound
    pub fn max_size(&self) -> usize {
        self.entries.cap().get()
    }

    /// Sliding time-to-live
    pub fn max_age(&self) -> Duration {
        self.max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn cache(max_age_ms: u64, max_size: usize) -> SeenCache {
        SeenCache::new(CacheConfig {
            max_age: Duration::from_millis(max_age_ms),
            max_size,
        })
    }

    fn id(byte: u8) -> PacketId {
        PacketId::from_bytes([byte; 16])
    }

    #[test]
    fn test_add_then_has() {
        let mut seen = cache(1000, 10);

        assert!(!seen.has(id(1)));
        seen.add(id(1));
        assert!(seen.has(id(1)));
        assert!(!seen.has(id(2)));
    }

    #[test]
    fn test_lru_eviction_order() {
        let mut seen = cache(1000, 2);

        seen.add(id(b'a'));
        seen.add(id(b'b'));
        seen.add(id(b'c'));

        assert!(!seen.has(id(b'a')));
        assert!(seen.has(id(b'b')));
        assert!(seen.has(id(b'c')));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_touch_promotes() {
        let mut seen = cache(1000, 2);

        seen.add(id(b'a'));
        seen.add(id(b'b'));
        // Touching `a` makes `b` the LRU entry
        assert!(seen.has(id(b'a')));
        seen.add(id(b'c'));

        assert!(seen.has(id(b'a')));
        assert!(!seen.has(id(b'b')));
        assert!(seen.has(id(b'c')));
    }

    #[test]
    fn test_re_add_refreshes_instead_of_duplicating() {
        let mut seen = cache(1000, 2);

        seen.add(id(b'a'));
        seen.add(id(b'a'));
        seen.add(id(b'b'));

        assert_eq!(seen.len(), 2);
        assert!(seen.has(id(b'a')));
        assert!(seen.has(id(b'b')));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut seen = cache(1000, 10);

        seen.add(id(1));
        seen.remove(id(1));
        seen.remove(id(1));

        assert!(!seen.has(id(1)));
        assert!(seen.is_empty());
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut seen = cache(1000, 0);
        seen.add(id(1));
        assert_eq!(seen.max_size(), 1);
        assert_eq!(seen.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_sliding_refresh() {
        let mut seen = cache(1000, 10);

        seen.add(id(1));
        advance(Duration::from_millis(900)).await;
        // Touch at t=900 re-arms the deadline to t=1900
        assert!(seen.has(id(1)));

        advance(Duration::from_millis(900)).await;
        assert!(seen.has(id(1)));

        advance(Duration::from_millis(1001)).await;
        assert!(!seen.has(id(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_reopens_id() {
        let mut seen = cache(1000, 10);

        seen.add(id(1));
        advance(Duration::from_millis(1001)).await;
        assert!(!seen.has(id(1)));

        // The id can be seen again as if brand new
        seen.add(id(1));
        assert!(seen.has(id(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_sweeps_dead_entries() {
        let mut seen = cache(1000, 10);

        seen.add(id(1));
        seen.add(id(2));
        advance(Duration::from_millis(1001)).await;

        let evicted = seen.purge_expired(Instant::now());
        assert_eq!(evicted, 2);
        assert!(seen.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_stops_at_live_entry() {
        let mut seen = cache(1000, 10);

        seen.add(id(1));
        advance(Duration::from_millis(600)).await;
        seen.add(id(2));
        advance(Duration::from_millis(500)).await;

        // t=1100: id 1 died at 1000, id 2 lives until 1600
        let evicted = seen.purge_expired(Instant::now());
        assert_eq!(evicted, 1);
        assert!(!seen.has(id(1)));
        assert!(seen.has(id(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_all_expiries() {
        let mut seen = cache(1000, 10);

        seen.add(id(1));
        seen.add(id(2));
        seen.clear();

        assert!(seen.is_empty());
        assert_eq!(seen.purge_expired(Instant::now()), 0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn capacity_is_never_exceeded(ids in prop::collection::vec(any::<u8>(), 0..256), max_size in 1usize..16) {
                let mut seen = cache(1000, max_size);
                for byte in ids {
                    seen.add(id(byte));
                    prop_assert!(seen.len() <= max_size);
                }
            }

            #[test]
            fn last_added_id_is_always_present(ids in prop::collection::vec(any::<u8>(), 1..256), max_size in 1usize..16) {
                let mut seen = cache(1000, max_size);
                for &byte in &ids {
                    seen.add(id(byte));
                }
                let last = *ids.last().unwrap();
                prop_assert!(seen.has(id(last)));
            }
        }
    }
}
