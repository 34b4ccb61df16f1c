//! Memoized access decisions with TTL expiry and atomic invalidation.
//!
//! Keyed by (page, resource, principal): a cache populated for one identity
//! is never consulted for another, even after logout/login in the same
//! client instance. All operations take a single lock, so `invalidate_all`
//! is atomic with respect to interleaved reads — no reader observes a
//! half-cleared cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use peopleops_core::{PageId, PrincipalId, ResourceId};

use crate::clock::Clock;
use crate::decision::Decision;

/// Composite cache key. `resource: None` keys non-resource-scoped checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub page: PageId,
    pub resource: Option<ResourceId>,
    pub principal: PrincipalId,
}

impl CacheKey {
    pub fn new(page: PageId, resource: Option<ResourceId>, principal: PrincipalId) -> Self {
        Self {
            page,
            resource,
            principal,
        }
    }
}

impl core::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.resource {
            Some(r) => write!(f, "{}/{}/{}", self.page, r, self.principal),
            None => write!(f, "{}/none/{}", self.page, self.principal),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    decision: Decision,
    stored_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    /// Bumped by every `invalidate_all`. Decision requests snapshot the
    /// generation when they start; a completed request only populates the
    /// cache if the generation is still the one it started under.
    generation: u64,
}

/// Decisions expire after this long by default.
pub fn default_ttl() -> Duration {
    Duration::minutes(5)
}

/// Process-wide decision cache.
///
/// Cheap to clone; all clones share the same entries.
#[derive(Clone)]
pub struct DecisionCache {
    state: Arc<Mutex<CacheState>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl DecisionCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(default_ttl(), clock)
    }

    pub fn with_ttl(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            ttl,
            clock,
        }
    }

    /// A cached decision, unless missing or older than the TTL. Expired
    /// entries are evicted on observation.
    pub fn get(&self, key: &CacheKey) -> Option<Decision> {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match state.entries.get(key) {
            Some(entry) if now - entry.stored_at < self.ttl => Some(entry.decision.clone()),
            Some(_) => {
                state.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store or overwrite a decision.
    pub fn put(&self, key: CacheKey, decision: Decision) {
        let stored_at = self.clock.now();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.entries.insert(key, CacheEntry { decision, stored_at });
    }

    /// Store only if no invalidation happened since `generation` was
    /// observed. Returns whether the entry was stored.
    pub fn put_if_generation(&self, key: CacheKey, decision: Decision, generation: u64) -> bool {
        let stored_at = self.clock.now();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.generation != generation {
            tracing::debug!(key = %key, "discarding decision resolved before invalidation");
            return false;
        }
        state.entries.insert(key, CacheEntry { decision, stored_at });
        true
    }

    /// Drop every entry. Synchronous; the very next `get` for any key is a
    /// miss.
    pub fn invalidate_all(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let dropped = state.entries.len();
        state.entries.clear();
        state.generation += 1;
        tracing::debug!(dropped, generation = state.generation, "decision cache invalidated");
    }

    /// The current invalidation generation.
    pub fn generation(&self) -> u64 {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.generation
    }

    /// Number of live entries (diagnostics; may include not-yet-evicted
    /// expired entries).
    pub fn len(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn key(page: &'static str, resource: Option<i64>, principal: PrincipalId) -> CacheKey {
        CacheKey::new(PageId::from(page), resource.map(ResourceId::new), principal)
    }

    fn setup() -> (Arc<ManualClock>, DecisionCache) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = DecisionCache::new(clock.clone());
        (clock, cache)
    }

    fn granted_view() -> Decision {
        Decision {
            can_view: true,
            ..Decision::denied("")
        }
    }

    #[test]
    fn hit_within_ttl_miss_after() {
        let (clock, cache) = setup();
        let principal = PrincipalId::new();
        let k = key("employees/list", None, principal);

        cache.put(k.clone(), granted_view());
        assert!(cache.get(&k).is_some());

        clock.advance(Duration::minutes(4));
        assert!(cache.get(&k).is_some());

        clock.advance(Duration::minutes(2));
        assert!(cache.get(&k).is_none(), "entry older than TTL must miss");
        assert!(cache.is_empty(), "expired entry is evicted on observation");
    }

    #[test]
    fn entries_are_isolated_per_principal() {
        let (_clock, cache) = setup();
        let p1 = PrincipalId::new();
        let p2 = PrincipalId::new();

        cache.put(key("employees/edit", Some(42), p1), granted_view());

        assert!(cache.get(&key("employees/edit", Some(42), p1)).is_some());
        assert!(
            cache.get(&key("employees/edit", Some(42), p2)).is_none(),
            "a decision cached under one principal must never serve another"
        );
    }

    #[test]
    fn resource_id_distinguishes_entries() {
        let (_clock, cache) = setup();
        let principal = PrincipalId::new();

        cache.put(key("employees/edit", Some(1), principal), granted_view());

        assert!(cache.get(&key("employees/edit", Some(2), principal)).is_none());
        assert!(cache.get(&key("employees/edit", None, principal)).is_none());
    }

    #[test]
    fn invalidate_all_makes_next_get_miss() {
        let (_clock, cache) = setup();
        let principal = PrincipalId::new();
        let keys: Vec<CacheKey> = (0..10)
            .map(|i| key("employees/edit", Some(i), principal))
            .collect();
        for k in &keys {
            cache.put(k.clone(), granted_view());
        }

        cache.invalidate_all();

        for k in &keys {
            assert!(cache.get(k).is_none());
        }
    }

    #[test]
    fn put_if_generation_discards_pre_invalidation_result() {
        let (_clock, cache) = setup();
        let principal = PrincipalId::new();
        let k = key("employees/edit", Some(42), principal);

        let generation = cache.generation();
        cache.invalidate_all();

        assert!(!cache.put_if_generation(k.clone(), granted_view(), generation));
        assert!(cache.get(&k).is_none());

        // A post-invalidation snapshot stores normally.
        assert!(cache.put_if_generation(k.clone(), granted_view(), cache.generation()));
        assert!(cache.get(&k).is_some());
    }

    #[test]
    fn overwrite_refreshes_entry() {
        let (clock, cache) = setup();
        let principal = PrincipalId::new();
        let k = key("dashboard", None, principal);

        cache.put(k.clone(), Decision::denied("no"));
        clock.advance(Duration::minutes(4));
        cache.put(k.clone(), granted_view());
        clock.advance(Duration::minutes(2));

        // Still within TTL of the second put.
        let hit = cache.get(&k).expect("refreshed entry should still be live");
        assert!(hit.can_view);
    }
}
