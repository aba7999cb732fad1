//! Bookkeeping behind the result cache: live entries, in-flight markers and
//! the eviction policy.
//!
//! Everything here is synchronous and runs under the cache mutex. Nothing in
//! this module awaits.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use super::key::AnalysisKey;
use crate::Error;

/// What a computation produced, as broadcast to its waiters.
pub(crate) type Outcome<V> = Result<Arc<V>, Error>;

pub(crate) type OutcomeRx<V> = watch::Receiver<Option<Outcome<V>>>;

pub(crate) struct CacheEntry<V> {
    value: Arc<V>,
    created_at: Instant,
    ttl: Duration,
    /// Recency tick, bumped on lookup hits only.
    last_used: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.ttl
    }
}

/// A computation in progress for one key.
pub(crate) struct InFlight<V> {
    pub(crate) id: u64,
    pub(crate) rx: OutcomeRx<V>,
}

pub(crate) enum Lookup<V> {
    Hit(Arc<V>),
    /// An entry existed but had expired; it has been removed.
    Expired,
    Missing,
}

/// Why an entry was displaced at insertion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Eviction {
    Expired,
    LeastRecentlyUsed,
}

pub(crate) struct State<V> {
    entries: HashMap<AnalysisKey, CacheEntry<V>>,
    in_flight: HashMap<AnalysisKey, InFlight<V>>,
    tick: u64,
    next_flight_id: u64,
}

impl<V> Default for State<V> {
    fn default() -> Self {
        Self { entries: HashMap::new(), in_flight: HashMap::new(), tick: 0, next_flight_id: 0 }
    }
}

impl<V> State<V> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Look up a live entry, dropping it if it has expired.
    pub(crate) fn lookup(&mut self, key: &AnalysisKey, now: Instant) -> Lookup<V> {
        let expired = match self.entries.get(key) {
            None => return Lookup::Missing,
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            self.entries.remove(key);
            return Lookup::Expired;
        }

        let tick = self.next_tick();
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_used = tick;
                Lookup::Hit(Arc::clone(&entry.value))
            }
            None => Lookup::Missing,
        }
    }

    pub(crate) fn in_flight(&self, key: &AnalysisKey) -> Option<&InFlight<V>> {
        self.in_flight.get(key)
    }

    /// Register a new computation for `key` and return its id.
    pub(crate) fn begin_flight(&mut self, key: AnalysisKey, rx: OutcomeRx<V>) -> u64 {
        self.next_flight_id += 1;
        let id = self.next_flight_id;
        self.in_flight.insert(key, InFlight { id, rx });
        id
    }

    /// Remove the marker for `key` if it still belongs to flight `id`.
    ///
    /// Returns false when the flight was detached by `invalidate` or `clear`
    /// (possibly replaced by a newer flight), in which case its result must
    /// not be stored.
    pub(crate) fn finish_flight(&mut self, key: &AnalysisKey, id: u64) -> bool {
        if self.in_flight.get(key).is_some_and(|f| f.id == id) {
            self.in_flight.remove(key);
            true
        } else {
            false
        }
    }

    /// Store a value, evicting as needed so `capacity` is never exceeded.
    pub(crate) fn insert(
        &mut self, key: AnalysisKey, value: Arc<V>, now: Instant, ttl: Duration, capacity: usize,
    ) -> Vec<(AnalysisKey, Eviction)> {
        let mut evicted = Vec::new();

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = value;
            entry.created_at = now;
            entry.ttl = ttl;
            return evicted;
        }

        while self.entries.len() >= capacity.max(1) {
            match self.evict_one(now) {
                Some(victim) => evicted.push(victim),
                None => break,
            }
        }

        let last_used = self.next_tick();
        self.entries.insert(key, CacheEntry { value, created_at: now, ttl, last_used });
        evicted
    }

    /// Pick the oldest expired entry, else the least recently used one.
    fn evict_one(&mut self, now: Instant) -> Option<(AnalysisKey, Eviction)> {
        let victim = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .min_by_key(|(_, e)| (e.created_at, e.last_used))
            .map(|(k, _)| (k.clone(), Eviction::Expired))
            .or_else(|| {
                self.entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_used)
                    .map(|(k, _)| (k.clone(), Eviction::LeastRecentlyUsed))
            })?;

        self.entries.remove(&victim.0);
        Some(victim)
    }

    /// Drop the entry and any in-flight marker for `key`.
    pub(crate) fn remove(&mut self, key: &AnalysisKey) -> bool {
        let had_entry = self.entries.remove(key).is_some();
        let had_flight = self.in_flight.remove(key).is_some();
        had_entry || had_flight
    }

    pub(crate) fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        self.in_flight.clear();
        n
    }

    pub(crate) fn remove_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        before - self.entries.len()
    }

    pub(crate) fn live_len(&self, now: Instant) -> usize {
        self.entries.values().filter(|e| !e.is_expired(now)).count()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::AnalysisOptions;

    const TTL: Duration = Duration::from_secs(10);

    fn key(path: &str) -> AnalysisKey {
        AnalysisKey::new(&format!("https://example.com/{path}"), &AnalysisOptions::default()).unwrap()
    }

    fn put(state: &mut State<&'static str>, k: &AnalysisKey, v: &'static str, now: Instant, capacity: usize) {
        state.insert(k.clone(), Arc::new(v), now, TTL, capacity);
    }

    #[test]
    fn test_lookup_hit_and_expiry_boundary() {
        let mut state = State::default();
        let now = Instant::now();
        let a = key("a");
        put(&mut state, &a, "A", now, 4);

        assert!(matches!(state.lookup(&a, now + TTL - Duration::from_millis(1)), Lookup::Hit(v) if *v == "A"));
        assert!(matches!(state.lookup(&a, now + TTL), Lookup::Expired));
        assert!(matches!(state.lookup(&a, now), Lookup::Missing));
    }

    #[test]
    fn test_evicts_lru_when_nothing_expired() {
        let mut state = State::default();
        let now = Instant::now();
        let (a, b, c) = (key("a"), key("b"), key("c"));
        put(&mut state, &a, "A", now, 2);
        put(&mut state, &b, "B", now, 2);
        assert!(matches!(state.lookup(&a, now), Lookup::Hit(_)));

        let evicted = state.insert(c.clone(), Arc::new("C"), now, TTL, 2);
        assert_eq!(evicted, vec![(b.clone(), Eviction::LeastRecentlyUsed)]);
        assert!(matches!(state.lookup(&a, now), Lookup::Hit(_)));
        assert!(matches!(state.lookup(&c, now), Lookup::Hit(_)));
        assert!(matches!(state.lookup(&b, now), Lookup::Missing));
    }

    #[test]
    fn test_evicts_expired_before_lru() {
        let mut state = State::default();
        let t0 = Instant::now();
        let (a, b, c) = (key("a"), key("b"), key("c"));
        put(&mut state, &a, "A", t0, 2);
        put(&mut state, &b, "B", t0 + Duration::from_secs(5), 2);
        // A becomes most recently used, B stays least recently used.
        assert!(matches!(state.lookup(&a, t0 + Duration::from_secs(6)), Lookup::Hit(_)));

        let later = t0 + Duration::from_secs(11);
        let evicted = state.insert(c, Arc::new("C"), later, TTL, 2);
        assert_eq!(evicted, vec![(a, Eviction::Expired)]);
        assert!(matches!(state.lookup(&b, later), Lookup::Hit(_)));
    }

    #[test]
    fn test_overwrite_does_not_evict_or_refresh_recency() {
        let mut state = State::default();
        let now = Instant::now();
        let (a, b, c) = (key("a"), key("b"), key("c"));
        put(&mut state, &a, "A", now, 2);
        put(&mut state, &b, "B", now, 2);
        assert!(state.insert(a.clone(), Arc::new("A2"), now, TTL, 2).is_empty());

        let evicted = state.insert(c, Arc::new("C"), now, TTL, 2);
        assert_eq!(evicted, vec![(a, Eviction::LeastRecentlyUsed)]);
    }

    #[test]
    fn test_finish_flight_only_for_current_id() {
        let mut state: State<&'static str> = State::default();
        let a = key("a");
        let (_tx, rx) = watch::channel(None);
        let first = state.begin_flight(a.clone(), rx.clone());
        assert!(state.remove(&a));
        let second = state.begin_flight(a.clone(), rx);

        assert!(!state.finish_flight(&a, first));
        assert_eq!(state.in_flight_len(), 1);
        assert!(state.finish_flight(&a, second));
        assert_eq!(state.in_flight_len(), 0);
    }

    #[test]
    fn test_remove_expired_and_live_len() {
        let mut state = State::default();
        let t0 = Instant::now();
        put(&mut state, &key("a"), "A", t0, 8);
        put(&mut state, &key("b"), "B", t0 + Duration::from_secs(5), 8);

        let later = t0 + Duration::from_secs(12);
        assert_eq!(state.len(), 2);
        assert_eq!(state.live_len(later), 1);
        assert_eq!(state.remove_expired(later), 1);
        assert_eq!(state.len(), 1);
        assert_eq!(state.clear(), 1);
    }
}
