//! TTL result cache with single-flight deduplication.
//!
//! Per key the cache moves through three states:
//!
//! - **Absent**: no entry, no computation. The first caller registers an
//!   in-flight marker and the computation is spawned on the Tokio runtime.
//! - **InFlight**: later callers subscribe to the marker's watch channel and
//!   wait; no second computation starts.
//! - **Live**: the computation succeeded. The marker is removed and the entry
//!   inserted under one lock acquisition, then the outcome is broadcast.
//!
//! A failed computation goes back to Absent without storing anything. Live
//! entries go back to Absent when a read finds them expired, on sweep, on
//! eviction or on `invalidate`.
//!
//! The mutex only guards bookkeeping. It is never held across `.await`, so a
//! slow render for one key never blocks callers of another.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::key::AnalysisKey;
use super::state::{Eviction, Lookup, Outcome, OutcomeRx, State};
use super::stats::{CacheStats, Counters};
use crate::{AppConfig, Error, SeoReport};

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Served from a live entry.
    Cache,
    /// This caller started the computation.
    Computed,
    /// This caller joined a computation another caller started.
    Coalesced,
}

impl Origin {
    pub fn is_cached(self) -> bool {
        self == Origin::Cache
    }
}

/// A value returned by [`ResultCache::resolve`].
#[derive(Debug)]
pub struct Resolved<V> {
    pub value: Arc<V>,
    pub origin: Origin,
}

struct Shared<V> {
    state: Mutex<State<V>>,
    counters: Counters,
    ttl: Duration,
    capacity: usize,
}

impl<V> Shared<V> {
    fn lock(&self) -> MutexGuard<'_, State<V>> {
        // The state stays consistent even if a holder panicked: every
        // mutation completes before the guard is released.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Retire flight `id` and store its value on success.
    fn settle(&self, key: &AnalysisKey, id: u64, outcome: &Outcome<V>) {
        let now = Instant::now();
        let mut state = self.lock();

        if !state.finish_flight(key, id) {
            tracing::debug!(%key, "computation finished after invalidation; result not cached");
            return;
        }

        match outcome {
            Ok(value) => {
                let evicted = state.insert(key.clone(), Arc::clone(value), now, self.ttl, self.capacity);
                self.counters.inserted();
                for (victim, reason) in evicted {
                    self.counters.evicted();
                    if reason == Eviction::Expired {
                        self.counters.expired(1);
                    }
                    tracing::debug!(key = %victim, ?reason, "evicted cache entry");
                }
            }
            Err(err) => tracing::debug!(%key, error = %err, "computation failed; nothing cached"),
        }
    }

    fn sweep_expired(&self) -> usize {
        let removed = self.lock().remove_expired(Instant::now());
        self.counters.expired(removed);
        removed
    }
}

/// Retires an in-flight marker even if the computation task never finishes
/// normally (panic, runtime shutdown).
struct FlightGuard<V> {
    shared: Arc<Shared<V>>,
    key: AnalysisKey,
    id: u64,
    tx: watch::Sender<Option<Outcome<V>>>,
    settled: bool,
}

impl<V> FlightGuard<V> {
    fn complete(mut self, outcome: Outcome<V>) {
        self.shared.settle(&self.key, self.id, &outcome);
        self.settled = true;
        self.tx.send_replace(Some(outcome));
    }
}

impl<V> Drop for FlightGuard<V> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::error!(key = %self.key, "computation ended without an outcome; releasing its waiters");
            self.shared.lock().finish_flight(&self.key, self.id);
        }
    }
}

enum Claim<V> {
    Hit(Arc<V>),
    Wait(OutcomeRx<V>),
    Lead { id: u64, tx: watch::Sender<Option<Outcome<V>>>, rx: OutcomeRx<V> },
}

/// In-memory TTL cache of analysis results keyed by [`AnalysisKey`].
///
/// Cloning is cheap and clones share the same store.
pub struct ResultCache<V = SeoReport> {
    shared: Arc<Shared<V>>,
}

impl<V> Clone for ResultCache<V> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<V> ResultCache<V>
where
    V: Send + Sync + 'static,
{
    /// Create a cache holding at most `capacity` entries, each live for `ttl`.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let shared = Shared {
            state: Mutex::new(State::default()),
            counters: Counters::default(),
            ttl,
            capacity: capacity.max(1),
        };
        Self { shared: Arc::new(shared) }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.ttl(), config.capacity)
    }

    pub fn ttl(&self) -> Duration {
        self.shared.ttl
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Return the cached value for `key`, computing it at most once across
    /// all concurrent callers.
    ///
    /// On failure nothing is cached and every caller waiting on this
    /// computation receives the same error. Failures are never retried here.
    pub async fn get_or_compute<F, Fut>(&self, key: AnalysisKey, compute: F) -> Result<Arc<V>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, Error>> + Send + 'static,
    {
        self.resolve(key, compute).await.map(|resolved| resolved.value)
    }

    /// Like [`get_or_compute`](Self::get_or_compute), also reporting whether the
    /// value came from the cache.
    ///
    /// The computation runs in its own task: dropping this future stops the
    /// wait but not the computation, which still populates the cache.
    pub async fn resolve<F, Fut>(&self, key: AnalysisKey, compute: F) -> Result<Resolved<V>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, Error>> + Send + 'static,
    {
        let (origin, rx) = match self.claim(&key) {
            Claim::Hit(value) => return Ok(Resolved { value, origin: Origin::Cache }),
            Claim::Wait(rx) => (Origin::Coalesced, rx),
            Claim::Lead { id, tx, rx } => {
                self.spawn_flight(key, id, tx, compute());
                (Origin::Computed, rx)
            }
        };

        let value = wait_for_outcome(rx).await?;
        Ok(Resolved { value, origin })
    }

    /// Decide this caller's role under the lock.
    fn claim(&self, key: &AnalysisKey) -> Claim<V> {
        let mut state = self.shared.lock();

        match state.lookup(key, Instant::now()) {
            Lookup::Hit(value) => {
                self.shared.counters.hit();
                tracing::debug!(%key, "cache hit");
                return Claim::Hit(value);
            }
            Lookup::Expired => {
                self.shared.counters.expired(1);
                tracing::debug!(%key, "cache entry expired");
            }
            Lookup::Missing => {}
        }

        if let Some(flight) = state.in_flight(key) {
            self.shared.counters.coalesced();
            tracing::debug!(%key, flight = flight.id, "joining in-flight computation");
            return Claim::Wait(flight.rx.clone());
        }

        self.shared.counters.miss();
        let (tx, rx) = watch::channel(None);
        let id = state.begin_flight(key.clone(), rx.clone());
        tracing::debug!(%key, flight = id, "cache miss; starting computation");
        Claim::Lead { id, tx, rx }
    }

    fn spawn_flight<Fut>(&self, key: AnalysisKey, id: u64, tx: watch::Sender<Option<Outcome<V>>>, fut: Fut)
    where
        Fut: Future<Output = Result<V, Error>> + Send + 'static,
    {
        let guard = FlightGuard { shared: Arc::clone(&self.shared), key, id, tx, settled: false };
        tokio::spawn(async move {
            let outcome = fut.await.map(Arc::new);
            guard.complete(outcome);
        });
    }

    /// Return a live entry without computing anything.
    pub fn get(&self, key: &AnalysisKey) -> Option<Arc<V>> {
        let mut state = self.shared.lock();
        match state.lookup(key, Instant::now()) {
            Lookup::Hit(value) => {
                self.shared.counters.hit();
                Some(value)
            }
            Lookup::Expired => {
                self.shared.counters.expired(1);
                None
            }
            Lookup::Missing => None,
        }
    }

    /// Drop the entry and in-flight marker for `key`.
    ///
    /// A computation already running still answers its current waiters but
    /// its result is not stored.
    pub fn invalidate(&self, key: &AnalysisKey) -> bool {
        let removed = self.shared.lock().remove(key);
        if removed {
            tracing::debug!(%key, "invalidated cache entry");
        }
        removed
    }

    /// Drop every entry and in-flight marker. Returns the number of entries removed.
    pub fn clear(&self) -> usize {
        let removed = self.shared.lock().clear();
        tracing::info!(removed, "cache cleared");
        removed
    }

    /// Number of live (non-expired) entries.
    pub fn size(&self) -> usize {
        self.shared.lock().live_len(Instant::now())
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.shared.lock();
        self.shared.counters.snapshot(state.len(), state.in_flight_len())
    }

    /// Remove all expired entries now. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.shared.sweep_expired()
    }

    /// Sweep expired entries every `every` until the cache is dropped.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let shared = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                let removed = shared.sweep_expired();
                if removed > 0 {
                    tracing::debug!(removed, "swept expired cache entries");
                }
            }
        })
    }
}

async fn wait_for_outcome<V>(mut rx: OutcomeRx<V>) -> Result<Arc<V>, Error> {
    match rx.wait_for(Option::is_some).await {
        Ok(outcome) => match &*outcome {
            Some(outcome) => outcome.clone(),
            None => {
                tracing::error!("in-flight computation woke a waiter without an outcome");
                Err(Error::CacheConsistency("woken without an outcome".into()))
            }
        },
        Err(_) => {
            tracing::error!("in-flight computation dropped its channel without an outcome");
            Err(Error::CacheConsistency("computation ended without an outcome".into()))
        }
    }
}
