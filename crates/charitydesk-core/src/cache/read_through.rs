use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared, TryFutureExt};
use tracing::{debug, info, warn};

use super::clock::Clock;
use crate::source::SourceError;

type FetchResult<T> = Result<Arc<T>, SourceError>;
type InFlight<T> = Shared<BoxFuture<'static, FetchResult<T>>>;

/// A snapshot of a fetched collection and the instant it was stored.
///
/// The data is shared and never mutated; a refresh replaces the whole
/// snapshot, so a holder of one `Arc` never sees a later fetch mixed in.
#[derive(Debug)]
pub struct CachedData<T> {
    pub data: Arc<T>,
    pub cached_at: DateTime<Utc>,
}

impl<T> Clone for CachedData<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            cached_at: self.cached_at,
        }
    }
}

impl<T> CachedData<T> {
    pub fn new(data: T, cached_at: DateTime<Utc>) -> Self {
        Self {
            data: Arc::new(data),
            cached_at,
        }
    }

    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.cached_at).num_minutes()
    }

    /// Fresh while `now - cached_at < ttl`. A zero TTL is never fresh.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        if ttl.is_zero() {
            return false;
        }
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        now - self.cached_at < ttl
    }

    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        let minutes = self.age_minutes(now);
        if minutes < 1 {
            // Includes clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

struct Slot<T> {
    entry: Option<CachedData<T>>,
    /// Set by `invalidate`; cleared when a fetch stores a new entry
    force_refresh: bool,
    in_flight: Option<(u64, InFlight<T>)>,
    next_generation: u64,
}

/// Single-slot read-through cache with a caller-supplied TTL.
///
/// Concurrent misses share one in-flight fetch, and every waiter receives
/// the same result. A failed fetch leaves the previous entry untouched and
/// still expired, so the next call retries.
pub struct ReadThroughCache<T> {
    name: &'static str,
    clock: Arc<dyn Clock>,
    slot: Mutex<Slot<T>>,
}

impl<T> ReadThroughCache<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(name: &'static str, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            clock,
            slot: Mutex::new(Slot {
                entry: None,
                force_refresh: false,
                in_flight: None,
                next_generation: 0,
            }),
        }
    }

    /// Return the cached snapshot if it is younger than `ttl`, otherwise run
    /// `fetch` (or join a fetch already in flight) and store its result.
    ///
    /// `fetch` is only invoked when this call starts a new fetch.
    pub async fn get_with<F, Fut>(&self, ttl: Duration, fetch: F) -> Result<Arc<T>, SourceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SourceError>> + Send + 'static,
    {
        let (generation, pending) = {
            let mut slot = self.lock();

            if !slot.force_refresh {
                if let Some(entry) = &slot.entry {
                    if entry.is_fresh_at(self.clock.now(), ttl) {
                        debug!(cache = self.name, "Cache hit");
                        return Ok(Arc::clone(&entry.data));
                    }
                }
            }

            let joined = slot
                .in_flight
                .as_ref()
                .map(|(generation, pending)| (*generation, pending.clone()));

            match joined {
                Some((generation, pending)) => {
                    debug!(cache = self.name, generation, "Joining in-flight fetch");
                    (generation, pending)
                }
                None => {
                    let generation = slot.next_generation;
                    slot.next_generation += 1;
                    debug!(cache = self.name, generation, "Cache miss, fetching");

                    let pending = fetch().map_ok(Arc::new).boxed().shared();
                    slot.in_flight = Some((generation, pending.clone()));
                    (generation, pending)
                }
            }
        };

        let result = pending.await;
        self.complete(generation, &result);
        result
    }

    /// Store the outcome of fetch `generation`. Only the first waiter to get
    /// here does anything; the rest find the slot already settled. A fetch
    /// detached by `invalidate` finds it settled too.
    fn complete(&self, generation: u64, result: &FetchResult<T>) {
        let mut slot = self.lock();
        let owns_slot = matches!(&slot.in_flight, Some((g, _)) if *g == generation);
        if !owns_slot {
            return;
        }
        slot.in_flight = None;

        match result {
            Ok(data) => {
                let cached_at = self.clock.now();
                slot.entry = Some(CachedData {
                    data: Arc::clone(data),
                    cached_at,
                });
                slot.force_refresh = false;
                info!(cache = self.name, generation, %cached_at, "Cache refreshed");
            }
            Err(e) => {
                warn!(cache = self.name, generation, error = %e, "Fetch failed, previous entry kept as expired");
            }
        }
    }

    /// Current entry, fresh or not, without fetching.
    pub fn peek(&self) -> Option<CachedData<T>> {
        self.lock().entry.clone()
    }

    /// Force the next `get_with` to fetch regardless of age.
    ///
    /// A fetch already in flight may predate the caller's write, so it is
    /// detached: its waiters still get its result, but it is not stored and
    /// later callers start a new fetch.
    pub fn invalidate(&self) {
        let mut slot = self.lock();
        slot.force_refresh = true;
        match slot.in_flight.take() {
            Some((generation, _)) => {
                debug!(cache = self.name, generation, "Cache invalidated, detached in-flight fetch")
            }
            None => debug!(cache = self.name, "Cache invalidated"),
        }
    }

    pub fn age_display(&self) -> Option<String> {
        self.peek()
            .map(|cached| cached.age_display(self.clock.now()))
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        // Slot writes are single assignments, so a poisoned slot is still whole
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}
