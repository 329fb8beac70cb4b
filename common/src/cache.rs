// Rate-limit-safe fetch cache shared by all jobs
//
// Guarantees at most one in-flight fetch per (source, range) key and at most
// one real fetch per key within the configured minimum interval, regardless
// of how many jobs share the key.

use crate::config::CacheConfig;
use crate::errors::FetchError;
use crate::models::Grid;
use crate::source::ValueSource;
use crate::telemetry;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

type FetchKey = (String, String);

/// A cached snapshot with its fetch time
struct CacheEntry {
    values: Grid,
    fetched_at: Instant,
}

struct CacheState {
    entries: HashMap<FetchKey, CacheEntry>,
    last_fetch: HashMap<FetchKey, Instant>,
    in_flight: HashSet<FetchKey>,
}

/// What a single cache lookup decided to do
enum FetchPlan {
    Cached(Grid),
    Skip(&'static str),
    Fetch,
}

/// Removes the in-flight marker for a key when dropped, so neither a failed
/// nor a cancelled fetch can wedge the key.
struct InFlightGuard<'a> {
    state: &'a Mutex<CacheState>,
    key: FetchKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.in_flight.remove(&self.key);
    }
}

/// FetchCache throttles and de-duplicates reads against the value source
pub struct FetchCache {
    source: Arc<dyn ValueSource>,
    ttl: Duration,
    min_fetch_interval: Duration,
    fetch_timeout: Duration,
    // Held only for map lookups and updates, never across an await.
    state: Mutex<CacheState>,
}

impl FetchCache {
    pub fn new(source: Arc<dyn ValueSource>, config: &CacheConfig, fetch_timeout: Duration) -> Self {
        Self {
            source,
            ttl: Duration::from_secs(config.ttl_seconds),
            min_fetch_interval: Duration::from_secs(config.min_fetch_interval_seconds),
            fetch_timeout,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                last_fetch: HashMap::new(),
                in_flight: HashSet::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch the values for a (source, range) key, subject to throttling.
    ///
    /// Returns `Ok(Some(grid))` from cache or from a real fetch, and
    /// `Ok(None)` when this cycle is skipped because the key is already
    /// being fetched or was fetched too recently. A skipped cycle is not an
    /// error; callers simply try again on their next tick.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(&self, source_id: &str, range: &str) -> Result<Option<Grid>, FetchError> {
        let key = (source_id.to_string(), range.to_string());

        let plan = {
            let mut state = self.state();
            if state.in_flight.contains(&key) {
                FetchPlan::Skip("fetch already in flight")
            } else {
                let fresh = state
                    .entries
                    .get(&key)
                    .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
                    .map(|entry| entry.values.clone());
                match fresh {
                    Some(values) => FetchPlan::Cached(values),
                    None => {
                        let throttled = state
                            .last_fetch
                            .get(&key)
                            .map(|last| last.elapsed() < self.min_fetch_interval)
                            .unwrap_or(false);
                        if throttled {
                            FetchPlan::Skip("minimum fetch interval not yet elapsed")
                        } else {
                            state.in_flight.insert(key.clone());
                            FetchPlan::Fetch
                        }
                    }
                }
            }
        };

        match plan {
            FetchPlan::Cached(values) => {
                telemetry::record_cache_hit();
                Ok(Some(values))
            }
            FetchPlan::Skip(reason) => {
                telemetry::record_fetch_skipped();
                tracing::debug!(source_id = %source_id, range = %range, reason, "Skipping fetch");
                Ok(None)
            }
            FetchPlan::Fetch => {
                let guard = InFlightGuard {
                    state: &self.state,
                    key: key.clone(),
                };
                let result = self
                    .source
                    .fetch(source_id, range, self.fetch_timeout)
                    .await;
                drop(guard);

                match result {
                    Ok(values) => {
                        let now = Instant::now();
                        let mut state = self.state();
                        state.entries.insert(
                            key.clone(),
                            CacheEntry {
                                values: values.clone(),
                                fetched_at: now,
                            },
                        );
                        // Advanced on success only: a failed fetch leaves the
                        // key free for an immediate retry.
                        state.last_fetch.insert(key, now);
                        drop(state);
                        telemetry::record_source_fetch();
                        Ok(Some(values))
                    }
                    Err(e) => {
                        telemetry::record_fetch_failure();
                        Err(e)
                    }
                }
            }
        }
    }
}
