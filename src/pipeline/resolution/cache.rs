//! Process-wide lookup cache with single-flight semantics.
//!
//! Each key maps to one shared lookup future. The first caller for a missing
//! or expired key spawns the provider call; every concurrent caller for the
//! same key awaits that same future instead of issuing its own call.
//!
//! Key properties:
//! - Check-then-insert happens under one lock, so two callers can never both
//!   miss on the same key
//! - Lookups run on spawned tasks: a caller that goes away does not cancel
//!   the call, and its result still lands in the cache
//! - Found and not-found answers are cached with per-type TTLs
//! - Failures are shared with callers already waiting, then evicted
//! - A panicking lookup becomes a failure only where panics unwind; the
//!   release profile sets `panic = "abort"`, so there it ends the process

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use serde::Serialize;

use super::LookupKey;
use crate::models::{CacheStatus, EntityType, ResolvedPayload};

/// Result of one provider call, as stored in the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(ResolvedPayload),
    NotFound,
    /// Provider error, timeout, or a payload of the wrong type.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedLookup {
    pub outcome: LookupOutcome,
    pub latency_ms: u64,
}

/// Time-to-live per outcome. Places change rarely; prices and
/// availability go stale quickly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub place: Duration,
    pub lodging: Duration,
    pub transport: Duration,
    pub not_found: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            place: Duration::from_secs(24 * 60 * 60),
            lodging: Duration::from_secs(15 * 60),
            transport: Duration::from_secs(10 * 60),
            not_found: Duration::from_secs(5 * 60),
        }
    }
}

impl CacheTtls {
    pub fn for_type(&self, entity_type: EntityType) -> Duration {
        match entity_type {
            EntityType::Place => self.place,
            EntityType::Lodging => self.lodging,
            EntityType::Transport => self.transport,
        }
    }

    /// `None` means the outcome must not be served from cache.
    fn for_outcome(&self, outcome: &LookupOutcome) -> Option<Duration> {
        match outcome {
            LookupOutcome::Found(payload) => Some(self.for_type(payload.entity_type())),
            LookupOutcome::NotFound => Some(self.not_found),
            LookupOutcome::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub shared: u64,
    pub entries: usize,
}

type SharedLookup = Shared<BoxFuture<'static, CompletedLookup>>;

struct CacheEntry {
    lookup: SharedLookup,
    inserted_at: Instant,
}

impl CacheEntry {
    /// In-flight entries are always live. Completed ones live until their
    /// outcome's TTL runs out.
    fn is_live(&self, ttls: &CacheTtls, now: Instant) -> bool {
        match self.lookup.peek() {
            None => true,
            Some(done) => match ttls.for_outcome(&done.outcome) {
                Some(ttl) => now.saturating_duration_since(self.inserted_at) < ttl,
                None => false,
            },
        }
    }
}

pub struct LookupCache {
    entries: Mutex<HashMap<LookupKey, CacheEntry>>,
    ttls: CacheTtls,
    hits: AtomicU64,
    misses: AtomicU64,
    shared: AtomicU64,
}

impl Default for LookupCache {
    fn default() -> Self {
        Self::new(CacheTtls::default())
    }
}

impl LookupCache {
    pub fn new(ttls: CacheTtls) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttls,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            shared: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<LookupKey, CacheEntry>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the cached answer for `key`, join an in-flight lookup for it,
    /// or start `lookup` on a new task.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn get_or_lookup<F, Fut>(
        &self,
        key: LookupKey,
        lookup: F,
    ) -> (CompletedLookup, CacheStatus)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = LookupOutcome> + Send + 'static,
    {
        let (shared, status) = {
            let mut entries = self.lock();
            let now = Instant::now();
            let existing = entries
                .get(&key)
                .filter(|entry| entry.is_live(&self.ttls, now))
                .map(|entry| {
                    let status = if entry.lookup.peek().is_some() {
                        CacheStatus::Hit
                    } else {
                        CacheStatus::Shared
                    };
                    (entry.lookup.clone(), status)
                });

            match existing {
                Some(found) => found,
                None => {
                    let shared = start_lookup(lookup());
                    entries.insert(
                        key.clone(),
                        CacheEntry {
                            lookup: shared.clone(),
                            inserted_at: now,
                        },
                    );
                    (shared, CacheStatus::Miss)
                }
            }
        };

        match status {
            CacheStatus::Hit => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%key, "Lookup cache hit");
            }
            CacheStatus::Shared => {
                self.shared.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%key, "Joined in-flight lookup");
            }
            CacheStatus::Miss => {
                self.misses.fetch_add(1, Ordering::Relaxed);
            }
        }

        let done = shared.clone().await;
        if matches!(done.outcome, LookupOutcome::Failed(_)) {
            self.evict_if_current(&key, &shared);
        }
        (done, status)
    }

    /// Drop a failed entry unless a newer lookup already replaced it.
    fn evict_if_current(&self, key: &LookupKey, lookup: &SharedLookup) {
        let mut entries = self.lock();
        if entries
            .get(key)
            .is_some_and(|entry| Shared::ptr_eq(&entry.lookup, lookup))
        {
            entries.remove(key);
        }
    }

    /// Remove every completed entry whose TTL has run out (and any failure).
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(&self.ttls, now));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(removed, "Purged expired lookup cache entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            shared: self.shared.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

/// Spawn the lookup so it runs to completion even if every waiter is dropped.
/// The spawned task drives the shared future, so `peek()` sees the result as
/// soon as it exists.
fn start_lookup<Fut>(lookup: Fut) -> SharedLookup
where
    Fut: Future<Output = LookupOutcome> + Send + 'static,
{
    let started = Instant::now();
    let shared = async move {
        let outcome = AssertUnwindSafe(lookup)
            .catch_unwind()
            .await
            .unwrap_or_else(|_| LookupOutcome::Failed("lookup panicked".into()));
        CompletedLookup {
            outcome,
            latency_ms: started.elapsed().as_millis() as u64,
        }
    }
    .boxed()
    .shared();

    tokio::spawn(shared.clone());
    shared
}
