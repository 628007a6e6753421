// src/feed/detail_cache.rs
//! Id → detail cache with reserve-then-fetch backfill.
//!
//! Every id handed to `backfill` is inserted into the fetched set under one
//! lock before the first network call, so overlapping backfills never
//! dispatch the same id twice. Ids stay reserved after a failed fetch; only
//! `clear` (engine reset) makes them eligible again. `clear` also bumps the
//! reservation generation, and a fetch started under an older generation
//! never writes into the cache.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use futures::future::join_all;
use indexmap::IndexMap;
use metrics::counter;
use serde::Serialize;
use tracing::{debug, warn};

use crate::feed::source::FeedSource;
use crate::feed::types::{DetailRecord, EntityId};

/// Outcome of a single `backfill` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub requested: usize,
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
struct Reservations {
    generation: u64,
    ids: HashSet<EntityId>,
}

#[derive(Debug, Default)]
pub struct DetailCache {
    // Lock order: fetched, then entries.
    fetched: Mutex<Reservations>,
    entries: RwLock<IndexMap<EntityId, DetailRecord>>,
    in_flight: AtomicUsize,
}

impl DetailCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically mark unseen ids as fetched and return them.
    /// Empty ids and repeats within `ids` are skipped.
    pub fn reserve(&self, ids: &[EntityId]) -> Vec<EntityId> {
        self.reserve_tagged(ids).1
    }

    fn reserve_tagged(&self, ids: &[EntityId]) -> (u64, Vec<EntityId>) {
        let mut fetched = self.fetched.lock().expect("fetched set mutex poisoned");
        let generation = fetched.generation;
        let missing = ids
            .iter()
            .filter(|id| !id.trim().is_empty())
            .filter(|id| fetched.ids.insert((*id).clone()))
            .cloned()
            .collect();
        (generation, missing)
    }

    /// Fetch details for every id not yet reserved. Resolves once all
    /// dispatched fetches have settled; failures only show up in the report.
    pub async fn backfill(&self, source: &dyn FeedSource, ids: &[EntityId]) -> BackfillReport {
        let (generation, missing) = self.reserve_tagged(ids);
        let mut report = BackfillReport {
            requested: ids.len(),
            dispatched: missing.len(),
            ..Default::default()
        };
        if missing.is_empty() {
            return report;
        }

        let _busy = InFlight::enter(&self.in_flight);
        counter!("feed_detail_requests_total").increment(missing.len() as u64);

        let results = join_all(missing.iter().map(|id| self.hydrate(source, generation, id))).await;
        for ok in results {
            if ok {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
        }

        debug!(
            target: "feed::detail",
            dispatched = report.dispatched,
            succeeded = report.succeeded,
            failed = report.failed,
            "backfill settled"
        );
        report
    }

    async fn hydrate(&self, source: &dyn FeedSource, generation: u64, id: &str) -> bool {
        match source.fetch_detail(id).await {
            Ok(Some(mut detail)) => {
                if detail.id.is_empty() {
                    detail.id = id.to_string();
                }
                if detail.id != id {
                    warn!(target: "feed::detail", id, got = %detail.id, "detail id mismatch");
                    counter!("feed_detail_errors_total").increment(1);
                    return false;
                }
                if !self.insert(generation, detail) {
                    debug!(target: "feed::detail", id, "detail from before reset dropped");
                    return false;
                }
                true
            }
            Ok(None) => {
                debug!(target: "feed::detail", id, "detail not found");
                counter!("feed_detail_errors_total").increment(1);
                false
            }
            Err(e) => {
                warn!(target: "feed::detail", error = ?e, id, source = source.name(), "detail fetch failed");
                counter!("feed_detail_errors_total").increment(1);
                false
            }
        }
    }

    // Insert-if-absent; an existing entry is never overwritten. Returns
    // `false` when the cache was cleared after the fetch was reserved.
    fn insert(&self, generation: u64, detail: DetailRecord) -> bool {
        let fetched = self.fetched.lock().expect("fetched set mutex poisoned");
        if fetched.generation != generation {
            return false;
        }
        let mut entries = self.entries.write().expect("detail cache lock poisoned");
        entries.entry(detail.id.clone()).or_insert(detail);
        true
    }

    pub fn get(&self, id: &str) -> Option<DetailRecord> {
        let entries = self.entries.read().expect("detail cache lock poisoned");
        entries.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        let entries = self.entries.read().expect("detail cache lock poisoned");
        entries.contains_key(id)
    }

    pub fn is_reserved(&self, id: &str) -> bool {
        let fetched = self.fetched.lock().expect("fetched set mutex poisoned");
        fetched.ids.contains(id)
    }

    /// All cached details in insertion order.
    pub fn snapshot(&self) -> Vec<DetailRecord> {
        let entries = self.entries.read().expect("detail cache lock poisoned");
        entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().expect("detail cache lock poisoned");
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_backfilling(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Drop all details and reservations and start a new generation.
    pub fn clear(&self) {
        let mut fetched = self.fetched.lock().expect("fetched set mutex poisoned");
        fetched.generation = fetched.generation.wrapping_add(1);
        fetched.ids.clear();
        self.entries
            .write()
            .expect("detail cache lock poisoned")
            .clear();
    }
}

/// Counts a running operation; decremented on drop, whichever way the call ends.
pub(crate) struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    pub(crate) fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
