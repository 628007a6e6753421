// tests/common/mod.rs
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use blog_feed_engine::feed::source::{FeedSource, RankingSource};
use blog_feed_engine::{DetailRecord, FeedFilter, SummaryPage, SummaryRecord};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub fn summary(id: &str) -> SummaryRecord {
    SummaryRecord {
        id: id.to_string(),
        title: format!("Post {id}"),
        ..Default::default()
    }
}

pub fn detail(id: &str, views: u64) -> DetailRecord {
    DetailRecord {
        id: id.to_string(),
        title: format!("Post {id}"),
        views,
        ..Default::default()
    }
}

pub fn ids(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

pub fn list_ids(list: &[SummaryRecord]) -> Vec<String> {
    list.iter().map(|s| s.id.clone()).collect()
}

/// In-memory blog API. Pages are keyed by (query, page index).
#[derive(Default)]
pub struct ScriptedSource {
    pages: Mutex<HashMap<(String, u32), Result<SummaryPage, String>>>,
    details: Mutex<HashMap<String, DetailRecord>>,
    failing_details: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    detail_gate: Mutex<Option<Arc<Semaphore>>>,
    page_calls: AtomicUsize,
    detail_calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn page(&self, query: &str, page: u32, items: &[&str], is_last: bool) {
        let items = items.iter().map(|id| summary(id)).collect::<Vec<_>>();
        let total = items.len() as u64;
        self.pages.lock().unwrap().insert(
            (query.to_string(), page),
            Ok(SummaryPage {
                items,
                is_last_page: is_last,
                total_count: total,
            }),
        );
    }

    pub fn fail_page(&self, query: &str, page: u32) {
        self.pages
            .lock()
            .unwrap()
            .insert((query.to_string(), page), Err("503 Service Unavailable".into()));
    }

    pub fn detail(&self, id: &str, views: u64) {
        self.details
            .lock()
            .unwrap()
            .insert(id.to_string(), detail(id, views));
    }

    pub fn fail_detail(&self, id: &str) {
        self.failing_details.lock().unwrap().insert(id.to_string());
    }

    /// Page requests for `query` block until permits are added to the returned gate.
    pub fn hold(&self, query: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .unwrap()
            .insert(query.to_string(), gate.clone());
        gate
    }

    /// Detail requests block until permits are added to the returned gate.
    pub fn hold_details(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.detail_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self, id: &str) -> usize {
        self.detail_calls
            .lock()
            .unwrap()
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    /// Yield until at least `n` page requests have been issued.
    pub async fn wait_for_page_calls(&self, n: usize) {
        for _ in 0..1_000 {
            if self.page_calls() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {n} page calls, saw {}", self.page_calls());
    }

    /// Yield until at least `n` detail requests for `id` have been issued.
    pub async fn wait_for_detail_calls(&self, id: &str, n: usize) {
        for _ in 0..1_000 {
            if self.detail_calls(id) >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {n} detail calls for {id}, saw {}", self.detail_calls(id));
    }
}

#[async_trait]
impl FeedSource for ScriptedSource {
    async fn fetch_summary_page(
        &self,
        filter: &FeedFilter,
        page: u32,
        _page_size: u32,
    ) -> Result<SummaryPage> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().get(&filter.query).cloned();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.map_err(|e| anyhow!(e))?;
        }
        let scripted = self
            .pages
            .lock()
            .unwrap()
            .get(&(filter.query.clone(), page))
            .cloned();
        match scripted {
            Some(Ok(p)) => Ok(p),
            Some(Err(msg)) => Err(anyhow!(msg)),
            None => Err(anyhow!("no page {page} scripted for {:?}", filter.query)),
        }
    }

    async fn fetch_detail(&self, id: &str) -> Result<Option<DetailRecord>> {
        *self
            .detail_calls
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default() += 1;
        let gate = self.detail_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.map_err(|e| anyhow!(e))?;
        }
        tokio::task::yield_now().await;
        if self.failing_details.lock().unwrap().contains(id) {
            return Err(anyhow!("detail {id}: connection reset"));
        }
        Ok(self.details.lock().unwrap().get(id).cloned())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Ranking source returning a fixed list, or failing.
pub struct FixedRanking {
    pub result: Result<Vec<DetailRecord>, String>,
    pub calls: AtomicUsize,
}

impl FixedRanking {
    pub fn ok(list: Vec<DetailRecord>) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(list),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            result: Err("ranking backend down".into()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl RankingSource for FixedRanking {
    async fn fetch_top_ranked(&self, _n: usize) -> Result<Vec<DetailRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(|e| anyhow!(e))
    }
}

/// Ranking source whose first call blocks until the gate opens.
pub struct GatedRanking {
    pub gate: Arc<Semaphore>,
    pub calls: AtomicUsize,
    list: Vec<DetailRecord>,
}

impl GatedRanking {
    pub fn new(list: Vec<DetailRecord>) -> Arc<Self> {
        Arc::new(Self {
            gate: Arc::new(Semaphore::new(0)),
            calls: AtomicUsize::new(0),
            list,
        })
    }

    pub async fn wait_for_calls(&self, n: usize) {
        for _ in 0..1_000 {
            if self.calls.load(Ordering::SeqCst) >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {n} ranking calls");
    }
}

#[async_trait]
impl RankingSource for GatedRanking {
    async fn fetch_top_ranked(&self, _n: usize) -> Result<Vec<DetailRecord>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            let _permit = self.gate.acquire().await.map_err(|e| anyhow!(e))?;
        }
        Ok(self.list.clone())
    }
}
