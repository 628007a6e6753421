// src/feed/summary_store.rs
//! Ordered, deduplicated list of summaries for the current epoch.
//! First-seen wins: a later record with a known id is discarded, never merged.

use std::collections::HashSet;

use crate::feed::types::{EntityId, SummaryRecord};

/// What one `append_page` call did with its input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub added: usize,
    pub duplicates: usize,
    pub malformed: usize,
}

#[derive(Debug, Default)]
pub struct SummaryStore {
    items: Vec<SummaryRecord>,
    ids: HashSet<EntityId>,
}

impl SummaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.items.clear();
        self.ids.clear();
    }

    /// A first page replaces the list; later pages append only unseen ids,
    /// keeping their arrival order.
    pub fn append_page(&mut self, items: Vec<SummaryRecord>, is_first_page: bool) -> MergeStats {
        if is_first_page {
            self.reset();
        }

        let mut stats = MergeStats::default();
        self.items.reserve(items.len());
        for item in items {
            if item.id.trim().is_empty() {
                stats.malformed += 1;
                continue;
            }
            if !self.ids.insert(item.id.clone()) {
                stats.duplicates += 1;
                continue;
            }
            self.items.push(item);
            stats.added += 1;
        }
        stats
    }

    pub fn all(&self) -> &[SummaryRecord] {
        &self.items
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.items.iter().map(|s| s.id.clone()).collect()
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
