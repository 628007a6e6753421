// src/feed/filter.rs
//! Filter/epoch/page bookkeeping. Pure state, no I/O: the engine asks for a
//! `PageTicket`, performs the fetch, then reports back with `commit` or `fail`.

use crate::error::FeedError;
use crate::feed::types::{Epoch, FeedFilter};

/// Identifies one issued page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTicket {
    pub epoch: Epoch,
    pub page: u32,
}

impl PageTicket {
    pub fn is_first_page(&self) -> bool {
        self.page == 0
    }
}

#[derive(Debug, Default)]
pub struct FilterEpochController {
    filter: FeedFilter,
    epoch: Epoch,
    /// Last page applied in this epoch.
    committed: Option<u32>,
    has_more: bool,
    total_count: u64,
    pending: Option<PageTicket>,
    last_error: Option<String>,
}

impl FilterEpochController {
    pub fn new() -> Self {
        Self {
            has_more: true,
            ..Default::default()
        }
    }

    /// Start a new epoch unless `filter` equals the active one by value.
    pub fn set_filter(&mut self, filter: FeedFilter) -> Option<PageTicket> {
        if filter == self.filter && self.epoch != Epoch::ZERO {
            return None;
        }
        self.filter = filter;
        Some(self.begin_epoch())
    }

    /// New epoch with the same filter; returns the page-0 ticket.
    pub fn restart(&mut self) -> PageTicket {
        self.begin_epoch()
    }

    fn begin_epoch(&mut self) -> PageTicket {
        self.epoch = self.epoch.next();
        self.committed = None;
        self.has_more = true;
        self.total_count = 0;
        self.last_error = None;
        let ticket = PageTicket {
            epoch: self.epoch,
            page: 0,
        };
        self.pending = Some(ticket);
        ticket
    }

    /// Ticket for the first uncommitted page. After a failed fetch this is
    /// the same page again.
    pub fn next_page(&mut self) -> Result<PageTicket, FeedError> {
        if let Some(p) = self.pending {
            return Err(FeedError::PageInFlight { page: p.page });
        }
        if !self.has_more {
            return Err(FeedError::NoMorePages);
        }
        let ticket = PageTicket {
            epoch: self.epoch,
            page: self.committed.map_or(0, |p| p + 1),
        };
        self.pending = Some(ticket);
        Ok(ticket)
    }

    pub fn is_current(&self, ticket: PageTicket) -> bool {
        ticket.epoch == self.epoch
    }

    /// Record a successful page. Returns `false` for a stale ticket.
    pub fn commit(&mut self, ticket: PageTicket, is_last_page: bool, total_count: u64) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.pending = None;
        self.committed = Some(ticket.page);
        self.has_more = !is_last_page;
        self.total_count = total_count;
        self.last_error = None;
        true
    }

    /// Record a failed page. The page index does not advance.
    pub fn fail(&mut self, ticket: PageTicket, error: &anyhow::Error) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.pending = None;
        self.last_error = Some(format!("{error:#}"));
        true
    }

    pub fn filter(&self) -> &FeedFilter {
        &self.filter
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn page(&self) -> Option<u32> {
        self.committed
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }
}
