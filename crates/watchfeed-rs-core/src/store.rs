//! Append-only, deduplicated accumulation of fetched history pages.

use log::{debug, warn};
use std::collections::HashSet;
use watchfeed_rs_protocol::{PageResponse, RequestId, SourceGroup, SourceId};

/// Outcome of merging a page into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The page was merged into the accumulated set.
    Merged,
    /// The page belonged to an older generation and was discarded.
    Stale,
}

/// The accumulated set for the current sort order, plus page bookkeeping.
///
/// Mutated only from fetch-completion and reset paths; every other component
/// reads through shared references.
#[derive(Debug)]
pub struct RecordStore {
    /// Source groups in server arrival order.
    groups: Vec<SourceGroup>,
    /// Source ids already present, for idempotent merges.
    seen_sources: HashSet<SourceId>,
    /// Request ids already present across all groups.
    seen_requests: HashSet<RequestId>,
    /// Last merged page number; 0 before the first page lands.
    cursor: u32,
    /// Total page count, set once per generation from page metadata.
    total_pages: Option<u32>,
    /// Total distinct sources, taken from the first accepted page.
    total_sources: Option<u64>,
    /// Total distinct requests, taken from the first accepted page.
    total_records: Option<u64>,
    /// Fetch epoch; bumped on every reset.
    generation: u64,
}

impl RecordStore {
    /// Create an empty store at generation zero.
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            seen_sources: HashSet::new(),
            seen_requests: HashSet::new(),
            cursor: 0,
            total_pages: None,
            total_sources: None,
            total_records: None,
            generation: 0,
        }
    }

    /// Current fetch generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Last merged page number (0 before the first page).
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Total page count, once known for this generation.
    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    /// Total distinct sources reported by the server.
    pub fn total_sources(&self) -> Option<u64> {
        self.total_sources
    }

    /// Total distinct requests reported by the server.
    pub fn total_records(&self) -> Option<u64> {
        self.total_records
    }

    /// Whether the server has pages beyond the cursor.
    ///
    /// Optimistically true until the first page reveals the total.
    pub fn has_more(&self) -> bool {
        match self.total_pages {
            Some(total) => self.cursor < total,
            None => true,
        }
    }

    /// Accumulated source groups in arrival order.
    pub fn groups(&self) -> &[SourceGroup] {
        &self.groups
    }

    /// Number of accumulated requests across all groups.
    pub fn request_count(&self) -> usize {
        self.seen_requests.len()
    }

    /// Merge a fetched page, skipping duplicates.
    ///
    /// `generation` is the value captured when the fetch was dispatched; a
    /// mismatch means the store was reset while the request was in flight and
    /// the page must not be merged.
    pub fn append_page(&mut self, page: PageResponse, generation: u64) -> AppendOutcome {
        if generation != self.generation {
            debug!(
                "discarding stale page (page={}, fetched_generation={}, current_generation={})",
                page.page, generation, self.generation
            );
            return AppendOutcome::Stale;
        }

        for mut group in page.data {
            if !self.seen_sources.insert(group.source_id.clone()) {
                warn!("skipping duplicate source (source_id={})", group.source_id);
                continue;
            }
            group
                .requests
                .retain(|request| self.seen_requests.insert(request.request_id.clone()));
            self.groups.push(group);
        }

        self.cursor = page.page;
        if self.total_pages.is_none() {
            self.total_pages = Some(page.total_pages);
            self.total_sources = Some(page.total_sources);
            self.total_records = Some(page.total_records);
        }
        debug!(
            "merged page (page={}, sources={}, requests={}, has_more={})",
            self.cursor,
            self.groups.len(),
            self.seen_requests.len(),
            self.has_more()
        );
        AppendOutcome::Merged
    }

    /// Clear the accumulated set and start a new generation.
    ///
    /// Returns the new generation; responses tagged with older generations
    /// are discarded on arrival.
    pub fn reset(&mut self) -> u64 {
        self.groups.clear();
        self.seen_sources.clear();
        self.seen_requests.clear();
        self.cursor = 0;
        self.total_pages = None;
        self.total_sources = None;
        self.total_records = None;
        self.generation += 1;
        debug!("store reset (generation={})", self.generation);
        self.generation
    }

    /// Set the expand/collapse flag on a source group.
    ///
    /// The only mutation allowed on accumulated data after a merge.
    pub fn set_expanded(&mut self, source_id: &str, expanded: bool) -> bool {
        match self
            .groups
            .iter_mut()
            .find(|group| group.source_id == source_id)
        {
            Some(group) => {
                group.expanded = expanded;
                true
            }
            None => false,
        }
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}
