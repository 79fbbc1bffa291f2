//! Local filtering over the accumulated set, with client-side batching.
//!
//! Filtering never refetches: matches are recomputed from whatever is already
//! accumulated, and the visible slice grows in fixed batches out of that
//! locally computed match array.

use crate::projector::FlatItem;
use log::debug;
use watchfeed_rs_protocol::{FeedMode, MediaKind, SourceGroup};

/// Active filter inputs: free-text query plus a media-kind restriction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    /// Case-insensitive substring query; empty means no text filter.
    pub query: String,
    /// Media-kind restriction; `None` means all kinds.
    pub kind: Option<MediaKind>,
}

impl FilterState {
    /// Whether both filter axes are cleared.
    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.kind.is_none()
    }
}

/// A computed match array plus how many batches of it are visible.
#[derive(Debug)]
struct FilteredBatch<T> {
    matches: Vec<T>,
    batches: usize,
}

impl<T> FilteredBatch<T> {
    fn new(matches: Vec<T>) -> Self {
        Self { matches, batches: 1 }
    }

    fn visible(&self, batch_size: usize) -> &[T] {
        let end = (self.batches * batch_size).min(self.matches.len());
        &self.matches[..end]
    }

    fn has_more(&self, batch_size: usize) -> bool {
        self.batches * batch_size < self.matches.len()
    }

    fn grow(&mut self, batch_size: usize) -> bool {
        if self.has_more(batch_size) {
            self.batches += 1;
            true
        } else {
            false
        }
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn group_matches(group: &SourceGroup, query_lower: &str, kind: Option<MediaKind>) -> bool {
    let query_ok = query_lower.is_empty()
        || contains_ci(&group.source_title, query_lower)
        || group
            .requests
            .iter()
            .any(|request| contains_ci(&request.title, query_lower));
    let kind_ok = match kind {
        None => true,
        Some(kind) => {
            group.media_type == kind
                || group.requests.iter().any(|request| request.media_type == kind)
        }
    };
    query_ok && kind_ok
}

fn flat_matches(item: &FlatItem, query_lower: &str, kind: Option<MediaKind>) -> bool {
    let query_ok = query_lower.is_empty()
        || contains_ci(&item.request.title, query_lower)
        || contains_ci(&item.source_title, query_lower);
    let kind_ok = kind.is_none_or(|kind| item.request.media_type == kind);
    query_ok && kind_ok
}

/// Per-mode filtered subsets for the current filter inputs.
///
/// The two modes have structurally different matching semantics (flat items
/// match on their own or their source's title; groups match on the group title
/// or any child's title), so each mode keeps its own computed subset.
#[derive(Debug)]
pub struct FilterCoordinator {
    state: FilterState,
    batch_size: usize,
    grouped: Option<FilteredBatch<SourceGroup>>,
    flat: Option<FilteredBatch<FlatItem>>,
    server_match_count: Option<u64>,
}

impl FilterCoordinator {
    /// Create a coordinator with cleared filters.
    pub fn new(batch_size: usize) -> Self {
        Self {
            state: FilterState::default(),
            batch_size,
            grouped: None,
            flat: None,
            server_match_count: None,
        }
    }

    /// Current filter inputs.
    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// Whether any filter axis is active.
    pub fn is_active(&self) -> bool {
        !self.state.is_empty()
    }

    /// Replace the filter inputs, dropping all computed subsets.
    pub fn set_state(&mut self, state: FilterState) {
        debug!(
            "filter changed (query={:?}, kind={:?})",
            state.query, state.kind
        );
        self.state = state;
        self.invalidate_all();
    }

    /// Clear both filter axes.
    ///
    /// O(1): the unfiltered accumulated view is untouched, so the display
    /// reverts to it losslessly.
    pub fn clear(&mut self) {
        self.state = FilterState::default();
        self.invalidate_all();
    }

    /// Drop the computed subset for one mode.
    pub fn invalidate(&mut self, mode: FeedMode) {
        match mode {
            FeedMode::Grouped => self.grouped = None,
            FeedMode::Flat => self.flat = None,
        }
    }

    /// Drop both computed subsets and the server match count.
    pub fn invalidate_all(&mut self) {
        self.grouped = None;
        self.flat = None;
        self.server_match_count = None;
    }

    /// Recompute the grouped subset from the accumulated groups.
    pub fn recompute_grouped(&mut self, groups: &[SourceGroup]) {
        let query_lower = self.state.query.to_lowercase();
        let matches: Vec<SourceGroup> = groups
            .iter()
            .filter(|group| group_matches(group, &query_lower, self.state.kind))
            .cloned()
            .collect();
        debug!(
            "recomputed grouped subset (matches={}, of={})",
            matches.len(),
            groups.len()
        );
        self.grouped = Some(FilteredBatch::new(matches));
    }

    /// Recompute the flat subset from the flat projection.
    pub fn recompute_flat(&mut self, items: Vec<FlatItem>) {
        let query_lower = self.state.query.to_lowercase();
        let total = items.len();
        let matches: Vec<FlatItem> = items
            .into_iter()
            .filter(|item| flat_matches(item, &query_lower, self.state.kind))
            .collect();
        debug!(
            "recomputed flat subset (matches={}, of={})",
            matches.len(),
            total
        );
        self.flat = Some(FilteredBatch::new(matches));
    }

    /// Whether the subset for a mode has been computed since the last change.
    pub fn is_computed(&self, mode: FeedMode) -> bool {
        match mode {
            FeedMode::Grouped => self.grouped.is_some(),
            FeedMode::Flat => self.flat.is_some(),
        }
    }

    /// Visible slice of the grouped subset, if computed.
    pub fn visible_grouped(&self) -> Option<&[SourceGroup]> {
        self.grouped
            .as_ref()
            .map(|batch| batch.visible(self.batch_size))
    }

    /// Visible slice of the flat subset, if computed.
    pub fn visible_flat(&self) -> Option<&[FlatItem]> {
        self.flat
            .as_ref()
            .map(|batch| batch.visible(self.batch_size))
    }

    /// Total locally computed matches for a mode, if computed.
    pub fn match_count(&self, mode: FeedMode) -> Option<usize> {
        match mode {
            FeedMode::Grouped => self.grouped.as_ref().map(|batch| batch.matches.len()),
            FeedMode::Flat => self.flat.as_ref().map(|batch| batch.matches.len()),
        }
    }

    /// Whether more local matches exist beyond the visible slice.
    pub fn has_more(&self, mode: FeedMode) -> bool {
        match mode {
            FeedMode::Grouped => self
                .grouped
                .as_ref()
                .is_some_and(|batch| batch.has_more(self.batch_size)),
            FeedMode::Flat => self
                .flat
                .as_ref()
                .is_some_and(|batch| batch.has_more(self.batch_size)),
        }
    }

    /// Extend the visible slice by one batch of local matches.
    ///
    /// Backed purely by the computed match array; never triggers a fetch.
    pub fn load_more(&mut self, mode: FeedMode) -> bool {
        let batch_size = self.batch_size;
        match mode {
            FeedMode::Grouped => self
                .grouped
                .as_mut()
                .is_some_and(|batch| batch.grow(batch_size)),
            FeedMode::Flat => self
                .flat
                .as_mut()
                .is_some_and(|batch| batch.grow(batch_size)),
        }
    }

    /// Record the server-side complete match count for "X of Y" reporting.
    pub fn set_server_match_count(&mut self, count: u64) {
        self.server_match_count = Some(count);
    }

    /// Server-side complete match count, when it has arrived.
    pub fn server_match_count(&self) -> Option<u64> {
        self.server_match_count
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterCoordinator, FilterState};
    use crate::projector::flatten;
    use pretty_assertions::assert_eq;
    use watchfeed_rs_protocol::{FeedMode, MediaKind};
    use watchfeed_rs_test_utils::fixtures::{request, request_of_kind, source, source_of_kind};

    fn sample_groups() -> Vec<watchfeed_rs_protocol::SourceGroup> {
        vec![
            source(
                "src-1",
                "Alien",
                vec![request("req-1", "Aliens"), request("req-2", "Prometheus")],
            ),
            source("src-2", "Heat", vec![request("req-3", "Ronin")]),
            source_of_kind(
                "src-3",
                "The Wire",
                MediaKind::Series,
                vec![request_of_kind("req-4", "The Shield", MediaKind::Series)],
            ),
        ]
    }

    #[test]
    fn grouped_matches_on_group_or_child_title() {
        let mut coordinator = FilterCoordinator::new(100);
        coordinator.set_state(FilterState {
            query: "ronin".to_string(),
            kind: None,
        });
        coordinator.recompute_grouped(&sample_groups());

        let visible = coordinator.visible_grouped().expect("computed");
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].source_id, "src-2");
    }

    #[test]
    fn flat_matches_on_own_or_source_title() {
        let mut coordinator = FilterCoordinator::new(100);
        coordinator.set_state(FilterState {
            query: "alien".to_string(),
            kind: None,
        });
        coordinator.recompute_flat(flatten(&sample_groups()));

        let visible = coordinator.visible_flat().expect("computed");
        // "Aliens" matches its own title; "Prometheus" matches via source "Alien".
        assert_eq!(visible.len(), 2);
    }

    #[test]
    fn kind_filter_applies_per_mode_semantics() {
        let mut coordinator = FilterCoordinator::new(100);
        coordinator.set_state(FilterState {
            query: String::new(),
            kind: Some(MediaKind::Series),
        });
        let groups = sample_groups();
        coordinator.recompute_grouped(&groups);
        coordinator.recompute_flat(flatten(&groups));

        assert_eq!(coordinator.visible_grouped().expect("grouped").len(), 1);
        assert_eq!(coordinator.visible_flat().expect("flat").len(), 1);
    }

    #[test]
    fn filtering_is_idempotent() {
        let mut coordinator = FilterCoordinator::new(100);
        coordinator.set_state(FilterState {
            query: "heat".to_string(),
            kind: None,
        });
        let groups = sample_groups();
        coordinator.recompute_grouped(&groups);
        let first: Vec<_> = coordinator.visible_grouped().expect("first").to_vec();
        coordinator.recompute_grouped(&groups);
        let second: Vec<_> = coordinator.visible_grouped().expect("second").to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn visible_slice_grows_in_batches() {
        let groups: Vec<_> = (0..7)
            .map(|i| source(&format!("src-{i}"), &format!("Title {i}"), vec![]))
            .collect();
        let mut coordinator = FilterCoordinator::new(3);
        coordinator.set_state(FilterState {
            query: "title".to_string(),
            kind: None,
        });
        coordinator.recompute_grouped(&groups);

        assert_eq!(coordinator.visible_grouped().expect("one batch").len(), 3);
        assert!(coordinator.has_more(FeedMode::Grouped));
        assert!(coordinator.load_more(FeedMode::Grouped));
        assert_eq!(coordinator.visible_grouped().expect("two batches").len(), 6);
        assert!(coordinator.load_more(FeedMode::Grouped));
        assert_eq!(coordinator.visible_grouped().expect("all").len(), 7);
        assert!(!coordinator.load_more(FeedMode::Grouped));
    }

    #[test]
    fn clearing_drops_computed_state() {
        let mut coordinator = FilterCoordinator::new(100);
        coordinator.set_state(FilterState {
            query: "alien".to_string(),
            kind: None,
        });
        coordinator.recompute_grouped(&sample_groups());
        coordinator.set_server_match_count(12);

        coordinator.clear();
        assert!(!coordinator.is_active());
        assert_eq!(coordinator.visible_grouped(), None);
        assert_eq!(coordinator.server_match_count(), None);
    }
}
