//! The feed engine controller.
//!
//! A single `FeedEngine` owns every piece of mutable state (store, filter,
//! trigger) behind one lock; the rendering layer only ever reads through
//! [`FeedEngine::snapshot`]. Fetch completions, filter changes, sort changes,
//! and mode switches all funnel through here, which is what keeps the
//! accumulated set single-writer.

use crate::config::EngineConfig;
use crate::error::FeedError;
use crate::filter::{FilterCoordinator, FilterState};
use crate::projector::{self, FlatItem};
use crate::store::{AppendOutcome, RecordStore};
use crate::trigger::LazyLoadTrigger;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use watchfeed_rs_protocol::{
    FeedMode, MatchQuery, PageFetcher, PageQuery, SortKey, SourceGroup, ViewportProbe,
};

/// Transient, user-facing notification produced by a failed operation.
///
/// Consumed by the first snapshot that reads it.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedNotice {
    /// A page fetch failed; scrolling again retries.
    FetchFailed {
        /// Page that failed to load.
        page: u32,
        /// Human-readable failure description.
        message: String,
    },
}

/// The visible sequence for the active mode.
#[derive(Debug, Clone, PartialEq)]
pub enum VisibleRows {
    /// Grouped projection rows.
    Grouped(Vec<SourceGroup>),
    /// Flat projection rows.
    Flat(Vec<FlatItem>),
}

impl VisibleRows {
    /// Number of visible rows.
    pub fn len(&self) -> usize {
        match self {
            VisibleRows::Grouped(groups) => groups.len(),
            VisibleRows::Flat(items) => items.len(),
        }
    }

    /// Whether no rows are visible.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Render view model: everything the UI needs for one paint.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    /// Active projection mode.
    pub mode: FeedMode,
    /// Visible rows for the active mode (filtered when a filter is active).
    pub rows: VisibleRows,
    /// Whether a page fetch is outstanding.
    pub in_flight: bool,
    /// Whether more rows can be shown: further server pages for the
    /// unfiltered view, further local batches for the filtered view.
    pub has_more: bool,
    /// Whether any filter axis is active.
    pub filter_active: bool,
    /// Locally computed match count for the active filter.
    pub local_match_count: Option<usize>,
    /// Complete server-side match count, once it has arrived.
    pub server_match_count: Option<u64>,
    /// Total distinct sources reported by the server.
    pub total_sources: Option<u64>,
    /// Total distinct requests reported by the server.
    pub total_records: Option<u64>,
    /// Pending transient notification, if any.
    pub notice: Option<FeedNotice>,
}

/// All mutable engine state, owned by exactly one lock.
#[derive(Debug)]
struct EngineState {
    store: RecordStore,
    filter: FilterCoordinator,
    mode: FeedMode,
    sort: SortKey,
    in_flight: bool,
    notice: Option<FeedNotice>,
}

impl EngineState {
    /// Recompute the active mode's filtered subset from the store.
    ///
    /// Upholds the precondition that a filtered view is never read before it
    /// has been computed against the current inputs.
    fn recompute_active_filter(&mut self) {
        if !self.filter.is_active() {
            return;
        }
        match self.mode {
            FeedMode::Grouped => self.filter.recompute_grouped(self.store.groups()),
            FeedMode::Flat => self
                .filter
                .recompute_flat(projector::flatten(self.store.groups())),
        }
    }
}

/// Generation-tagged description of a dispatched fetch.
#[derive(Debug, Clone, Copy)]
struct FetchTicket {
    page: u32,
    sort: SortKey,
    generation: u64,
}

/// Incremental feed engine over a paginated history backend.
pub struct FeedEngine {
    config: EngineConfig,
    fetcher: Arc<dyn PageFetcher>,
    probe: Arc<dyn ViewportProbe>,
    state: Mutex<EngineState>,
    trigger: Mutex<LazyLoadTrigger>,
    /// Self-handle for background tasks; they must not keep the engine alive.
    weak: Weak<FeedEngine>,
}

impl FeedEngine {
    /// Create an engine in grouped mode with the default sort.
    pub fn new(
        config: EngineConfig,
        fetcher: Arc<dyn PageFetcher>,
        probe: Arc<dyn ViewportProbe>,
    ) -> Result<Arc<Self>, FeedError> {
        config.validate()?;
        let filter_batch_size = config.filter_batch_size;
        Ok(Arc::new_cyclic(|weak| Self {
            config,
            fetcher,
            probe,
            state: Mutex::new(EngineState {
                store: RecordStore::new(),
                filter: FilterCoordinator::new(filter_batch_size),
                mode: FeedMode::Grouped,
                sort: SortKey::default(),
                in_flight: false,
                notice: None,
            }),
            trigger: Mutex::new(LazyLoadTrigger::new()),
            weak: weak.clone(),
        }))
    }

    /// Active sort order.
    pub fn sort(&self) -> SortKey {
        self.state.lock().sort
    }

    /// Active projection mode.
    pub fn mode(&self) -> FeedMode {
        self.state.lock().mode
    }

    /// Fetch page 1 and arm the lazy-load trigger.
    pub async fn load_initial(&self) -> Result<(), FeedError> {
        let Some(ticket) = self.begin_fetch(1) else {
            debug!("initial load skipped, fetch already in flight");
            return Ok(());
        };
        let result = self.run_fetch(ticket).await;
        self.arm_trigger();
        result
    }

    /// Change the server sort order.
    ///
    /// Sort is a server-side concern: accumulated pages cannot be locally
    /// resorted without risking inconsistency with server page boundaries, so
    /// the store is reset and page 1 refetched. Any fetch in flight for the
    /// previous generation is discarded on arrival.
    pub async fn set_sort(&self, sort: SortKey) -> Result<(), FeedError> {
        {
            let mut state = self.state.lock();
            if state.sort == sort {
                return Ok(());
            }
            info!(
                "sort changed, resetting feed (sort_by={})",
                sort.as_str()
            );
            state.sort = sort;
            state.store.reset();
            state.filter.invalidate_all();
            // The reset orphans any outstanding fetch; its settle is a no-op.
            state.in_flight = false;
        }
        self.trigger.lock().disarm();

        let Some(ticket) = self.begin_fetch(1) else {
            return Ok(());
        };
        let result = self.run_fetch(ticket).await;
        self.arm_trigger();
        result
    }

    /// Apply text/kind filter inputs.
    ///
    /// Never refetches pages: the subset is recomputed from accumulated data,
    /// and the complete server-side match count is fetched asynchronously for
    /// "X of Y results" reporting. Empty inputs are equivalent to
    /// [`FeedEngine::clear_filter`].
    pub fn set_filter(&self, filter: FilterState) {
        if filter.is_empty() {
            self.clear_filter();
            return;
        }

        let generation = {
            let mut state = self.state.lock();
            state.filter.set_state(filter.clone());
            state.recompute_active_filter();
            state.store.generation()
        };

        let engine = self.weak.clone();
        let query = MatchQuery {
            query: filter.query.clone(),
            kind: filter.kind,
        };
        tokio::spawn(async move {
            let Some(engine) = engine.upgrade() else {
                return;
            };
            match engine.fetcher.count_matches(&query).await {
                Ok(count) => {
                    let mut state = engine.state.lock();
                    if state.store.generation() == generation && state.filter.state() == &filter {
                        state.filter.set_server_match_count(count);
                    } else {
                        debug!("discarding stale match count (count={count})");
                    }
                }
                Err(err) => warn!("match count fetch failed ({err})"),
            }
        });
    }

    /// Clear both filter axes.
    ///
    /// Lossless and O(1): the display reverts to the exact unfiltered
    /// accumulated batches, with no refetch and no state loss.
    pub fn clear_filter(&self) {
        self.state.lock().filter.clear();
    }

    /// Extend the filtered view by one local batch.
    ///
    /// Backed purely by the locally computed match array; a filtered tail not
    /// yet fetched from the server stays invisible until server pagination
    /// independently catches up.
    pub fn load_more_filtered(&self) -> bool {
        let mut state = self.state.lock();
        let mode = state.mode;
        state.filter.load_more(mode)
    }

    /// Switch the active projection and re-arm the trigger for its sentinel.
    ///
    /// The record store is untouched (both projections are views over it);
    /// the previous mode's filtered subset is dropped because the two modes
    /// match structurally differently.
    pub fn switch_mode(&self, mode: FeedMode) {
        {
            let mut state = self.state.lock();
            if state.mode == mode {
                return;
            }
            info!("switching mode (mode={mode:?})");
            let previous = state.mode;
            state.mode = mode;
            state.filter.invalidate(previous);
            state.recompute_active_filter();
        }
        self.arm_trigger();
    }

    /// Set the expand/collapse flag on an accumulated source group.
    pub fn set_expanded(&self, source_id: &str, expanded: bool) -> bool {
        self.state.lock().store.set_expanded(source_id, expanded)
    }

    /// Handle the sentinel becoming visible: fetch the next page.
    ///
    /// Returns whether observation should continue. Gated by the in-flight
    /// flag (two rapid visibility events produce one fetch) and by has-more.
    pub async fn notify_sentinel_visible(&self) -> bool {
        let next_page = {
            let state = self.state.lock();
            if !state.store.has_more() {
                return false;
            }
            if state.in_flight {
                debug!("visibility event ignored, fetch already in flight");
                return true;
            }
            state.store.cursor() + 1
        };
        let Some(ticket) = self.begin_fetch(next_page) else {
            return true;
        };
        // Failures only produce a notice; the next visibility event retries.
        let _ = self.run_fetch(ticket).await;
        self.state.lock().store.has_more()
    }

    /// Current render view model.
    ///
    /// Takes the pending notice, so a notification is reported exactly once.
    pub fn snapshot(&self) -> FeedSnapshot {
        let mut state = self.state.lock();
        let mode = state.mode;
        let filter_active = state.filter.is_active();
        if filter_active && !state.filter.is_computed(mode) {
            state.recompute_active_filter();
        }

        let rows = if filter_active {
            match mode {
                FeedMode::Grouped => VisibleRows::Grouped(
                    state
                        .filter
                        .visible_grouped()
                        .map(<[SourceGroup]>::to_vec)
                        .unwrap_or_default(),
                ),
                FeedMode::Flat => VisibleRows::Flat(
                    state
                        .filter
                        .visible_flat()
                        .map(<[FlatItem]>::to_vec)
                        .unwrap_or_default(),
                ),
            }
        } else {
            match mode {
                FeedMode::Grouped => VisibleRows::Grouped(state.store.groups().to_vec()),
                FeedMode::Flat => VisibleRows::Flat(projector::flatten(state.store.groups())),
            }
        };

        FeedSnapshot {
            mode,
            rows,
            in_flight: state.in_flight,
            has_more: if filter_active {
                state.filter.has_more(mode)
            } else {
                state.store.has_more()
            },
            filter_active,
            local_match_count: state.filter.match_count(mode),
            server_match_count: state.filter.server_match_count(),
            total_sources: state.store.total_sources(),
            total_records: state.store.total_records(),
            notice: state.notice.take(),
        }
    }

    /// Claim the in-flight flag and describe the fetch to dispatch.
    fn begin_fetch(&self, page: u32) -> Option<FetchTicket> {
        let mut state = self.state.lock();
        if state.in_flight {
            return None;
        }
        state.in_flight = true;
        Some(FetchTicket {
            page,
            sort: state.sort,
            generation: state.store.generation(),
        })
    }

    /// Dispatch a fetch and settle it against the current generation.
    async fn run_fetch(&self, ticket: FetchTicket) -> Result<(), FeedError> {
        debug!(
            "fetching page (page={}, sort_by={}, generation={})",
            ticket.page,
            ticket.sort.as_str(),
            ticket.generation
        );
        let result = self
            .fetcher
            .fetch_page(&PageQuery {
                page: ticket.page,
                sort_by: ticket.sort,
            })
            .await;

        let mut state = self.state.lock();
        if state.store.generation() != ticket.generation {
            // The reset that bumped the generation already released the
            // in-flight flag; this settle must not touch the new fetch's.
            debug!(
                "settle for stale generation discarded (page={}, generation={})",
                ticket.page, ticket.generation
            );
            return Ok(());
        }
        state.in_flight = false;
        match result {
            Ok(page) => {
                if state.store.append_page(page, ticket.generation) == AppendOutcome::Merged {
                    state.recompute_active_filter();
                }
                Ok(())
            }
            Err(err) => {
                warn!("page fetch failed (page={}, error={})", ticket.page, err);
                state.notice = Some(FeedNotice::FetchFailed {
                    page: ticket.page,
                    message: err.to_string(),
                });
                Err(FeedError::Fetch(err))
            }
        }
    }

    /// Re-arm the lazy-load trigger for the active mode.
    ///
    /// The previous observation is always torn down first; none is created
    /// when the server has no further pages.
    fn arm_trigger(&self) {
        let (mode, has_more) = {
            let state = self.state.lock();
            (state.mode, state.store.has_more())
        };
        let mut trigger = self.trigger.lock();
        trigger.disarm();
        if !has_more {
            return;
        }
        let engine = self.weak.clone();
        trigger.arm(
            self.probe.clone(),
            mode,
            self.config.sentinel_threshold,
            self.config.sentinel_retry_attempts,
            self.config.sentinel_retry_delay(),
            move || {
                let engine = engine.clone();
                async move {
                    match engine.upgrade() {
                        Some(engine) => engine.notify_sentinel_visible().await,
                        None => false,
                    }
                }
            },
        );
    }
}

impl Drop for FeedEngine {
    fn drop(&mut self) {
        self.trigger.lock().disarm();
    }
}

impl std::fmt::Debug for FeedEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FeedEngine")
            .field("mode", &state.mode)
            .field("sort", &state.sort)
            .field("in_flight", &state.in_flight)
            .field("sources", &state.store.groups().len())
            .finish()
    }
}
