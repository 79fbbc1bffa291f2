//! Scripted `PageFetcher` with call recording and resolution gating.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;
use watchfeed_rs_protocol::{FetchError, MatchQuery, PageFetcher, PageQuery, PageResponse};

/// Fake fetcher resolving queued results in order.
///
/// An unqueued call fails with a transport error, which exercises the same
/// settle path as a real network failure.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: Mutex<VecDeque<Result<PageResponse, FetchError>>>,
    counts: Mutex<VecDeque<Result<u64, FetchError>>>,
    page_calls: Mutex<Vec<PageQuery>>,
    count_calls: Mutex<Vec<MatchQuery>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful page response.
    pub fn push_page(&self, page: PageResponse) {
        self.pages.lock().push_back(Ok(page));
    }

    /// Queue a failing page fetch.
    pub fn push_page_error(&self, error: FetchError) {
        self.pages.lock().push_back(Err(error));
    }

    /// Queue a successful match count.
    pub fn push_count(&self, count: u64) {
        self.counts.lock().push_back(Ok(count));
    }

    /// Hold the next page fetch until the returned handle is notified.
    pub fn hold_next(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    /// Every page query dispatched so far.
    pub fn page_calls(&self) -> Vec<PageQuery> {
        self.page_calls.lock().clone()
    }

    /// Every match-count query dispatched so far.
    pub fn count_calls(&self) -> Vec<MatchQuery> {
        self.count_calls.lock().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(&self, query: &PageQuery) -> Result<PageResponse, FetchError> {
        self.page_calls.lock().push(query.clone());
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.pages
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Transport("no scripted page".to_string())))
    }

    async fn count_matches(&self, query: &MatchQuery) -> Result<u64, FetchError> {
        self.count_calls.lock().push(query.clone());
        self.counts
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Transport("no scripted count".to_string())))
    }
}
