//! Wire protocol types for the Watchfeed history API, plus the consumed
//! capabilities (page fetching, viewport observation) the engine is built on.

mod option;

pub use option::NormalizedOption;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::mpsc;

/// Identifier of a source (consumed media that caused recommendations).
pub type SourceId = String;
/// Identifier of a single requested item.
pub type RequestId = String;
/// Handle to a sentinel element owned by the rendering layer.
pub type SentinelId = String;

/// Media kind for sources and requested items.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// A movie.
    Movie,
    /// An episodic series.
    Series,
}

impl MediaKind {
    /// Return the kind as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "series",
        }
    }
}

impl FromStr for MediaKind {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "movie" => Ok(MediaKind::Movie),
            "series" => Ok(MediaKind::Series),
            _ => Err(()),
        }
    }
}

/// Server-side sort order for the history collection.
///
/// Sorting is a server concern: changing it invalidates everything the client
/// has accumulated, so these values always travel with a page request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Most recently requested first.
    #[default]
    RequestedAtDesc,
    /// Oldest request first.
    RequestedAtAsc,
    /// Title, A to Z.
    TitleAsc,
    /// Title, Z to A.
    TitleDesc,
    /// Lowest rated first.
    RatingAsc,
    /// Highest rated first.
    RatingDesc,
    /// Earliest release first.
    ReleaseDateAsc,
    /// Latest release first.
    ReleaseDateDesc,
}

impl SortKey {
    /// Return the sort key as its `sort_by` query-parameter value.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::RequestedAtDesc => "requested-at-desc",
            SortKey::RequestedAtAsc => "requested-at-asc",
            SortKey::TitleAsc => "title-asc",
            SortKey::TitleDesc => "title-desc",
            SortKey::RatingAsc => "rating-asc",
            SortKey::RatingDesc => "rating-desc",
            SortKey::ReleaseDateAsc => "release-date-asc",
            SortKey::ReleaseDateDesc => "release-date-desc",
        }
    }
}

/// A media item automatically requested on behalf of the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestedItem {
    /// Unique id of the request.
    pub request_id: RequestId,
    /// Title of the requested media.
    pub title: String,
    /// Media kind of the requested media.
    pub media_type: MediaKind,
    /// When the request was placed.
    pub requested_at: DateTime<Utc>,
    /// Overview text, when the metadata service provided one.
    #[serde(default)]
    pub overview: Option<String>,
    /// Poster image reference.
    #[serde(default)]
    pub poster_path: Option<String>,
    /// Release date of the media.
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    /// Rating on the metadata service's scale.
    #[serde(default)]
    pub rating: Option<f64>,
    /// Logo image reference.
    #[serde(default)]
    pub logo_path: Option<String>,
    /// Backdrop image reference.
    #[serde(default)]
    pub backdrop_path: Option<String>,
}

/// A piece of content the user consumed, carrying the requests it caused.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceGroup {
    /// Unique id of the source.
    pub source_id: SourceId,
    /// Title of the source media.
    pub source_title: String,
    /// Release date of the source media.
    #[serde(default)]
    pub source_release_date: Option<NaiveDate>,
    /// Overview text for the source media.
    #[serde(default)]
    pub source_overview: Option<String>,
    /// Poster image reference for the source.
    #[serde(default)]
    pub source_poster_path: Option<String>,
    /// Rating of the source media.
    #[serde(default)]
    pub rating: Option<f64>,
    /// Media kind of the source.
    pub media_type: MediaKind,
    /// Logo image reference for the source.
    #[serde(default)]
    pub logo_path: Option<String>,
    /// Backdrop image reference for the source.
    #[serde(default)]
    pub backdrop_path: Option<String>,
    /// Requests attributed to this source, in server order.
    #[serde(default)]
    pub requests: Vec<RequestedItem>,
    /// Expand/collapse flag for the grouped view. Never sent by the server.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub expanded: bool,
}

/// One server response unit of the paginated history collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageResponse {
    /// Source groups for this page, in server sort order.
    pub data: Vec<SourceGroup>,
    /// Page number this response covers (1-based).
    pub page: u32,
    /// Total number of pages for the current sort.
    pub total_pages: u32,
    /// Total distinct sources across the whole collection (page 1 only).
    #[serde(default)]
    pub total_sources: u64,
    /// Total distinct requests across the whole collection (page 1 only).
    #[serde(default)]
    pub total_records: u64,
}

/// Parameters for a single page fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageQuery {
    /// Page to fetch (1-based).
    pub page: u32,
    /// Server sort order to apply.
    pub sort_by: SortKey,
}

/// Parameters for a server-side filtered match count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchQuery {
    /// Free-text query, matched against titles.
    pub query: String,
    /// Optional media-kind restriction.
    #[serde(default)]
    pub kind: Option<MediaKind>,
}

/// Errors surfaced by `PageFetcher` implementations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
    /// The server answered with a non-2xx status.
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Capability for fetching history pages and match counts from the backend.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page of the history collection.
    async fn fetch_page(&self, query: &PageQuery) -> Result<PageResponse, FetchError>;
    /// Count all server-side matches for a filter, unbounded by pagination.
    async fn count_matches(&self, query: &MatchQuery) -> Result<u64, FetchError>;
}

/// Which projection of the feed is active.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    /// Requests bucketed under their source.
    Grouped,
    /// One row per request, denormalized with its source.
    Flat,
}

/// A single intersection report for an observed sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityEvent {
    /// Fraction of the sentinel currently inside the viewport, 0.0 to 1.0.
    pub ratio: f64,
}

/// Live observation of a sentinel element.
///
/// Dropping the subscription disconnects the underlying observer, so a
/// connect always pairs with a disconnect.
pub struct VisibilitySubscription {
    events: mpsc::Receiver<VisibilityEvent>,
    disconnect: Option<Box<dyn FnOnce() + Send>>,
}

impl VisibilitySubscription {
    /// Wrap an event stream together with its disconnect action.
    pub fn new(
        events: mpsc::Receiver<VisibilityEvent>,
        disconnect: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            events,
            disconnect: Some(Box::new(disconnect)),
        }
    }

    /// Wait for the next visibility event; `None` once the observer is gone.
    pub async fn next_event(&mut self) -> Option<VisibilityEvent> {
        self.events.recv().await
    }
}

impl Drop for VisibilitySubscription {
    fn drop(&mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

impl std::fmt::Debug for VisibilitySubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisibilitySubscription").finish_non_exhaustive()
    }
}

/// Capability for observing sentinel elements in the rendering layer.
pub trait ViewportProbe: Send + Sync {
    /// Resolve the sentinel for a mode, if the rendering layer has mounted it.
    fn sentinel(&self, mode: FeedMode) -> Option<SentinelId>;
    /// Observe intersection changes for a sentinel at the given threshold.
    ///
    /// Returns `None` when the sentinel is no longer mounted.
    fn observe(&self, sentinel: &SentinelId, threshold: f64) -> Option<VisibilitySubscription>;
}
