//! Incremental feed engine for the Watchfeed dashboard.
//!
//! The engine pulls a server-paginated history collection, accumulates it in
//! a deduplicated [`store::RecordStore`], projects it as a grouped or flat
//! sequence, filters locally without refetching, and lazy-loads further pages
//! when a sentinel element scrolls into view. The log-viewer variant swaps
//! the visibility trigger for a fixed-interval [`poller::LogPoller`].

pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod poller;
pub mod projector;
pub mod store;
pub mod trigger;

pub use config::EngineConfig;
pub use engine::{FeedEngine, FeedNotice, FeedSnapshot, VisibleRows};
pub use error::FeedError;
pub use filter::{FilterCoordinator, FilterState};
pub use poller::LogPoller;
pub use projector::FlatItem;
pub use store::{AppendOutcome, RecordStore};
pub use trigger::LazyLoadTrigger;
