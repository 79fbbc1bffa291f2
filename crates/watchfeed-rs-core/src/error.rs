//! Error types for the feed engine crate.

use thiserror::Error;
use watchfeed_rs_protocol::FetchError;

/// Errors returned by feed engine operations.
#[derive(Debug, Error)]
pub enum FeedError {
    /// A page fetch failed; the accumulated set is untouched.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    /// Engine configuration failed validation.
    #[error("invalid config: {0}")]
    Config(String),
}
