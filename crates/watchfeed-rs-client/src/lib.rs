//! HTTP client for the Watchfeed history backend.

mod error;
mod history;

pub use error::ClientError;
pub use history::{ClientConfig, HistoryClient};
