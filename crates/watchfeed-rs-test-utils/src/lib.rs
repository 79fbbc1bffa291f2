//! Test helpers shared across Watchfeed crates.

pub mod fetcher;
pub mod fixtures;
pub mod probe;

pub use fetcher::ScriptedFetcher;
pub use probe::ManualProbe;
