//! Manually driven `ViewportProbe` for exercising the lazy-load trigger.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use watchfeed_rs_protocol::{
    FeedMode, SentinelId, ViewportProbe, VisibilityEvent, VisibilitySubscription,
};

/// Fake viewport: tests mount sentinels and fire intersection events by hand.
#[derive(Default)]
pub struct ManualProbe {
    mounted: Mutex<HashMap<FeedMode, SentinelId>>,
    senders: Arc<Mutex<HashMap<SentinelId, mpsc::Sender<VisibilityEvent>>>>,
    observe_count: AtomicUsize,
}

impl ManualProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a sentinel for a mode, as the rendering layer would.
    pub fn mount(&self, mode: FeedMode, sentinel: &str) {
        self.mounted.lock().insert(mode, sentinel.to_string());
    }

    /// Remove a mode's sentinel.
    pub fn unmount(&self, mode: FeedMode) {
        self.mounted.lock().remove(&mode);
    }

    /// Report an intersection ratio for a sentinel.
    ///
    /// Returns false when nothing is observing it.
    pub fn fire(&self, sentinel: &str, ratio: f64) -> bool {
        let sender = self.senders.lock().get(sentinel).cloned();
        match sender {
            Some(sender) => sender.try_send(VisibilityEvent { ratio }).is_ok(),
            None => false,
        }
    }

    /// Number of live observations.
    pub fn active_observers(&self) -> usize {
        self.senders.lock().len()
    }

    /// Total number of `observe` calls ever made.
    pub fn observe_count(&self) -> usize {
        self.observe_count.load(Ordering::SeqCst)
    }
}

impl ViewportProbe for ManualProbe {
    fn sentinel(&self, mode: FeedMode) -> Option<SentinelId> {
        self.mounted.lock().get(&mode).cloned()
    }

    fn observe(&self, sentinel: &SentinelId, _threshold: f64) -> Option<VisibilitySubscription> {
        let mounted = self.mounted.lock().values().any(|id| id == sentinel);
        if !mounted {
            return None;
        }
        self.observe_count.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::channel(16);
        self.senders.lock().insert(sentinel.clone(), sender);

        let senders = self.senders.clone();
        let id = sentinel.clone();
        Some(VisibilitySubscription::new(receiver, move || {
            senders.lock().remove(&id);
        }))
    }
}
