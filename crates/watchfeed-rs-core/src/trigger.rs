//! Visibility-driven lazy loading of further pages.
//!
//! The trigger owns one background task per armed sentinel. The task resolves
//! the sentinel (with a bounded retry while the rendering layer mounts it),
//! subscribes to intersection events, and invokes the engine callback whenever
//! the sentinel crosses the threshold. Dropping or disarming the trigger
//! cancels the task, which disconnects the subscription on the way out.

use log::debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use watchfeed_rs_protocol::{FeedMode, ViewportProbe};

/// Handle to the background observation task for the active sentinel.
#[derive(Debug, Default)]
pub struct LazyLoadTrigger {
    task: Option<JoinHandle<()>>,
}

impl LazyLoadTrigger {
    /// Create a disarmed trigger.
    pub fn new() -> Self {
        Self { task: None }
    }

    /// Whether an observation task is currently running.
    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Tear down the current observation task, if any.
    ///
    /// Always called before arming a new one, so overlapping observers cannot
    /// issue duplicate fetches.
    pub fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("disarming lazy-load trigger");
            task.abort();
        }
    }

    /// Arm the trigger against the sentinel for `mode`.
    ///
    /// `on_visible` runs whenever the sentinel's intersection ratio reaches
    /// `threshold`; returning `false` stops observation (no more pages, or
    /// the engine is gone). The sentinel lookup is retried `retry_attempts`
    /// times with a fixed `retry_delay` before giving up silently.
    pub fn arm<F, Fut>(
        &mut self,
        probe: Arc<dyn ViewportProbe>,
        mode: FeedMode,
        threshold: f64,
        retry_attempts: u32,
        retry_delay: Duration,
        on_visible: F,
    ) where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send,
    {
        self.disarm();
        debug!("arming lazy-load trigger (mode={mode:?}, threshold={threshold})");
        self.task = Some(tokio::spawn(async move {
            let mut sentinel = probe.sentinel(mode);
            let mut attempts = 0;
            while sentinel.is_none() {
                if attempts >= retry_attempts {
                    debug!("sentinel never mounted, giving up (mode={mode:?})");
                    return;
                }
                attempts += 1;
                tokio::time::sleep(retry_delay).await;
                sentinel = probe.sentinel(mode);
            }
            let Some(sentinel) = sentinel else {
                return;
            };
            let Some(mut subscription) = probe.observe(&sentinel, threshold) else {
                debug!("sentinel disappeared before observation (mode={mode:?})");
                return;
            };
            while let Some(event) = subscription.next_event().await {
                if event.ratio < threshold {
                    continue;
                }
                if !on_visible().await {
                    break;
                }
            }
        }));
    }
}

impl Drop for LazyLoadTrigger {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::LazyLoadTrigger;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use watchfeed_rs_protocol::FeedMode;
    use watchfeed_rs_test_utils::probe::ManualProbe;

    fn counting_callback(
        hits: Arc<AtomicUsize>,
    ) -> impl Fn() -> std::future::Ready<bool> + Send + 'static {
        move || {
            hits.fetch_add(1, Ordering::SeqCst);
            std::future::ready(true)
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn fires_only_at_or_above_threshold() {
        let probe = Arc::new(ManualProbe::new());
        probe.mount(FeedMode::Flat, "flat-sentinel");
        let hits = Arc::new(AtomicUsize::new(0));

        let mut trigger = LazyLoadTrigger::new();
        trigger.arm(
            probe.clone(),
            FeedMode::Flat,
            0.9,
            3,
            Duration::from_millis(10),
            counting_callback(hits.clone()),
        );
        settle().await;

        assert!(probe.fire("flat-sentinel", 0.5));
        settle().await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        assert!(probe.fire("flat-sentinel", 0.95));
        settle().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_the_sentinel_mounts() {
        let probe = Arc::new(ManualProbe::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let mut trigger = LazyLoadTrigger::new();
        trigger.arm(
            probe.clone(),
            FeedMode::Grouped,
            0.9,
            5,
            Duration::from_millis(10),
            counting_callback(hits.clone()),
        );
        // Mounted while the retry loop is still running.
        tokio::time::sleep(Duration::from_millis(25)).await;
        probe.mount(FeedMode::Grouped, "grouped-sentinel");
        settle().await;

        assert!(probe.fire("grouped-sentinel", 1.0));
        settle().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_bounded_attempts() {
        let probe = Arc::new(ManualProbe::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let mut trigger = LazyLoadTrigger::new();
        trigger.arm(
            probe.clone(),
            FeedMode::Grouped,
            0.9,
            2,
            Duration::from_millis(10),
            counting_callback(hits.clone()),
        );
        settle().await;
        assert!(!trigger.is_armed());
        assert_eq!(probe.observe_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_disconnects_the_subscription() {
        let probe = Arc::new(ManualProbe::new());
        probe.mount(FeedMode::Flat, "flat-sentinel");
        let hits = Arc::new(AtomicUsize::new(0));

        let mut trigger = LazyLoadTrigger::new();
        trigger.arm(
            probe.clone(),
            FeedMode::Flat,
            0.9,
            3,
            Duration::from_millis(10),
            counting_callback(hits.clone()),
        );
        settle().await;
        assert_eq!(probe.active_observers(), 1);

        trigger.disarm();
        settle().await;
        assert_eq!(probe.active_observers(), 0);
        assert!(!probe.fire("flat-sentinel", 1.0));
    }
}
