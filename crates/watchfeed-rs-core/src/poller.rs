//! Fixed-interval refresh for the log-viewer variant of the feed.
//!
//! Where the request-history view grows its batch on sentinel visibility, the
//! log viewer polls on a timer. The poller is a cancellable repeating task:
//! started on view activation, explicitly stopped on deactivation, never left
//! running against a torn-down view.

use log::debug;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A repeating background refresh task.
pub struct LogPoller {
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl LogPoller {
    /// Start polling: `tick` runs immediately and then every `interval`.
    pub fn start<F, Fut>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (shutdown, mut signal) = watch::channel(false);
        debug!("starting log poller (interval={interval:?})");
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => tick().await,
                    changed = signal.changed() => {
                        if changed.is_err() || *signal.borrow() {
                            break;
                        }
                    }
                }
            }
        });
        Self {
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }

    /// Whether the polling task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop polling. Idempotent; a tick in progress is cancelled.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            debug!("stopping log poller");
            let _ = shutdown.send(true);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for LogPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for LogPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogPoller")
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::LogPoller;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn ticks_repeatedly_until_stopped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let mut poller = LogPoller::start(Duration::from_millis(100), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(poller.is_running());
        let seen = ticks.load(Ordering::SeqCst);
        assert!(seen >= 3, "expected at least 3 ticks, saw {seen}");

        poller.stop();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!poller.is_running());

        let frozen = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_drop_stops() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let mut poller = LogPoller::start(Duration::from_millis(100), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        poller.stop();
        poller.stop();
        assert!(!poller.is_running());

        let counter = ticks.clone();
        let poller = LogPoller::start(Duration::from_millis(100), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        drop(poller);
        let frozen = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), frozen);
    }
}
