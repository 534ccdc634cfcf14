use std::future::Future;
use std::time::Duration;

use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::task::TaskTracker;
use tracing::warn;

use super::ScheduleHandle;

/// Minimal periodic-scheduling capability over tokio timers: one independent
/// task per watch, so a blocked tick in one watch never delays another.
/// Ticks for the same watch are serialized by the task's own loop.
#[derive(Clone)]
pub struct TickScheduler {
    tracker: TaskTracker,
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TickScheduler {
    pub fn new() -> Self {
        Self {
            tracker: TaskTracker::new(),
        }
    }

    /// Run `job` every `every`, starting one interval from now. With
    /// `run_now` an extra invocation happens immediately, before the
    /// interval cadence starts.
    ///
    /// Cancelling `handle` guarantees no further invocation starts; an
    /// in-flight one runs to completion.
    pub fn schedule<F, Fut>(&self, every: Duration, handle: ScheduleHandle, run_now: bool, mut job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(async move {
            if handle.is_cancelled() {
                return;
            }
            if run_now {
                job().await;
            }
            let mut ticker = interval(every);
            // Delay rather than burst when a tick overruns its interval.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a fresh interval completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = handle.cancelled() => break,
                    _ = ticker.tick() => job().await,
                }
            }
        });
    }

    /// Wait for in-flight ticks to finish, bounded by `grace`.
    pub async fn shutdown(&self, grace: Duration) {
        self.tracker.close();
        if timeout(grace, self.tracker.wait()).await.is_err() {
            warn!(
                grace_secs = grace.as_secs(),
                "shutdown deadline reached with ticks still in flight"
            );
        }
    }
}
