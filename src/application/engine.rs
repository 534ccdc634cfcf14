use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::domain::{WatchKind, WatchSpec};

use super::{
    AppError, AppResult, DiffEvaluator, Evaluation, Evaluator, Fetcher, HtmlEvaluator, Notifier,
    TickScheduler, WatchRegistry,
};

/// Delivery attempts per fired watch before the alert is given up on.
const NOTIFY_ATTEMPTS: u32 = 3;

/// Orchestrates the watch lifecycle: schedules ticks, runs the evaluator
/// matching each watch's kind, and on a match notifies once and removes the
/// watch.
#[derive(Clone)]
pub struct Engine {
    registry: WatchRegistry,
    notifier: Arc<dyn Notifier>,
    scheduler: TickScheduler,
    html: Arc<HtmlEvaluator>,
    diff: Arc<DiffEvaluator>,
}

impl Engine {
    pub fn new(
        registry: WatchRegistry,
        fetcher: Arc<dyn Fetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let html = Arc::new(HtmlEvaluator::new(Arc::clone(&fetcher)));
        let diff = Arc::new(DiffEvaluator::new(fetcher, registry.clone()));
        Self {
            registry,
            notifier,
            scheduler: TickScheduler::new(),
            html,
            diff,
        }
    }

    /// Register `spec` and begin its recurring schedule. Diff watches run an
    /// immediate seeding tick to capture their baseline; html watches wait
    /// one full interval before the first evaluation.
    pub fn watch(&self, spec: WatchSpec) -> AppResult<()> {
        if spec.interval.is_zero() {
            return Err(AppError::Schedule(format!(
                "watch {}: interval must be non-zero",
                spec.name
            )));
        }
        let handle = self.registry.register(&spec.name)?;
        let run_now = matches!(spec.kind, WatchKind::Diff);
        let spec = Arc::new(spec);
        let engine = self.clone();
        self.scheduler
            .schedule(spec.interval, handle, run_now, move || {
                let engine = engine.clone();
                let spec = Arc::clone(&spec);
                async move { engine.tick(&spec).await }
            });
        Ok(())
    }

    /// One scheduled evaluation of `spec`. On an error the watch stays
    /// scheduled; the next tick is the retry.
    pub async fn tick(&self, spec: &WatchSpec) {
        debug!(watch = %spec.name, kind = spec.kind.label(), "executing watch");
        let outcome = match &spec.kind {
            WatchKind::Html { .. } => self.html.evaluate(spec).await,
            WatchKind::Diff => self.diff.evaluate(spec).await,
        };
        match outcome {
            Ok(Evaluation::Match) => self.fire(spec).await,
            Ok(Evaluation::NoMatch) => {}
            Err(e) => {
                warn!(watch = %spec.name, kind = spec.kind.label(), error = %e, "watch check failed");
            }
        }
    }

    /// Notify first, then remove the watch. Removal happens even
    /// when every delivery attempt fails: delivery is at-most-once, and the
    /// loss is logged loudly instead of retried forever.
    async fn fire(&self, spec: &WatchSpec) {
        let text = spec.notification();
        let mut delivered = false;
        for attempt in 1..=NOTIFY_ATTEMPTS {
            match self.notifier.notify(&text).await {
                Ok(()) => {
                    delivered = true;
                    break;
                }
                Err(e) => {
                    warn!(watch = %spec.name, attempt, error = %e, "notification attempt failed");
                }
            }
        }
        if !delivered {
            error!(
                watch = %spec.name,
                attempts = NOTIFY_ATTEMPTS,
                "alert lost: all delivery attempts failed"
            );
        }
        if let Err(e) = self.registry.unregister(&spec.name) {
            warn!(watch = %spec.name, error = %e, "failed to unregister fired watch");
        }
        info!(watch = %spec.name, delivered, "watch fired and removed");
    }

    /// Cancel every schedule, then wait for in-flight ticks, bounded by
    /// `grace`.
    pub async fn close(&self, grace: Duration) {
        for name in self.registry.names() {
            if let Err(e) = self.registry.unregister(&name) {
                warn!(watch = %name, error = %e, "failed to unregister during shutdown");
            }
        }
        self.scheduler.shutdown(grace).await;
    }
}
