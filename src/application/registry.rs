use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use super::{AppError, AppResult};

/// Cancellation handle for one watch's recurring schedule.
#[derive(Clone, Debug, Default)]
pub struct ScheduleHandle {
    token: CancellationToken,
}

impl ScheduleHandle {
    fn new() -> Self {
        Self::default()
    }

    /// After this returns, no new tick for the watch will start. A tick
    /// already in flight runs to completion.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

/// Mutable per-watch state: the schedule handle and, for diff watches, the
/// captured baseline body.
struct WatchState {
    handle: ScheduleHandle,
    baseline: Option<String>,
}

/// Owns all per-watch state, keyed by watch name. One handle per name at any
/// time; all access goes through the registry's mutex since ticks for
/// distinct watches run concurrently.
#[derive(Clone, Default)]
pub struct WatchRegistry {
    inner: Arc<Mutex<HashMap<String, WatchState>>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, HashMap<String, WatchState>>> {
        self.inner
            .lock()
            .map_err(|_| AppError::Registry("lock poisoned".into()))
    }

    /// Create state for `name` and return its schedule handle.
    pub fn register(&self, name: &str) -> AppResult<ScheduleHandle> {
        let mut watches = self.lock()?;
        if watches.contains_key(name) {
            return Err(AppError::DuplicateWatch(name.to_string()));
        }
        let handle = ScheduleHandle::new();
        watches.insert(
            name.to_string(),
            WatchState {
                handle: handle.clone(),
                baseline: None,
            },
        );
        Ok(handle)
    }

    /// Idempotent: cancels the schedule and discards state. No-op when the
    /// watch is already gone.
    pub fn unregister(&self, name: &str) -> AppResult<()> {
        let mut watches = self.lock()?;
        if let Some(state) = watches.remove(name) {
            state.handle.cancel();
        }
        Ok(())
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.inner
            .lock()
            .map(|watches| watches.contains_key(name))
            .unwrap_or(false)
    }

    pub fn names(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|watches| watches.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn baseline(&self, name: &str) -> AppResult<Option<String>> {
        Ok(self.lock()?.get(name).and_then(|s| s.baseline.clone()))
    }

    /// Write-once: the baseline stays the original capture for the life of
    /// the watch.
    pub fn set_baseline(&self, name: &str, body: String) -> AppResult<()> {
        let mut watches = self.lock()?;
        let state = watches
            .get_mut(name)
            .ok_or_else(|| AppError::Registry(format!("unknown watch: {name}")))?;
        if state.baseline.is_some() {
            return Err(AppError::Registry(format!(
                "baseline already set for watch: {name}"
            )));
        }
        state.baseline = Some(body);
        Ok(())
    }
}
