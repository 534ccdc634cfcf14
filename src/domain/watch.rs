use std::time::Duration;

use super::Condition;

/// Immutable definition of one watch, built from configuration at startup.
#[derive(Clone, Debug)]
pub struct WatchSpec {
    /// Unique within the running process; registry key and logging identity.
    pub name: String,
    pub url: String,
    /// Body of the outgoing notification.
    pub message: String,
    /// Re-check cadence.
    pub interval: Duration,
    pub kind: WatchKind,
}

#[derive(Clone, Debug)]
pub enum WatchKind {
    /// Match elements by CSS selector and test a predicate against each.
    Html {
        selector: String,
        condition: Condition,
    },
    /// Match on any deviation from the first successfully fetched body.
    Diff,
}

impl WatchKind {
    pub fn label(&self) -> &'static str {
        match self {
            WatchKind::Html { .. } => "html",
            WatchKind::Diff => "diff",
        }
    }
}

impl WatchSpec {
    /// Text sent to the notification channel when the watch fires.
    pub fn notification(&self) -> String {
        format!("New Dib!\n{}\n\n{}", self.message, self.url)
    }
}
