use async_trait::async_trait;

use crate::application::{AppResult, Notifier};

/// Prints notifications to stdout. Used by `--dry-run`.
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, text: &str) -> AppResult<()> {
        println!("NOTIFY: {text}");
        Ok(())
    }
}
