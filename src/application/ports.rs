use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error("schedule error: {0}")]
    Schedule(String),
    #[error("duplicate watch: {0}")]
    DuplicateWatch(String),
    #[error("fetch error: {0}")]
    Fetch(String),
    #[error("notifier error: {0}")]
    Notifier(String),
    #[error("registry error: {0}")]
    Registry(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// Retrieve the body of a resource. Retry and timeout policy belong to the
/// caller and the adapter respectively, not to this trait.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> AppResult<String>;
}

/// Deliver a notification to the single configured destination.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> AppResult<()>;
}
