use std::time::Duration;

use async_trait::async_trait;

use crate::application::{AppError, AppResult, Fetcher};

/// Fetches a resource body over HTTP. Non-2xx statuses are fetch errors.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// `timeout` bounds the whole request, connect included, so a stalled
    /// fetch cannot occupy its watch's tick indefinitely.
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dibsy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Fetch(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> AppResult<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::Fetch(e.to_string()))?;

        resp.text().await.map_err(|e| AppError::Fetch(e.to_string()))
    }
}
