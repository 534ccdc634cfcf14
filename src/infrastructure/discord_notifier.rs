use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;

use crate::application::{AppError, AppResult, Notifier};

const API_BASE: &str = "https://discord.com/api/v10";

/// Posts notifications to a single Discord channel through the REST API.
pub struct DiscordNotifier {
    client: reqwest::Client,
    token: String,
    channel_id: String,
    api_base: String,
}

impl DiscordNotifier {
    pub fn new(token: String, channel_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            channel_id,
            api_base: API_BASE.to_string(),
        }
    }

    /// Point at a different API root. Used by tests.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, text: &str) -> AppResult<()> {
        let url = format!("{}/channels/{}/messages", self.api_base, self.channel_id);

        self.client
            .post(&url)
            .header(AUTHORIZATION, format!("Bot {}", self.token))
            .json(&CreateMessage { content: text })
            .send()
            .await
            .map_err(|e| AppError::Notifier(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::Notifier(e.to_string()))?;

        Ok(())
    }
}
