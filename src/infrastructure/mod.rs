pub mod console_notifier;
pub mod discord_notifier;
pub mod fake_fetcher;
pub mod http_fetcher;
