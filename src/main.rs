use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use dibsy::application::{Engine, Notifier, WatchRegistry};
use dibsy::infrastructure::{
    console_notifier::ConsoleNotifier, discord_notifier::DiscordNotifier,
    http_fetcher::HttpFetcher,
};
use dibsy::interfaces::config::Config;

#[derive(Parser, Debug)]
#[command(name = "dibsy")]
struct Args {
    /// Path to the watch config
    #[arg(long, default_value = "dibsy.yaml")]
    config: String,

    /// Print notifications to stdout instead of sending them to Discord
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("dibsy=info".parse().unwrap()),
        )
        .init();
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_path(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env"));
    }
    let args = Args::parse();

    let cfg = match Config::load_from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    let specs = match cfg.to_watch_specs() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Invalid watch in config: {e}");
            std::process::exit(1);
        }
    };

    let fetcher = match HttpFetcher::new(Duration::from_secs(cfg.fetch_timeout_seconds)) {
        Ok(f) => f,
        Err(e) => {
            tracing::error!("Failed to build HTTP client: {e}");
            std::process::exit(1);
        }
    };

    let notifier: Arc<dyn Notifier> = if args.dry_run {
        tracing::warn!("--dry-run enabled: notifications go to stdout only");
        Arc::new(ConsoleNotifier::new())
    } else {
        let token = match std::env::var("DISCORD_BOT_TOKEN") {
            Ok(t) => t,
            Err(_) => {
                tracing::error!("DISCORD_BOT_TOKEN not set");
                std::process::exit(1);
            }
        };
        Arc::new(DiscordNotifier::new(token, cfg.notify_channel.clone()))
    };

    let registry = WatchRegistry::new();
    let engine = Engine::new(registry, Arc::new(fetcher), notifier);

    let watch_count = specs.len();
    for spec in specs {
        let name = spec.name.clone();
        if let Err(e) = engine.watch(spec) {
            tracing::error!("Failed to schedule watch {name}: {e}");
            std::process::exit(1);
        }
    }

    tracing::info!(watches = watch_count, "dibsy started");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }

    tracing::info!("shutting down");
    engine
        .close(Duration::from_secs(cfg.shutdown_grace_seconds))
        .await;
}
