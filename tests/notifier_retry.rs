use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use dibsy::application::{AppError, AppResult, Engine, Notifier, WatchRegistry};
use dibsy::domain::{Condition, WatchKind, WatchSpec};
use dibsy::infrastructure::fake_fetcher::FakeFetcher;

#[derive(Default)]
struct FailingNotifier {
    attempts: AtomicUsize,
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _text: &str) -> AppResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AppError::Notifier("channel unavailable".into()))
    }
}

#[derive(Default)]
struct OkNotifier {
    attempts: AtomicUsize,
}

#[async_trait]
impl Notifier for OkNotifier {
    async fn notify(&self, _text: &str) -> AppResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

const IN_STOCK: &str = r#"<html><body><span class="stock">In Stock</span></body></html>"#;

fn stock_watch() -> WatchSpec {
    WatchSpec {
        name: "ps5-stock".into(),
        url: "https://shop.example/ps5".into(),
        message: "PS5 back in stock".into(),
        interval: Duration::from_secs(60),
        kind: WatchKind::Html {
            selector: ".stock".into(),
            condition: Condition::parse(r#"ieq(text, "in stock")"#).unwrap(),
        },
    }
}

// Delivery policy on a match: three attempts, then the watch is removed
// whether or not any attempt succeeded (at-most-once delivery).
#[tokio::test]
async fn failed_delivery_is_retried_then_the_watch_is_still_removed() {
    let fetcher = Arc::new(FakeFetcher::body(IN_STOCK));
    let notifier = Arc::new(FailingNotifier::default());
    let registry = WatchRegistry::new();
    let engine = Engine::new(registry.clone(), fetcher, notifier.clone());

    registry.register("ps5-stock").unwrap();
    engine.tick(&stock_watch()).await;

    assert_eq!(notifier.attempts.load(Ordering::SeqCst), 3);
    assert!(!registry.is_active("ps5-stock"));
}

#[tokio::test]
async fn successful_delivery_uses_a_single_attempt() {
    let fetcher = Arc::new(FakeFetcher::body(IN_STOCK));
    let notifier = Arc::new(OkNotifier::default());
    let registry = WatchRegistry::new();
    let engine = Engine::new(registry.clone(), fetcher, notifier.clone());

    registry.register("ps5-stock").unwrap();
    engine.tick(&stock_watch()).await;

    assert_eq!(notifier.attempts.load(Ordering::SeqCst), 1);
    assert!(!registry.is_active("ps5-stock"));
}
