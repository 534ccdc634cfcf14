use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::application::{AppError, AppResult, Fetcher};

/// Scripted fetcher for tests: yields each response in turn, then keeps
/// repeating the final one. `Err` entries become fetch errors.
pub struct FakeFetcher {
    responses: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A fetcher that always succeeds with the same body.
    pub fn body(body: &str) -> Self {
        Self::new(vec![Ok(body.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, _url: &str) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self
            .responses
            .lock()
            .map_err(|_| AppError::Fetch("lock poisoned".into()))?;

        let response = if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().cloned()
        };

        match response {
            Some(Ok(body)) => Ok(body),
            Some(Err(message)) => Err(AppError::Fetch(message)),
            None => Err(AppError::Fetch("no scripted response".into())),
        }
    }
}
