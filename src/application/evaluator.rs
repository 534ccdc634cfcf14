use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::domain::{MatchedElement, WatchKind, WatchSpec};

use super::{AppError, AppResult, Fetcher, WatchRegistry};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Evaluation {
    Match,
    NoMatch,
}

/// Strategy deciding whether a freshly fetched resource triggers a watch.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, spec: &WatchSpec) -> AppResult<Evaluation>;
}

/// Selects elements by CSS selector and tests the watch condition against
/// each matched element.
pub struct HtmlEvaluator {
    fetcher: Arc<dyn Fetcher>,
}

impl HtmlEvaluator {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Evaluator for HtmlEvaluator {
    async fn evaluate(&self, spec: &WatchSpec) -> AppResult<Evaluation> {
        let WatchKind::Html {
            selector,
            condition,
        } = &spec.kind
        else {
            return Err(AppError::Config(format!(
                "watch {} is not an html watch",
                spec.name
            )));
        };

        let body = self.fetcher.fetch(&spec.url).await?;
        let elements = select_elements(&body, selector)?;

        // First satisfying element wins; later elements are not evaluated.
        for element in &elements {
            if condition.matches(element) {
                return Ok(Evaluation::Match);
            }
        }
        Ok(Evaluation::NoMatch)
    }
}

/// The parsed document stays confined to this helper so evaluator futures
/// remain `Send`.
fn select_elements(body: &str, selector: &str) -> AppResult<Vec<MatchedElement>> {
    let selector = Selector::parse(selector)
        .map_err(|e| AppError::Config(format!("invalid selector {selector:?}: {e}")))?;
    let document = Html::parse_document(body);
    Ok(document
        .select(&selector)
        .map(|node| {
            let mut element = MatchedElement::new(node.text().collect::<String>());
            for (name, value) in node.value().attrs() {
                element.attrs.insert(name.to_string(), value.to_string());
            }
            element
        })
        .collect())
}

/// Compares the fetched body against the first successfully captured one.
pub struct DiffEvaluator {
    fetcher: Arc<dyn Fetcher>,
    registry: WatchRegistry,
}

impl DiffEvaluator {
    pub fn new(fetcher: Arc<dyn Fetcher>, registry: WatchRegistry) -> Self {
        Self { fetcher, registry }
    }
}

#[async_trait]
impl Evaluator for DiffEvaluator {
    async fn evaluate(&self, spec: &WatchSpec) -> AppResult<Evaluation> {
        // A fetch failure leaves any existing baseline untouched.
        let body = self.fetcher.fetch(&spec.url).await?;

        match self.registry.baseline(&spec.name)? {
            None => {
                // The first successful fetch only establishes the reference
                // point; it never matches.
                self.registry.set_baseline(&spec.name, body)?;
                Ok(Evaluation::NoMatch)
            }
            Some(baseline) if body == baseline => Ok(Evaluation::NoMatch),
            Some(_) => Ok(Evaluation::Match),
        }
    }
}
