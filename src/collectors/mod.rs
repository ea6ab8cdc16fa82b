//! Headline collectors for the fixed set of news sources.
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Naver ranking | [`naver`] | HTML scraping | First-ranked article per press |
//! | Policy briefing | [`policy`] | XML API | Needs a data.go.kr key |
//! | Daum news | [`daum`] | HTML scraping | Home page with ranking page backup |
//!
//! Every collector implements [`HeadlineSource`]. The orchestrator never calls
//! `fetch` directly; it goes through [`run_source`], which turns every failure
//! into an empty result with a logged warning.
//!
//! HTML collectors describe their markup as an ordered list of
//! [`SelectorStrategy`] values. Strategies are tried in order and the first one
//! producing headlines wins, so markup drift degrades to a fallback or to an
//! empty result instead of an error.

pub mod daum;
pub mod naver;
pub mod policy;

use crate::config::HttpSettings;
use crate::error::CollectError;
use scraper::{ElementRef, Html, Selector};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// A source of raw headline strings.
pub trait HeadlineSource {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Fetch headlines. Output is already capped by the collector.
    async fn fetch(&self, http: &reqwest::Client) -> Result<Vec<String>, CollectError>;
}

/// Run one collector, downgrading any failure to an empty result.
#[instrument(level = "info", skip_all, fields(source = source.name()))]
pub async fn run_source<S: HeadlineSource>(source: &S, http: &reqwest::Client) -> Vec<String> {
    let t0 = Instant::now();
    match source.fetch(http).await {
        Ok(headlines) if headlines.is_empty() => {
            warn!(
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "Source returned no headlines; skipping"
            );
            headlines
        }
        Ok(headlines) => {
            info!(
                count = headlines.len(),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "Collected headlines"
            );
            debug!(headlines = ?headlines, "Collected headline list");
            headlines
        }
        Err(e) => {
            warn!(
                error = %e,
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "Source failed; skipping"
            );
            Vec::new()
        }
    }
}

/// Build the single HTTP client shared by every outbound call of a run.
pub fn build_http_client(settings: &HttpSettings) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(settings.user_agent.clone())
        .timeout(Duration::from_secs(settings.timeout_secs))
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .build()
}

/// GET a page and return its body, treating non-2xx statuses as errors.
pub(crate) async fn fetch_text(http: &reqwest::Client, url: &str) -> Result<String, CollectError> {
    let body = http.get(url).send().await?.error_for_status()?.text().await?;
    Ok(body)
}

/// One way of reading headlines out of a page.
///
/// Each element matching `block` yields at most one headline: the text of the
/// first `title` match inside it, prefixed by the text of the first `label`
/// match (or the collector's default label).
#[derive(Debug, Clone, Copy)]
pub struct SelectorStrategy {
    pub name: &'static str,
    pub block: &'static str,
    pub label: Option<&'static str>,
    pub title: &'static str,
}

/// Try `strategies` in order; return the first non-empty extraction.
pub fn extract_with_strategies(
    html: &str,
    strategies: &[SelectorStrategy],
    default_label: &str,
) -> Vec<String> {
    let document = Html::parse_document(html);
    for strategy in strategies {
        let headlines = apply_strategy(&document, strategy, default_label);
        if !headlines.is_empty() {
            debug!(strategy = strategy.name, count = headlines.len(), "Strategy matched");
            return headlines;
        }
        debug!(strategy = strategy.name, "Strategy matched nothing");
    }
    Vec::new()
}

fn apply_strategy(document: &Html, strategy: &SelectorStrategy, default_label: &str) -> Vec<String> {
    let (Ok(block), Ok(title)) = (
        Selector::parse(strategy.block),
        Selector::parse(strategy.title),
    ) else {
        warn!(strategy = strategy.name, "Invalid selector; skipping strategy");
        return Vec::new();
    };
    let label = match strategy.label.map(Selector::parse) {
        Some(Ok(sel)) => Some(sel),
        Some(Err(_)) => {
            warn!(strategy = strategy.name, "Invalid label selector; skipping strategy");
            return Vec::new();
        }
        None => None,
    };

    let mut headlines = Vec::new();
    for element in document.select(&block) {
        let Some(title_text) = element.select(&title).next().map(element_text) else {
            continue;
        };
        if title_text.is_empty() {
            continue;
        }
        let label_text = match &label {
            Some(sel) => match element.select(sel).next().map(element_text) {
                Some(text) if !text.is_empty() => text,
                // A labelled block without its label is not a headline block.
                _ => continue,
            },
            None => default_label.to_string(),
        };
        headlines.push(format!("[{label_text}] {title_text}"));
    }
    headlines
}

/// Element text with whitespace runs collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
