//! Naver daily popular ranking scraper.
//!
//! The ranking page groups articles into one box per press. Only the
//! first-ranked article of each box is kept, formatted `[<press>] <title>`.
//! Longer titles carry more keyword material, so results are ordered by length
//! before the cap is applied.

use super::{HeadlineSource, SelectorStrategy, extract_with_strategies, fetch_text};
use crate::config::CollectorSettings;
use crate::error::CollectError;
use tracing::{info, instrument};

const STRATEGIES: &[SelectorStrategy] = &[
    SelectorStrategy {
        name: "ranking-box",
        block: ".rankingnews_box",
        label: Some(".rankingnews_name"),
        title: ".list_content > li > a, .rankingnews_list .list_content > a",
    },
    SelectorStrategy {
        name: "ranking-box-list-title",
        block: ".rankingnews_box",
        label: Some(".rankingnews_name"),
        title: ".list_title",
    },
];

/// Naver "most viewed by press" ranking page.
#[derive(Debug, Clone)]
pub struct NaverRanking {
    url: String,
    limit: usize,
}

impl NaverRanking {
    pub fn new(settings: &CollectorSettings) -> Self {
        Self {
            url: settings.naver_ranking_url.clone(),
            limit: settings.naver_limit,
        }
    }
}

impl HeadlineSource for NaverRanking {
    fn name(&self) -> &'static str {
        "naver"
    }

    #[instrument(level = "info", skip_all, fields(url = %self.url))]
    async fn fetch(&self, http: &reqwest::Client) -> Result<Vec<String>, CollectError> {
        let html = fetch_text(http, &self.url).await?;
        let headlines = parse_ranking(&html, self.limit);
        if headlines.is_empty() {
            return Err(CollectError::MarkupDrift);
        }
        info!(count = headlines.len(), "Parsed Naver ranking");
        Ok(headlines)
    }
}

/// Extract per-press top headlines, longest first, capped at `limit`.
pub fn parse_ranking(html: &str, limit: usize) -> Vec<String> {
    let mut headlines = extract_with_strategies(html, STRATEGIES, "네이버");
    // Stable sort keeps page order among equal lengths.
    headlines.sort_by_key(|h| std::cmp::Reverse(h.chars().count()));
    headlines.truncate(limit);
    headlines
}
