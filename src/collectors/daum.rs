//! Daum news scraper with a backup path.
//!
//! The news home headline list is the primary path. When it yields nothing,
//! whether the fetch failed or the markup changed, the popular ranking page is
//! tried instead.

use super::{HeadlineSource, SelectorStrategy, extract_with_strategies, fetch_text};
use crate::config::CollectorSettings;
use crate::error::CollectError;
use tracing::{info, instrument, warn};

const LABEL: &str = "다음";

const HOME_STRATEGIES: &[SelectorStrategy] = &[
    SelectorStrategy {
        name: "home-headline",
        block: ".list_newsheadline2 > li",
        label: None,
        title: ".tit_txt",
    },
    SelectorStrategy {
        name: "home-issue",
        block: ".list_newsissue > li",
        label: None,
        title: ".tit_g",
    },
];

const RANKING_STRATEGIES: &[SelectorStrategy] = &[
    SelectorStrategy {
        name: "ranking-press",
        block: ".list_news2 > li",
        label: Some(".info_news"),
        title: ".tit_thumb a",
    },
    SelectorStrategy {
        name: "ranking-plain",
        block: ".list_news2 > li",
        label: None,
        title: ".tit_thumb a",
    },
];

/// Daum news home, with the ranking page as backup.
#[derive(Debug, Clone)]
pub struct DaumNews {
    primary_url: String,
    backup_url: String,
    limit: usize,
}

impl DaumNews {
    pub fn new(settings: &CollectorSettings) -> Self {
        Self {
            primary_url: settings.daum_url.clone(),
            backup_url: settings.daum_backup_url.clone(),
            limit: settings.daum_limit,
        }
    }

    async fn fetch_page(
        &self,
        http: &reqwest::Client,
        url: &str,
        strategies: &[SelectorStrategy],
    ) -> Result<Vec<String>, CollectError> {
        let html = fetch_text(http, url).await?;
        let mut headlines = extract_with_strategies(&html, strategies, LABEL);
        headlines.truncate(self.limit);
        Ok(headlines)
    }
}

impl HeadlineSource for DaumNews {
    fn name(&self) -> &'static str {
        "daum"
    }

    #[instrument(level = "info", skip_all)]
    async fn fetch(&self, http: &reqwest::Client) -> Result<Vec<String>, CollectError> {
        match self.fetch_page(http, &self.primary_url, HOME_STRATEGIES).await {
            Ok(headlines) if !headlines.is_empty() => {
                info!(count = headlines.len(), path = "primary", "Parsed Daum headlines");
                return Ok(headlines);
            }
            Ok(_) => warn!(url = %self.primary_url, "Daum primary page matched nothing; trying backup"),
            Err(e) => warn!(url = %self.primary_url, error = %e, "Daum primary fetch failed; trying backup"),
        }

        let headlines = self
            .fetch_page(http, &self.backup_url, RANKING_STRATEGIES)
            .await?;
        if headlines.is_empty() {
            return Err(CollectError::MarkupDrift);
        }
        info!(count = headlines.len(), path = "backup", "Parsed Daum headlines");
        Ok(headlines)
    }
}
