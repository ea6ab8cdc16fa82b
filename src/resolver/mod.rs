//! Keyword metrics: search volume, blog saturation and opportunity tier.
//!
//! Resolution runs in a fixed order so that the expensive per-keyword calls
//! are capped:
//!
//! 1. batched volume lookup for every keyword ([`search_ad`]);
//! 2. zero-volume keywords dropped (configurable);
//! 3. top-N by volume kept;
//! 4. one paced document-count lookup per remaining keyword ([`blog_search`]);
//! 5. scoring and ranking ([`scoring`]).
//!
//! Nothing here fails the run. Sub-call failures turn into zero values.

pub mod blog_search;
pub mod scoring;
pub mod search_ad;

use crate::config::ResolverSettings;
use crate::models::{Keyword, KeywordMetric};
use blog_search::BlogSearchClient;
use futures::StreamExt;
use futures::stream;
use search_ad::SearchAdClient;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Turns extracted keywords into ranked [`KeywordMetric`] records.
///
/// Volumes are looked up for every keyword; document counts only for the
/// `top_n` keywords by volume, since they cost one request each.
pub struct MetricResolver<'a> {
    volumes: SearchAdClient<'a>,
    documents: BlogSearchClient<'a>,
    top_n: usize,
    exclude_zero_volume: bool,
    document_delay: Duration,
}

impl<'a> MetricResolver<'a> {
    /// # Arguments
    ///
    /// * `volumes` - Monthly search volume source
    /// * `documents` - Blog document count source
    /// * `settings` - `top_n`, the zero-volume policy and the document pacing
    pub fn new(
        volumes: SearchAdClient<'a>,
        documents: BlogSearchClient<'a>,
        settings: &ResolverSettings,
    ) -> Self {
        Self {
            volumes,
            documents,
            top_n: settings.top_n,
            exclude_zero_volume: settings.exclude_zero_volume,
            document_delay: Duration::from_millis(settings.document_delay_ms),
        }
    }

    /// Score `keywords` and return them ranked ascending by saturation.
    ///
    /// # Returns
    ///
    /// At most `top_n` metrics. Never fails: lookups that fail count as 0.
    #[instrument(level = "info", skip_all, fields(keywords = keywords.len()))]
    pub async fn resolve(&self, keywords: &[Keyword]) -> Vec<KeywordMetric> {
        let volumes = self.volumes.monthly_volumes(keywords).await;

        let mut candidates: Vec<(&Keyword, u64)> = keywords.iter().zip(volumes).collect();
        if self.exclude_zero_volume {
            let before = candidates.len();
            candidates.retain(|(_, volume)| *volume > 0);
            let dropped = before - candidates.len();
            if dropped > 0 {
                info!(dropped, "Excluded keywords without search volume");
            }
        }

        // Stable, so equal volumes keep extraction order.
        candidates.sort_by(|a, b| b.1.cmp(&a.1));
        candidates.truncate(self.top_n);

        let documents = self.document_counts(&candidates).await;

        let metrics = candidates
            .into_iter()
            .zip(documents)
            .map(|((keyword, volume), docs)| scoring::score(keyword.clone(), volume, docs))
            .collect();
        let ranked = scoring::rank(metrics);
        info!(ranked = ranked.len(), "Resolved keyword metrics");
        ranked
    }

    async fn document_counts(&self, candidates: &[(&Keyword, u64)]) -> Vec<u64> {
        if !self.documents.is_configured() {
            warn!("Blog search credentials missing; document counts resolve to 0");
            return vec![0; candidates.len()];
        }

        let delay = self.document_delay;
        stream::iter(candidates.iter().enumerate())
            .then(|(i, (keyword, _))| async move {
                if i > 0 {
                    tokio::time::sleep(delay).await;
                }
                self.documents.document_count(keyword).await
            })
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BlogSearchSettings, SearchAdSettings};
    use crate::models::Tier;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    /// Search-ad fake with a fixed volume table.
    struct Volumes;

    impl Respond for Volumes {
        fn respond(&self, _request: &Request) -> ResponseTemplate {
            ResponseTemplate::new(200).set_body_json(json!({
                "keywordList": [
                    {"relKeyword": "금값전망", "monthlyPcQcCnt": 400, "monthlyMobileQcCnt": 600},
                    {"relKeyword": "환율급등", "monthlyPcQcCnt": 1500, "monthlyMobileQcCnt": 2500},
                    {"relKeyword": "청년월세", "monthlyPcQcCnt": "< 10", "monthlyMobileQcCnt": 90},
                    {"relKeyword": "무명키워드", "monthlyPcQcCnt": 0, "monthlyMobileQcCnt": 0}
                ]
            }))
        }
    }

    /// Blog-search fake answering per query.
    struct Documents;

    impl Respond for Documents {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let query = request
                .url
                .query_pairs()
                .find(|(k, _)| k == "query")
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default();
            let total = match query.as_str() {
                "금값전망" => 500,
                "환율급등" => 8000,
                "청년월세" => 10,
                _ => 0,
            };
            ResponseTemplate::new(200).set_body_json(json!({ "total": total }))
        }
    }

    async fn mock_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/keywordstool"))
            .respond_with(Volumes)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/search/blog.json"))
            .respond_with(Documents)
            .mount(&server)
            .await;
        server
    }

    fn keywords(items: &[&str]) -> Vec<Keyword> {
        items.iter().map(|s| Keyword::parse(s).unwrap()).collect()
    }

    async fn resolve_with(
        server: &MockServer,
        settings: ResolverSettings,
        input: &[Keyword],
    ) -> Vec<KeywordMetric> {
        let http = reqwest::Client::new();
        let search_ad = SearchAdSettings {
            base_url: server.uri(),
            api_key: Some("k".to_string()),
            secret: Some("s".to_string()),
            customer_id: Some("c".to_string()),
        };
        let blog = BlogSearchSettings {
            base_url: server.uri(),
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
        };
        let resolver = MetricResolver::new(
            SearchAdClient::new(&http, &search_ad, &settings),
            BlogSearchClient::new(&http, &blog),
            &settings,
        );
        resolver.resolve(input).await
    }

    fn fast() -> ResolverSettings {
        ResolverSettings {
            batch_delay_ms: 0,
            document_delay_ms: 0,
            ..ResolverSettings::default()
        }
    }

    fn blog_requests(requests: &[Request]) -> usize {
        requests
            .iter()
            .filter(|r| r.url.path() == "/v1/search/blog.json")
            .count()
    }

    #[tokio::test]
    async fn test_resolve_ranks_and_excludes_zero_volume() {
        let server = mock_server().await;
        let input = keywords(&["환율급등", "무명키워드", "금값전망", "청년월세"]);
        let ranked = resolve_with(&server, fast(), &input).await;

        let order: Vec<&str> = ranked.iter().map(|m| m.keyword.as_str()).collect();
        assert_eq!(order, vec!["청년월세", "금값전망", "환율급등"]);

        assert_eq!(ranked[0].monthly_search_volume, 100);
        assert_eq!(ranked[0].saturation, 0.1);
        assert_eq!(ranked[0].tier, Tier::VeryHigh);
        assert_eq!(ranked[1].saturation, 0.5);
        assert_eq!(ranked[1].tier, Tier::High);
        assert_eq!(ranked[2].saturation, 2.0);
        assert_eq!(ranked[2].tier, Tier::Low);

        // Zero-volume keywords never reach the document lookup.
        let requests = server.received_requests().await.unwrap();
        assert_eq!(blog_requests(&requests), 3);
    }

    #[tokio::test]
    async fn test_resolve_keeps_zero_volume_when_configured() {
        let server = mock_server().await;
        let settings = ResolverSettings {
            exclude_zero_volume: false,
            ..fast()
        };
        let ranked = resolve_with(&server, settings, &keywords(&["무명키워드", "금값전망"])).await;
        assert_eq!(ranked.len(), 2);
        let last = ranked.last().unwrap();
        assert_eq!(last.keyword.as_str(), "무명키워드");
        assert_eq!(last.saturation, scoring::UNSCOREABLE);
        assert_eq!(last.tier, Tier::Low);
    }

    #[tokio::test]
    async fn test_top_n_selects_by_volume_before_document_lookup() {
        let server = mock_server().await;
        let settings = ResolverSettings { top_n: 2, ..fast() };
        let ranked = resolve_with(
            &server,
            settings,
            &keywords(&["청년월세", "금값전망", "환율급등"]),
        )
        .await;

        // 청년월세 has the best saturation but the lowest volume.
        let order: Vec<&str> = ranked.iter().map(|m| m.keyword.as_str()).collect();
        assert_eq!(order, vec!["금값전망", "환율급등"]);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(blog_requests(&requests), 2);
    }

    #[tokio::test]
    async fn test_ranked_output_is_sorted() {
        let server = mock_server().await;
        let ranked = resolve_with(
            &server,
            fast(),
            &keywords(&["금값전망", "환율급등", "청년월세"]),
        )
        .await;
        assert_eq!(ranked.len(), 3);
        assert!(ranked.windows(2).all(|w| w[0].saturation <= w[1].saturation));
    }
}
