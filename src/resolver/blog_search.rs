//! Indexed blog document counts from the Naver open search API.

use crate::config::BlogSearchSettings;
use crate::error::MetricError;
use crate::models::Keyword;
use serde::Deserialize;
use tracing::{debug, warn};

/// Blog search client; only the `total` of each response is used.
pub struct BlogSearchClient<'a> {
    http: &'a reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct BlogSearchResponse {
    #[serde(default)]
    total: u64,
}

impl<'a> BlogSearchClient<'a> {
    pub fn new(http: &'a reqwest::Client, settings: &BlogSearchSettings) -> Self {
        let credentials = match (&settings.client_id, &settings.client_secret) {
            (Some(id), Some(secret)) => Some((id.clone(), secret.clone())),
            _ => None,
        };
        Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// `true` when both the client id and secret are set.
    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Total blog posts matching `keyword`; 0 when the lookup fails.
    pub async fn document_count(&self, keyword: &Keyword) -> u64 {
        match self.try_document_count(keyword).await {
            Ok(total) => {
                debug!(keyword = %keyword, total, "Blog document count");
                total
            }
            Err(e) => {
                warn!(keyword = %keyword, error = %e, "Blog search failed; using 0");
                0
            }
        }
    }

    async fn try_document_count(&self, keyword: &Keyword) -> Result<u64, MetricError> {
        let (client_id, client_secret) = self
            .credentials
            .as_ref()
            .ok_or(MetricError::MissingCredentials("NAVER_CLIENT_ID/SECRET"))?;

        let response = self
            .http
            .get(format!("{}/v1/search/blog.json", self.base_url))
            .query(&[("query", keyword.as_str()), ("display", "1")])
            .header("X-Naver-Client-Id", client_id)
            .header("X-Naver-Client-Secret", client_secret)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MetricError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: BlogSearchResponse = response.json().await?;
        Ok(parsed.total)
    }
}
