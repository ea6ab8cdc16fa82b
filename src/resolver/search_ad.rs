//! Monthly search volume from the Naver search-ad `keywordstool` API.
//!
//! Every request is signed: `X-Signature` is the base64 HMAC-SHA256 of
//! `"{timestamp}.{method}.{path}"` keyed by the client secret, sent together
//! with `X-Timestamp`, `X-API-KEY` and `X-Customer`.

use crate::config::{ResolverSettings, SearchAdSettings};
use crate::error::MetricError;
use crate::models::Keyword;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const KEYWORDSTOOL_PATH: &str = "/keywordstool";

/// Volume assigned to placeholder counts such as `"< 10"`.
const PLACEHOLDER_VOLUME: u64 = 10;

#[derive(Clone)]
struct Credentials {
    api_key: String,
    secret: String,
    customer_id: String,
}

/// Naver search-ad `keywordstool` client.
///
/// Requests are signed per call and batched, `batch_size` keywords per
/// request, with `batch_delay` between batches. Without all three
/// credentials no request is made.
pub struct SearchAdClient<'a> {
    http: &'a reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
    batch_size: usize,
    batch_delay: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeywordToolResponse {
    #[serde(default)]
    keyword_list: Vec<KeywordToolEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeywordToolEntry {
    rel_keyword: String,
    #[serde(default)]
    monthly_pc_qc_cnt: Option<Value>,
    #[serde(default)]
    monthly_mobile_qc_cnt: Option<Value>,
}

impl KeywordToolEntry {
    fn volume(&self) -> u64 {
        count_value(self.monthly_pc_qc_cnt.as_ref()) + count_value(self.monthly_mobile_qc_cnt.as_ref())
    }
}

impl<'a> SearchAdClient<'a> {
    /// # Arguments
    ///
    /// * `http` - The run's shared HTTP client
    /// * `settings` - Base URL and credentials
    /// * `resolver` - Batch size and delay
    pub fn new(
        http: &'a reqwest::Client,
        settings: &SearchAdSettings,
        resolver: &ResolverSettings,
    ) -> Self {
        let credentials = match (&settings.api_key, &settings.secret, &settings.customer_id) {
            (Some(api_key), Some(secret), Some(customer_id)) => Some(Credentials {
                api_key: api_key.clone(),
                secret: secret.clone(),
                customer_id: customer_id.clone(),
            }),
            _ => None,
        };
        Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            credentials,
            batch_size: resolver.batch_size.max(1),
            batch_delay: Duration::from_millis(resolver.batch_delay_ms),
        }
    }

    /// Look up the monthly volume of every keyword, in input order.
    ///
    /// Keywords the API did not report, or whose batch failed, resolve to 0.
    #[instrument(level = "info", skip_all, fields(keywords = keywords.len(), batch_size = self.batch_size))]
    pub async fn monthly_volumes(&self, keywords: &[Keyword]) -> Vec<u64> {
        let Some(credentials) = &self.credentials else {
            warn!(
                error = %MetricError::MissingCredentials("NAVER_AD_CLIENT_ID/SECRET/CUSTOMER_ID"),
                "Search volume lookup disabled; every keyword resolves to 0"
            );
            return vec![0; keywords.len()];
        };

        let mut volumes = Vec::with_capacity(keywords.len());
        for (i, batch) in keywords.chunks(self.batch_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(self.batch_delay).await;
            }
            match self.fetch_batch(credentials, batch).await {
                Ok(found) => {
                    debug!(batch = i, returned = found.len(), "Volume batch resolved");
                    volumes.extend(
                        batch
                            .iter()
                            .map(|kw| found.get(&match_key(kw.as_str())).copied().unwrap_or(0)),
                    );
                }
                Err(e) => {
                    warn!(batch = i, size = batch.len(), error = %e, "Volume batch failed; using 0");
                    volumes.extend(std::iter::repeat_n(0, batch.len()));
                }
            }
        }

        let resolved = volumes.iter().filter(|v| **v > 0).count();
        info!(resolved, "Resolved search volumes");
        volumes
    }

    async fn fetch_batch(
        &self,
        credentials: &Credentials,
        batch: &[Keyword],
    ) -> Result<HashMap<String, u64>, MetricError> {
        let hint = batch.iter().map(Keyword::as_str).collect::<Vec<_>>().join(",");
        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        let signature = sign(&credentials.secret, &timestamp, "GET", KEYWORDSTOOL_PATH)?;

        let response = self
            .http
            .get(format!("{}{KEYWORDSTOOL_PATH}", self.base_url))
            .query(&[("hintKeywords", hint.as_str()), ("showDetail", "1")])
            .header("X-Timestamp", &timestamp)
            .header("X-API-KEY", &credentials.api_key)
            .header("X-Customer", &credentials.customer_id)
            .header("X-Signature", signature)
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

        let parsed: KeywordToolResponse = response.json().await?;
        let mut found = HashMap::new();
        for entry in &parsed.keyword_list {
            found
                .entry(match_key(&entry.rel_keyword))
                .or_insert_with(|| entry.volume());
        }
        Ok(found)
    }
}

/// Base64 HMAC-SHA256 over `"{timestamp}.{method}.{path}"`.
pub fn sign(secret: &str, timestamp: &str, method: &str, path: &str) -> Result<String, MetricError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| MetricError::Signature(e.to_string()))?;
    mac.update(format!("{timestamp}.{method}.{path}").as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Numeric counts pass through; strings such as `"< 10"` become a small constant.
fn count_value(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f.round() as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(PLACEHOLDER_VOLUME),
        _ => 0,
    }
}

fn match_key(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
