//! Government policy briefing feed (data.go.kr `policyNewsService`).
//!
//! The API answers with XML containing repeated `<item>` elements, each with a
//! `<title>`. Titles announcing a benefit (support, application, refunds, ...)
//! are the most searchable, so those are always kept; the first few other
//! titles are kept as well so the source is never silent on a quiet day.

use super::HeadlineSource;
use crate::config::CollectorSettings;
use crate::error::CollectError;
use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use tracing::{debug, info, instrument};
use url::Url;

const LABEL: &str = "정부정책";
const BENEFIT_TERMS: &[&str] = &["지원", "신청", "지급", "환급", "무료", "개시", "특가"];

#[derive(Debug, Clone)]
pub struct PolicyBriefing {
    url: String,
    rows: u32,
    min_items: usize,
    api_key: Option<String>,
}

impl PolicyBriefing {
    pub fn new(settings: &CollectorSettings) -> Self {
        Self {
            url: settings.policy_url.clone(),
            rows: settings.policy_rows,
            min_items: settings.policy_min_items,
            api_key: settings.policy_api_key.clone(),
        }
    }
}

impl HeadlineSource for PolicyBriefing {
    fn name(&self) -> &'static str {
        "policy"
    }

    #[instrument(level = "info", skip_all)]
    async fn fetch(&self, http: &reqwest::Client) -> Result<Vec<String>, CollectError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CollectError::MissingCredential("DATA_GO_KR_KEY"))?;

        let rows = self.rows.to_string();
        let url = Url::parse_with_params(
            &self.url,
            [("serviceKey", api_key), ("numOfRows", rows.as_str()), ("pageNo", "1")],
        )?;

        let body = http.get(url).send().await?.error_for_status()?.text().await?;
        let titles = parse_item_titles(&body)?;
        debug!(count = titles.len(), "Parsed policy feed items");

        let headlines = select_policy_headlines(&titles, self.min_items);
        info!(count = headlines.len(), "Selected policy headlines");
        Ok(headlines)
    }
}

/// Keep benefit titles, plus non-benefit titles while fewer than `min_items`
/// headlines have been kept.
pub fn select_policy_headlines(titles: &[String], min_items: usize) -> Vec<String> {
    let mut kept = Vec::new();
    for title in titles {
        let is_benefit = BENEFIT_TERMS.iter().any(|term| title.contains(term));
        if is_benefit || kept.len() < min_items {
            kept.push(format!("[{LABEL}] {title}"));
        }
    }
    kept
}

/// Collect the text of every `<title>` nested in an `<item>`.
pub fn parse_item_titles(xml: &str) -> Result<Vec<String>, CollectError> {
    let mut reader = Reader::from_str(xml);
    let mut titles = Vec::new();
    let mut in_item = false;
    let mut in_title = false;
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"item" => in_item = true,
                b"title" if in_item => {
                    in_title = true;
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"title" if in_title => {
                    in_title = false;
                    let title = current.trim();
                    if !title.is_empty() {
                        titles.push(title.to_string());
                    }
                }
                b"item" => in_item = false,
                _ => {}
            },
            Ok(Event::Text(t)) if in_title => {
                let text = t.decode().map_err(|e| CollectError::Xml(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::CData(c)) if in_title => {
                let text = c.decode().map_err(|e| CollectError::Xml(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::GeneralRef(r)) if in_title => {
                if let Ok(Some(ch)) = r.resolve_char_ref() {
                    current.push(ch);
                } else {
                    let name = r.decode().map_err(|e| CollectError::Xml(e.to_string()))?;
                    match resolve_predefined_entity(&name) {
                        Some(resolved) => current.push_str(resolved),
                        None => {
                            current.push('&');
                            current.push_str(&name);
                            current.push(';');
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(CollectError::Xml(e.to_string())),
            _ => {}
        }
    }

    Ok(titles)
}
