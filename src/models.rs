//! Data models shared by the pipeline stages.
//!
//! - [`HeadlineSet`]: deduplicated headlines handed to the extractor
//! - [`Keyword`]: a normalized search keyword
//! - [`KeywordMetric`]: a keyword scored by volume and saturation
//! - [`Tier`]: qualitative opportunity bucket derived from saturation
//! - [`ExtractionOutcome`]: the typed result of the extraction stage
//! - [`Report`] and [`ArchiveEntry`]: what the report assembler writes and lists

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique, non-empty set of headline strings.
///
/// Only the aggregator constructs one, which is how the non-empty invariant is
/// kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlineSet {
    headlines: Vec<String>,
}

impl HeadlineSet {
    pub(crate) fn from_unique(headlines: Vec<String>) -> Self {
        debug_assert!(!headlines.is_empty());
        Self { headlines }
    }

    pub fn len(&self) -> usize {
        self.headlines.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.headlines.iter().map(String::as_str)
    }

    /// Headlines as `- <headline>` lines, the body embedded into LLM prompts.
    pub fn prompt_body(&self) -> String {
        self.iter()
            .map(|h| format!("- {h}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A search keyword with no whitespace and at least two characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keyword(String);

impl Keyword {
    pub const MIN_CHARS: usize = 2;

    /// Normalize a raw token: trim, drop every whitespace character, and reject
    /// anything shorter than [`Keyword::MIN_CHARS`] characters.
    pub fn parse(raw: &str) -> Option<Keyword> {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.chars().count() < Self::MIN_CHARS {
            return None;
        }
        Some(Keyword(compact))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opportunity tier. Lower saturation means an easier keyword to rank for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    VeryHigh,
    High,
    Medium,
    Low,
}

impl Tier {
    pub fn from_saturation(saturation: f64) -> Tier {
        if saturation <= 0.3 {
            Tier::VeryHigh
        } else if saturation <= 0.5 {
            Tier::High
        } else if saturation <= 1.0 {
            Tier::Medium
        } else {
            Tier::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::VeryHigh => "매우높음",
            Tier::High => "높음",
            Tier::Medium => "보통",
            Tier::Low => "낮음",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Tier::VeryHigh => "tier-very-high",
            Tier::High => "tier-high",
            Tier::Medium => "tier-medium",
            Tier::Low => "tier-low",
        }
    }
}

/// Scored keyword. Built once per keyword per run by the metric resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordMetric {
    pub keyword: Keyword,
    pub monthly_search_volume: u64,
    pub blog_document_count: u64,
    pub saturation: f64,
    pub tier: Tier,
}

/// Which extraction contract a run uses. Chosen by configuration only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Structured keyword list, scored by the metric resolver.
    #[default]
    Keywords,
    /// Free-text HTML narrative written by the LLM.
    Narrative,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Keywords => f.write_str("keywords"),
            RunMode::Narrative => f.write_str("narrative"),
        }
    }
}

/// Successful result of the extraction stage.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Keywords(Vec<Keyword>),
    Narrative(String),
}

/// One generated report, ready to be written.
#[derive(Debug, Clone)]
pub struct Report {
    pub generated_at: NaiveDateTime,
    pub body_html: String,
    /// Up to three short keywords naming this report in the archive.
    pub archive_keywords: Vec<String>,
}

/// A past report found in the archive directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// `None` when the filename could not be parsed.
    pub timestamp: Option<NaiveDateTime>,
    pub top_keywords: Vec<String>,
    pub file_name: String,
}

impl ArchiveEntry {
    /// `2026년 01월 02일 18:24`, or the raw filename when unparseable.
    pub fn display_date(&self) -> String {
        match self.timestamp {
            Some(ts) => ts.format("%Y년 %m월 %d일 %H:%M").to_string(),
            None => self.file_name.clone(),
        }
    }
}
