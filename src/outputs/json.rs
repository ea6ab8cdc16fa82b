//! Machine-readable snapshot of the latest run.
//!
//! Written next to the HTML report as `keywords.json`:
//!
//! ```text
//! {
//!   "generated_at": "2026-01-02T18:24:00",
//!   "mode": "keywords",
//!   "headline_count": 42,
//!   "keywords": ["종각역사고", ...],
//!   "metrics": [{"keyword": "...", "monthly_search_volume": 1000, ...}]
//! }
//! ```
//!
//! Unlike the HTML report, the snapshot is not archived; each run replaces it.

use crate::error::ReportError;
use crate::models::{Keyword, KeywordMetric, RunMode};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::Path;
use tracing::{info, instrument};

/// Serialized form of one run.
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    /// Local time, `YYYY-MM-DDTHH:MM:SS`
    pub generated_at: String,
    pub mode: RunMode,
    /// Headlines left after aggregation
    pub headline_count: usize,
    /// Extracted keywords in reply order; empty in narrative mode
    pub keywords: &'a [Keyword],
    /// Ranked metrics; empty in narrative mode
    pub metrics: &'a [KeywordMetric],
}

impl<'a> Snapshot<'a> {
    pub fn new(
        generated_at: NaiveDateTime,
        mode: RunMode,
        headline_count: usize,
        keywords: &'a [Keyword],
        metrics: &'a [KeywordMetric],
    ) -> Self {
        Self {
            generated_at: generated_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            mode,
            headline_count,
            keywords,
            metrics,
        }
    }
}

/// Write `snapshot` as pretty JSON, replacing `path` atomically.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_snapshot(snapshot: &Snapshot<'_>, path: &Path) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(snapshot)?;
    super::write_atomic(path, json.as_bytes()).await?;
    info!(
        keywords = snapshot.keywords.len(),
        metrics = snapshot.metrics.len(),
        "Wrote JSON snapshot"
    );
    Ok(())
}
