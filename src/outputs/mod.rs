//! Everything the pipeline writes to disk.
//!
//! # Submodules
//!
//! - [`table`]: ranked keyword metrics as an HTML table
//! - [`page`]: template slots and the `<meta>` tags identifying a report
//! - [`archive`]: archive naming, copying and the archive index page
//! - [`json`]: the `keywords.json` snapshot
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── index.html                                   # current report
//! ├── keywords.json                                # snapshot of the last run
//! └── archive/
//!     ├── index.html                               # every past report
//!     ├── 2026-01-02_18-24_종각역사고_나나강도_곽튜브다이어트.html
//!     └── 2026-01-02_07-05_키워드없음.html
//! ```
//!
//! # Publish Order
//!
//! The previous report is copied into the archive and synced before the new
//! one replaces it, and the replacement is a rename of a synced temporary
//! file. A crash can leave the archive one report ahead of `index.html`,
//! never the other way around.

pub mod archive;
pub mod json;
pub mod page;
pub mod table;

use crate::config::AppConfig;
use crate::error::ReportError;
use crate::models::{ExtractionOutcome, KeywordMetric, Report};
use chrono::NaiveDateTime;
use json::Snapshot;
use page::PageMeta;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

/// Builds reports and publishes them into the output directory.
///
/// All paths are resolved from [`AppConfig`] once, at construction.
pub struct ReportAssembler {
    template_path: PathBuf,
    report_path: PathBuf,
    archive_dir: PathBuf,
    snapshot_path: PathBuf,
    archive_href_prefix: String,
    archive_display_limit: usize,
    search_url_template: String,
}

impl ReportAssembler {
    pub fn new(config: &AppConfig) -> Self {
        let report = &config.settings.report;
        Self {
            template_path: config.template_path.clone(),
            report_path: config.report_path(),
            archive_dir: config.archive_dir(),
            snapshot_path: config.snapshot_path(),
            archive_href_prefix: format!("{}/", report.archive_dir.trim_end_matches('/')),
            archive_display_limit: report.archive_display_limit,
            search_url_template: report.search_url_template.clone(),
        }
    }

    /// Turn the extraction result into a report body and its archive keywords.
    pub fn build_report(
        &self,
        outcome: &ExtractionOutcome,
        metrics: &[KeywordMetric],
        generated_at: NaiveDateTime,
    ) -> Report {
        match outcome {
            ExtractionOutcome::Keywords(keywords) => {
                let archive_keywords = if metrics.is_empty() {
                    archive::representative_keywords(keywords.iter().map(|k| k.as_str()))
                } else {
                    archive::representative_keywords(metrics.iter().map(|m| m.keyword.as_str()))
                };
                Report {
                    generated_at,
                    body_html: table::render_keyword_table(metrics, &self.search_url_template),
                    archive_keywords,
                }
            }
            ExtractionOutcome::Narrative(body) => Report {
                generated_at,
                body_html: body.clone(),
                archive_keywords: archive::narrative_keywords(body),
            },
        }
    }

    /// Archive the previous report, then write the new report, the archive
    /// index and the snapshot.
    ///
    /// # Arguments
    ///
    /// * `report` - Body and archive keywords from [`Self::build_report`]
    /// * `snapshot` - The run summary written to `keywords.json`
    ///
    /// # Returns
    ///
    /// The path of the new report. A missing template fails before anything
    /// on disk changes.
    #[instrument(level = "info", skip_all, fields(report = %self.report_path.display()))]
    pub async fn publish(
        &self,
        report: &Report,
        snapshot: &Snapshot<'_>,
    ) -> Result<PathBuf, ReportError> {
        let template = fs::read_to_string(&self.template_path)
            .await
            .map_err(|source| ReportError::TemplateMissing {
                path: self.template_path.clone(),
                source,
            })?;

        archive::archive_current(&self.report_path, &self.archive_dir).await?;
        let entries = archive::list_archive(&self.archive_dir).await?;

        let archive_html = archive::render_archive_list(
            &entries,
            &self.archive_href_prefix,
            self.archive_display_limit,
        );
        let meta = PageMeta {
            generated_at: report.generated_at,
            keywords: report.archive_keywords.clone(),
        };
        let page = page::render_page(&template, &report.body_html, &archive_html, &meta);

        if let Some(parent) = self.report_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ReportError::io(parent, e))?;
        }
        write_atomic(&self.report_path, page.as_bytes()).await?;
        info!(
            bytes = page.len(),
            archived = entries.len(),
            "Wrote report"
        );

        archive::write_archive_index(&self.archive_dir, &entries).await?;
        json::write_snapshot(snapshot, &self.snapshot_path).await?;

        Ok(self.report_path.clone())
    }
}

/// Write `bytes` to `path` and fsync before returning.
pub(crate) async fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), ReportError> {
    let mut file = fs::File::create(path)
        .await
        .map_err(|e| ReportError::io(path, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| ReportError::io(path, e))?;
    file.sync_all().await.map_err(|e| ReportError::io(path, e))
}

/// Replace `path` through a synced `<name>.tmp` sibling and a rename.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ReportError> {
    let tmp = tmp_path(path);
    write_synced(&tmp, bytes).await?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| ReportError::io(path, e))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
