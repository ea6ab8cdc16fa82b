//! Report archive: naming, copying and listing past reports.
//!
//! Archived reports are named `YYYY-MM-DD_HH-MM_<kw1>_<kw2>_<kw3>.html`.
//! A different report that lands on a taken name gets a sequence number after
//! the minute: `YYYY-MM-DD_HH-MM-2_<kw1>.html`.
//! The name is the only index; listing the directory and parsing names back
//! is enough to rebuild the archive page. Entries are never deleted.

use super::page::read_metadata;
use super::write_synced;
use crate::error::ReportError;
use crate::models::ArchiveEntry;
use crate::utils::{sanitize_file_segment, truncate_chars};
use chrono::{DateTime, Local, NaiveDateTime};
use html_escape::{encode_double_quoted_attribute, encode_text};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Segment used when a report has no representative keywords.
pub const NO_KEYWORDS: &str = "키워드없음";
pub const ARCHIVE_INDEX_FILE: &str = "index.html";

const FILE_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M";
const MAX_KEYWORDS: usize = 3;
const MAX_KEYWORD_CHARS: usize = 10;

static FULLWIDTH_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"【([^】]+)】").unwrap());
static BRACKET_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]").unwrap());

/// Pick up to three short, filename-safe keywords, keeping order.
pub fn representative_keywords<'a>(candidates: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    candidates
        .into_iter()
        .map(|kw| truncate_chars(&sanitize_file_segment(kw), MAX_KEYWORD_CHARS))
        .filter(|kw| !kw.is_empty())
        .unique()
        .take(MAX_KEYWORDS)
        .collect()
}

/// Representative keywords of a narrative report, from its `【…】` markers
/// or, failing that, `[…]` markers.
pub fn narrative_keywords(html: &str) -> Vec<String> {
    let keywords = marker_keywords(&FULLWIDTH_MARKER, html);
    if keywords.is_empty() {
        marker_keywords(&BRACKET_MARKER, html)
    } else {
        keywords
    }
}

fn marker_keywords(marker: &Regex, html: &str) -> Vec<String> {
    let found = marker
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim());
    representative_keywords(found)
}

pub fn archive_file_name(ts: NaiveDateTime, keywords: &[String]) -> String {
    numbered_archive_file_name(ts, keywords, 1)
}

/// Like [`archive_file_name`], with `-{sequence}` after the minute when
/// `sequence` is above 1.
fn numbered_archive_file_name(ts: NaiveDateTime, keywords: &[String], sequence: u32) -> String {
    let segments: Vec<String> = keywords
        .iter()
        .map(|kw| sanitize_file_segment(kw))
        .filter(|kw| !kw.is_empty())
        .take(MAX_KEYWORDS)
        .collect();
    let suffix = if segments.is_empty() {
        NO_KEYWORDS.to_string()
    } else {
        segments.join("_")
    };
    let time = ts.format(FILE_TIME_FORMAT);
    if sequence > 1 {
        format!("{time}-{sequence}_{suffix}.html")
    } else {
        format!("{time}_{suffix}.html")
    }
}

/// Parse a name produced by [`archive_file_name`]. Never fails: names that do
/// not follow the format keep their raw name and no timestamp.
pub fn parse_archive_file_name(file_name: &str) -> ArchiveEntry {
    let unparsed = || ArchiveEntry {
        timestamp: None,
        top_keywords: Vec::new(),
        file_name: file_name.to_string(),
    };

    let Some(stem) = file_name.strip_suffix(".html") else {
        return unparsed();
    };
    let Some(time_part) = stem.get(..16) else {
        return unparsed();
    };
    let Ok(timestamp) = NaiveDateTime::parse_from_str(time_part, FILE_TIME_FORMAT) else {
        return unparsed();
    };

    let mut rest = &stem[16..];
    if let Some(numbered) = rest.strip_prefix('-') {
        let (sequence, tail) = numbered.split_at(numbered.find('_').unwrap_or(numbered.len()));
        if sequence.is_empty() || !sequence.chars().all(|c| c.is_ascii_digit()) {
            return unparsed();
        }
        rest = tail;
    }
    if !(rest.is_empty() || rest.starts_with('_')) {
        return unparsed();
    }
    let top_keywords = rest
        .split('_')
        .filter(|s| !s.is_empty() && *s != NO_KEYWORDS)
        .map(str::to_string)
        .collect();

    ArchiveEntry {
        timestamp: Some(timestamp),
        top_keywords,
        file_name: file_name.to_string(),
    }
}

/// Newest first; unparseable names last, by name.
pub fn sort_entries(entries: &mut [ArchiveEntry]) {
    entries.sort_by(|a, b| match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.file_name.cmp(&b.file_name)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.file_name.cmp(&b.file_name),
    });
}

/// List every archived report, sorted by [`sort_entries`]. A missing
/// directory is an empty archive.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn list_archive(dir: &Path) -> Result<Vec<ArchiveEntry>, ReportError> {
    let mut read_dir = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ReportError::io(dir, e)),
    };

    let mut entries = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| ReportError::io(dir, e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(".html") || name == ARCHIVE_INDEX_FILE {
            continue;
        }
        let parsed = parse_archive_file_name(&name);
        if parsed.timestamp.is_none() {
            debug!(file = %name, "Archive file name does not parse");
        }
        entries.push(parsed);
    }

    sort_entries(&mut entries);
    info!(count = entries.len(), "Listed archive");
    Ok(entries)
}

/// `<ul>` of the first `limit` entries, linking to `{href_prefix}{file_name}`.
pub fn render_archive_list(entries: &[ArchiveEntry], href_prefix: &str, limit: usize) -> String {
    if entries.is_empty() {
        return "<p class=\"archive-empty\">아직 보관된 리포트가 없습니다.</p>\n".to_string();
    }

    let mut html = String::from("<ul class=\"archive-list\">\n");
    for entry in entries.iter().take(limit) {
        let href = format!("{href_prefix}{}", urlencoding::encode(&entry.file_name));
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a>",
            encode_double_quoted_attribute(&href),
            encode_text(&entry.display_date()),
        ));
        if !entry.top_keywords.is_empty() {
            html.push_str(&format!(
                " <span class=\"archive-keywords\">{}</span>",
                encode_text(&entry.top_keywords.join(", "))
            ));
        }
        html.push_str("</li>\n");
    }
    html.push_str("</ul>\n");
    html
}

/// Standalone page listing every archived report.
pub fn render_archive_index(entries: &[ArchiveEntry]) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"ko\">\n<head>\n<meta charset=\"utf-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
<title>지난 키워드 리포트</title>\n</head>\n<body>\n\
<h1>지난 키워드 리포트</h1>\n<p><a href=\"../index.html\">최신 리포트로 돌아가기</a></p>\n\
{list}</body>\n</html>\n",
        list = render_archive_list(entries, "", usize::MAX),
    )
}

#[instrument(level = "info", skip_all, fields(dir = %dir.display(), entries = entries.len()))]
pub async fn write_archive_index(dir: &Path, entries: &[ArchiveEntry]) -> Result<(), ReportError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| ReportError::io(dir, e))?;
    let path = dir.join(ARCHIVE_INDEX_FILE);
    super::write_atomic(&path, render_archive_index(entries).as_bytes()).await?;
    info!(path = %path.display(), "Wrote archive index");
    Ok(())
}

/// Copy the current report into the archive before it is replaced.
///
/// The archive name comes from the metadata the report was rendered with,
/// or from its modification time when it has none. An archive file of the
/// same name is never overwritten: identical content counts as already
/// archived, different content takes the next free sequence number.
/// Returns the archive file name, or `None` when there was no current report.
#[instrument(level = "info", skip_all, fields(report = %report_path.display()))]
pub async fn archive_current(
    report_path: &Path,
    archive_dir: &Path,
) -> Result<Option<String>, ReportError> {
    let bytes = match fs::read(report_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No current report to archive");
            return Ok(None);
        }
        Err(e) => return Err(ReportError::io(report_path, e)),
    };

    let html = String::from_utf8_lossy(&bytes);
    let (generated_at, keywords) = match read_metadata(&html) {
        Some(meta) => (meta.generated_at, meta.keywords),
        None => {
            let modified = fs::metadata(report_path)
                .await
                .and_then(|m| m.modified())
                .map_err(|e| ReportError::io(report_path, e))?;
            warn!("Current report has no metadata; naming archive copy by modification time");
            (DateTime::<Local>::from(modified).naive_local(), Vec::new())
        }
    };

    fs::create_dir_all(archive_dir)
        .await
        .map_err(|e| ReportError::io(archive_dir, e))?;

    let mut sequence = 1;
    loop {
        let file_name = numbered_archive_file_name(generated_at, &keywords, sequence);
        let target = archive_dir.join(&file_name);
        match fs::read(&target).await {
            Ok(existing) if existing == bytes => {
                info!(file = %file_name, "Report already archived");
                return Ok(Some(file_name));
            }
            Ok(_) => {
                debug!(file = %file_name, "Archive name taken by another report");
                sequence += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                write_synced(&target, &bytes).await?;
                info!(file = %file_name, "Archived previous report");
                return Ok(Some(file_name));
            }
            Err(e) => return Err(ReportError::io(&target, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::page::{PageMeta, embed_metadata};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_archive_name_round_trip() {
        let keywords = strings(&["종각역사고", "나나강도", "곽튜브다이어트"]);
        let name = archive_file_name(ts(18, 24), &keywords);
        assert_eq!(name, "2026-01-02_18-24_종각역사고_나나강도_곽튜브다이어트.html");

        let entry = parse_archive_file_name(&name);
        assert_eq!(entry.display_date(), "2026년 01월 02일 18:24");
        assert_eq!(entry.top_keywords, keywords);
        assert_eq!(entry.file_name, name);
    }

    #[test]
    fn test_archive_name_without_keywords() {
        let name = archive_file_name(ts(7, 5), &[]);
        assert_eq!(name, "2026-01-02_07-05_키워드없음.html");
        let entry = parse_archive_file_name(&name);
        assert_eq!(entry.timestamp, Some(ts(7, 5)));
        assert!(entry.top_keywords.is_empty());
    }

    #[test]
    fn test_archive_name_sanitizes_and_caps() {
        let keywords = strings(&["a/b", "c_d", "  ", "e:f", "extra"]);
        assert_eq!(
            archive_file_name(ts(0, 0), &keywords),
            "2026-01-02_00-00_ab_cd_ef.html"
        );
    }

    #[test]
    fn test_numbered_archive_name_parses() {
        let keywords = strings(&["금값", "2026"]);
        let name = numbered_archive_file_name(ts(18, 24), &keywords, 2);
        assert_eq!(name, "2026-01-02_18-24-2_금값_2026.html");

        let entry = parse_archive_file_name(&name);
        assert_eq!(entry.timestamp, Some(ts(18, 24)));
        assert_eq!(entry.top_keywords, keywords);
        assert_eq!(numbered_archive_file_name(ts(18, 24), &keywords, 1), archive_file_name(ts(18, 24), &keywords));
    }

    #[test]
    fn test_unparseable_names_fall_back_to_raw() {
        for name in [
            "report.html",
            "2026-13-40_99-99_x.html",
            "2026-01-02_18-24x.html",
            "2026-01-02_18-24-_x.html",
            "2026-01-02_18-24-a_x.html",
            "notes.txt",
        ] {
            let entry = parse_archive_file_name(name);
            assert_eq!(entry.timestamp, None, "{name}");
            assert_eq!(entry.display_date(), name);
        }
    }

    #[test]
    fn test_representative_keywords() {
        let picked = representative_keywords([
            "아주아주긴키워드입니다정말로",
            "짧음",
            "짧음",
            "a b",
            "넷째",
        ]);
        assert_eq!(picked, strings(&["아주아주긴키워드입니", "짧음", "ab"]));
    }

    #[test]
    fn test_narrative_keywords_prefers_fullwidth_markers() {
        let html = "<h3>【종각역 사고】 속보</h3><p>[무시]</p><h3>【금값】 상승</h3>";
        assert_eq!(narrative_keywords(html), strings(&["종각역사고", "금값"]));
    }

    #[test]
    fn test_narrative_keywords_bracket_fallback() {
        let html = "<h3>[환율] 급등</h3><h3>[청년 월세] 신청</h3>";
        assert_eq!(narrative_keywords(html), strings(&["환율", "청년월세"]));
        assert!(narrative_keywords("<p>표식 없음</p>").is_empty());
    }

    #[test]
    fn test_sort_entries_newest_first_unparseable_last() {
        let mut entries = vec![
            parse_archive_file_name("zzz.html"),
            parse_archive_file_name(&archive_file_name(ts(9, 0), &[])),
            parse_archive_file_name("aaa.html"),
            parse_archive_file_name(&archive_file_name(ts(18, 0), &[])),
        ];
        sort_entries(&mut entries);
        let names: Vec<&str> = entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "2026-01-02_18-00_키워드없음.html",
                "2026-01-02_09-00_키워드없음.html",
                "aaa.html",
                "zzz.html",
            ]
        );
    }

    #[test]
    fn test_render_archive_list_limit_and_links() {
        let entries: Vec<ArchiveEntry> = (0..12)
            .map(|m| parse_archive_file_name(&archive_file_name(ts(10, m), &strings(&["금값"]))))
            .collect();
        let html = render_archive_list(&entries, "archive/", 10);
        assert_eq!(html.matches("<li>").count(), 10);
        assert!(html.contains("href=\"archive/2026-01-02_10-00_%EA%B8%88%EA%B0%92.html\""));
        assert!(html.contains("<span class=\"archive-keywords\">금값</span>"));

        assert!(render_archive_list(&[], "", 10).contains("archive-empty"));
    }

    #[tokio::test]
    async fn test_list_archive_skips_index_and_other_files() {
        let dir = tempdir().unwrap();
        for name in [
            "2026-01-02_09-00_금값.html",
            "2026-01-02_18-24_환율.html",
            "index.html",
            "notes.txt",
            "legacy.html",
        ] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        let entries = list_archive(dir.path()).await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["2026-01-02_18-24_환율.html", "2026-01-02_09-00_금값.html", "legacy.html"]
        );
    }

    #[tokio::test]
    async fn test_list_missing_archive_is_empty() {
        let dir = tempdir().unwrap();
        let entries = list_archive(&dir.path().join("absent")).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_archive_current_uses_embedded_metadata() {
        let dir = tempdir().unwrap();
        let report = dir.path().join("index.html");
        let archive = dir.path().join("archive");
        let meta = PageMeta {
            generated_at: ts(18, 24),
            keywords: strings(&["종각역사고", "나나강도"]),
        };
        let html = embed_metadata("<html><head></head><body>old</body></html>", &meta);
        std::fs::write(&report, &html).unwrap();

        let name = archive_current(&report, &archive).await.unwrap();
        assert_eq!(name.as_deref(), Some("2026-01-02_18-24_종각역사고_나나강도.html"));
        let copied = std::fs::read_to_string(archive.join(name.unwrap())).unwrap();
        assert_eq!(copied, html);
    }

    #[tokio::test]
    async fn test_archive_current_same_minute_gets_sequence() {
        let dir = tempdir().unwrap();
        let report = dir.path().join("index.html");
        let archive = dir.path().join("archive");
        let meta = PageMeta {
            generated_at: ts(8, 0),
            keywords: vec![],
        };
        let html = embed_metadata("<p>new</p>", &meta);
        std::fs::write(&report, &html).unwrap();
        std::fs::create_dir_all(&archive).unwrap();
        let existing = archive.join("2026-01-02_08-00_키워드없음.html");
        std::fs::write(&existing, "first copy").unwrap();

        let name = archive_current(&report, &archive).await.unwrap();

        assert_eq!(name.as_deref(), Some("2026-01-02_08-00-2_키워드없음.html"));
        assert_eq!(std::fs::read_to_string(existing).unwrap(), "first copy");
        assert_eq!(
            std::fs::read_to_string(archive.join("2026-01-02_08-00-2_키워드없음.html")).unwrap(),
            html
        );
        assert_eq!(list_archive(&archive).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_archive_current_is_idempotent() {
        let dir = tempdir().unwrap();
        let report = dir.path().join("index.html");
        let archive = dir.path().join("archive");
        let meta = PageMeta {
            generated_at: ts(8, 0),
            keywords: strings(&["금값"]),
        };
        std::fs::write(&report, embed_metadata("<p>same</p>", &meta)).unwrap();

        let first = archive_current(&report, &archive).await.unwrap();
        let second = archive_current(&report, &archive).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read_dir(&archive).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_archive_current_falls_back_to_mtime() {
        let dir = tempdir().unwrap();
        let report = dir.path().join("index.html");
        std::fs::write(&report, "<html><body>legacy</body></html>").unwrap();

        let name = archive_current(&report, &dir.path().join("archive"))
            .await
            .unwrap()
            .unwrap();
        let entry = parse_archive_file_name(&name);
        assert!(entry.timestamp.is_some());
        assert!(name.ends_with("_키워드없음.html"));
    }

    #[tokio::test]
    async fn test_archive_current_without_report() {
        let dir = tempdir().unwrap();
        let name = archive_current(&dir.path().join("index.html"), &dir.path().join("archive"))
            .await
            .unwrap();
        assert_eq!(name, None);
        assert!(!dir.path().join("archive").exists());
    }
}
