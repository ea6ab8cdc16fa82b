//! Template substitution and the metadata embedded in each report page.
//!
//! The template is a plain HTML file with `{{content}}`, `{{date}}` and
//! `{{archive}}` slots, filled by literal replacement. Each rendered page
//! also carries two `<meta>` tags recording when it was generated and which
//! keywords represent it; the next run reads them back to name the archive
//! copy.

use chrono::NaiveDateTime;
use html_escape::encode_double_quoted_attribute;
use scraper::{Html, Selector};

pub const CONTENT_SLOT: &str = "{{content}}";
pub const DATE_SLOT: &str = "{{date}}";
pub const ARCHIVE_SLOT: &str = "{{archive}}";

const META_GENERATED_AT: &str = "keyword-radar:generated-at";
const META_KEYWORDS: &str = "keyword-radar:keywords";
const META_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
// Sanitized keywords never contain it.
const META_KEYWORD_SEPARATOR: &str = "|";

/// Identity of a rendered report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    pub generated_at: NaiveDateTime,
    /// Representative keywords, already filename-safe
    pub keywords: Vec<String>,
}

/// `2026년 01월 02일 18시 24분`
pub fn format_report_date(ts: NaiveDateTime) -> String {
    ts.format("%Y년 %m월 %d일 %H시 %M분").to_string()
}

/// Fill every template slot and embed the page metadata.
pub fn render_page(template: &str, content: &str, archive_html: &str, meta: &PageMeta) -> String {
    let page = template
        .replace(CONTENT_SLOT, content)
        .replace(DATE_SLOT, &format_report_date(meta.generated_at))
        .replace(ARCHIVE_SLOT, archive_html);
    embed_metadata(&page, meta)
}

/// Insert the metadata tags before `</head>`, or at the top without a head.
pub fn embed_metadata(html: &str, meta: &PageMeta) -> String {
    let keywords = meta.keywords.join(META_KEYWORD_SEPARATOR);
    let tags = format!(
        "<meta name=\"{META_GENERATED_AT}\" content=\"{}\">\n<meta name=\"{META_KEYWORDS}\" content=\"{}\">\n",
        meta.generated_at.format(META_TIME_FORMAT),
        encode_double_quoted_attribute(&keywords),
    );

    match html.find("</head>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + tags.len());
            out.push_str(&html[..pos]);
            out.push_str(&tags);
            out.push_str(&html[pos..]);
            out
        }
        None => format!("{tags}{html}"),
    }
}

/// Read back the metadata of a previously rendered page.
///
/// `None` when the page predates the tags or the timestamp does not parse.
pub fn read_metadata(html: &str) -> Option<PageMeta> {
    let document = Html::parse_document(html);
    let content_of = |name: &str| -> Option<String> {
        let selector = Selector::parse(&format!("meta[name=\"{name}\"]")).ok()?;
        document
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(str::to_string)
    };

    let generated_at =
        NaiveDateTime::parse_from_str(&content_of(META_GENERATED_AT)?, META_TIME_FORMAT).ok()?;
    let keywords = content_of(META_KEYWORDS)
        .map(|raw| {
            raw.split(META_KEYWORD_SEPARATOR)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(PageMeta {
        generated_at,
        keywords,
    })
}
