//! HTML table of ranked keyword metrics.

use crate::models::KeywordMetric;
use crate::resolver::scoring::UNSCOREABLE;
use crate::utils::group_thousands;
use html_escape::{encode_double_quoted_attribute, encode_text};

const HEADER: &str = "<thead><tr><th>순위</th><th>키워드</th><th>월간 검색량</th>\
<th>블로그 문서 수</th><th>포화도</th><th>기회</th></tr></thead>";

/// Render `metrics` in the given order as a `<table>` fragment.
///
/// `search_url_template` must contain `{keyword}`, which is replaced by the
/// URL-encoded keyword to build each row's link.
pub fn render_keyword_table(metrics: &[KeywordMetric], search_url_template: &str) -> String {
    let mut html = String::from("<table class=\"keyword-table\">\n");
    html.push_str(HEADER);
    html.push_str("\n<tbody>\n");

    if metrics.is_empty() {
        html.push_str("<tr><td colspan=\"6\" class=\"empty\">분석된 키워드가 없습니다.</td></tr>\n");
    }

    for (rank, metric) in metrics.iter().enumerate() {
        let keyword = metric.keyword.as_str();
        let href = search_url(search_url_template, keyword);
        html.push_str(&format!(
            "<tr><td class=\"rank\">{rank}</td>\
<td class=\"keyword\"><a href=\"{href}\" target=\"_blank\" rel=\"noopener\">{text}</a></td>\
<td class=\"num\">{volume}</td><td class=\"num\">{docs}</td><td class=\"num\">{saturation}</td>\
<td><span class=\"tier {class}\">{label}</span></td></tr>\n",
            rank = rank + 1,
            href = encode_double_quoted_attribute(&href),
            text = encode_text(keyword),
            volume = group_thousands(metric.monthly_search_volume),
            docs = group_thousands(metric.blog_document_count),
            saturation = format_saturation(metric.saturation),
            class = metric.tier.css_class(),
            label = metric.tier.label(),
        ));
    }

    html.push_str("</tbody>\n</table>\n");
    html
}

/// Substitute the URL-encoded keyword into the `{keyword}` slot.
pub fn search_url(template: &str, keyword: &str) -> String {
    template.replace("{keyword}", &urlencoding::encode(keyword))
}

fn format_saturation(saturation: f64) -> String {
    if saturation >= UNSCOREABLE {
        "측정불가".to_string()
    } else {
        format!("{saturation:.2}")
    }
}
