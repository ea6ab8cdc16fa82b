//! Keyword extraction through the completion provider.
//!
//! A run uses exactly one contract, picked by [`RunMode`]:
//!
//! - [`RunMode::Keywords`]: the model lists blog-search keywords separated by
//!   the configured delimiter; the reply is split and normalized into
//!   [`Keyword`] values.
//! - [`RunMode::Narrative`]: the model writes an HTML fragment that becomes
//!   the report body as-is.
//!
//! Either way a reply with nothing usable is an [`ExtractionError`], which the
//! orchestrator treats as a hard stop.

use crate::config::{KeywordFormat, LlmSettings};
use crate::error::ExtractionError;
use crate::llm::CompletionClient;
use crate::models::{ExtractionOutcome, HeadlineSet, Keyword, RunMode};
use crate::utils::truncate_for_log;
use itertools::Itertools;
use tracing::{debug, info, instrument, warn};

/// Tokens longer than this are prose, not keywords.
const MAX_KEYWORD_CHARS: usize = 30;

/// Prompts the completion client once per run and parses the reply for the
/// configured [`RunMode`].
pub struct KeywordExtractor<C> {
    client: C,
    mode: RunMode,
    format: KeywordFormat,
    max_tokens: u32,
    narrative_max_tokens: u32,
    temperature: f32,
}

impl<C> KeywordExtractor<C>
where
    C: CompletionClient,
{
    pub fn new(client: C, mode: RunMode, settings: &LlmSettings) -> Self {
        Self {
            client,
            mode,
            format: settings.keyword_format,
            max_tokens: settings.max_tokens,
            narrative_max_tokens: settings.narrative_max_tokens,
            temperature: settings.temperature,
        }
    }

    /// # Returns
    ///
    /// Keywords in reply order, or the narrative body. An [`ExtractionError`]
    /// when the provider fails or the reply holds nothing usable.
    #[instrument(level = "info", skip_all, fields(mode = %self.mode, headlines = headlines.len()))]
    pub async fn extract(&self, headlines: &HeadlineSet) -> Result<ExtractionOutcome, ExtractionError> {
        match self.mode {
            RunMode::Keywords => {
                let prompt = keyword_prompt(headlines, self.format);
                let reply = self
                    .client
                    .complete(&prompt, self.max_tokens, self.temperature)
                    .await?;
                debug!(reply = %truncate_for_log(&reply, 300), "Keyword reply");
                let keywords = parse_keyword_reply(&reply, self.format)?;
                info!(count = keywords.len(), "Extracted keywords");
                Ok(ExtractionOutcome::Keywords(keywords))
            }
            RunMode::Narrative => {
                let prompt = narrative_prompt(headlines);
                let reply = self
                    .client
                    .complete(&prompt, self.narrative_max_tokens, self.temperature)
                    .await?;
                let body = clean_narrative(&reply).ok_or(ExtractionError::EmptyNarrative)?;
                info!(chars = body.chars().count(), "Received narrative report");
                Ok(ExtractionOutcome::Narrative(body))
            }
        }
    }
}

pub fn keyword_prompt(headlines: &HeadlineSet, format: KeywordFormat) -> String {
    let directive = match format {
        KeywordFormat::Comma => "키워드만 쉼표(,)로 구분해서 한 줄로 나열하세요. 설명은 쓰지 마세요.\n\n응답 형식:\n키워드1, 키워드2, 키워드3",
        KeywordFormat::Newline => "키워드를 한 줄에 하나씩 나열하세요. 번호나 설명은 쓰지 마세요.\n\n응답 형식:\n키워드1\n키워드2\n키워드3",
    };
    format!(
        "아래 뉴스 헤드라인에서 블로그 글감으로 쓸 검색 키워드를 뽑아주세요.\n\n\
         뉴스 헤드라인:\n{body}\n\n\
         규칙:\n\
         1. 헤드라인마다 블로그 검색에 어울리는 키워드를 2~3개 고릅니다.\n\
         2. 띄어쓰기 없이 붙여 씁니다. (예: 삼성전자주가, 비트코인전망)\n\
         3. 뉴스, 오늘, 발표처럼 지나치게 일반적인 단어는 뺍니다.\n\
         4. 실제로 검색량이 있을 만한 구체적인 키워드를 고릅니다.\n\
         5. {directive}\n",
        body = headlines.prompt_body(),
    )
}

pub fn narrative_prompt(headlines: &HeadlineSet) -> String {
    format!(
        "아래 뉴스 헤드라인을 분석해 블로거를 위한 오늘의 키워드 리포트를 HTML 조각으로 작성하세요.\n\n\
         뉴스 헤드라인:\n{body}\n\n\
         규칙:\n\
         1. 주제마다 <section> 하나를 만들고, 제목은 <h3>【핵심키워드】 한 줄 요약</h3> 형식으로 씁니다.\n\
         2. 각 섹션에 추천 블로그 제목 2개와 연관 검색어를 <ul>로 정리합니다.\n\
         3. <html>, <head>, <body> 태그와 마크다운 코드 블록은 쓰지 마세요.\n\
         4. 가장 검색 수요가 클 주제부터 순서대로 작성합니다.\n",
        body = headlines.prompt_body(),
    )
}

/// Split a keyword reply on the configured separator and normalize it.
pub fn parse_keyword_reply(
    reply: &str,
    format: KeywordFormat,
) -> Result<Vec<Keyword>, ExtractionError> {
    let keywords = normalize_keywords(reply.split(format.separator()).map(strip_decoration));
    if keywords.is_empty() {
        warn!(reply = %truncate_for_log(reply, 200), "Reply contained no usable keywords");
        return Err(ExtractionError::NoUsableKeywords);
    }
    Ok(keywords)
}

/// Normalize raw tokens into unique keywords, keeping first occurrences.
///
/// Idempotent: feeding the output back in yields the same list.
pub fn normalize_keywords<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Vec<Keyword> {
    tokens
        .into_iter()
        .filter_map(Keyword::parse)
        .filter(|kw| kw.as_str().chars().count() <= MAX_KEYWORD_CHARS)
        .unique()
        .collect()
}

/// Trim list markers and quotes a model tends to wrap tokens in.
///
/// An ordinal (`1.` or `2)`) counts as a marker only when whitespace follows
/// it, so `5.18민주화운동` keeps its date.
fn strip_decoration(token: &str) -> &str {
    let token = token.trim();
    let token = token.trim_start_matches(['-', '*', '•', '·']);
    let token = match token.split_once(['.', ')']) {
        Some((ordinal, rest))
            if !ordinal.is_empty()
                && ordinal.chars().all(|c| c.is_ascii_digit())
                && rest.starts_with(char::is_whitespace) =>
        {
            rest
        }
        _ => token,
    };
    token.trim().trim_matches(['"', '\'', '`', '“', '”', '‘', '’'])
}

/// Strip a Markdown code fence if the model added one anyway.
pub fn clean_narrative(reply: &str) -> Option<String> {
    let mut body = reply.trim();
    if let Some(rest) = body.strip_prefix("```") {
        // Drop the info string (e.g. `html`) on the fence line.
        body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
        body = body.trim_end();
        body = body.strip_suffix("```").unwrap_or(body);
    }
    let body = body.trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use crate::error::LlmError;
    use crate::llm::RetryComplete;
    use crate::llm::tests::{ScriptedClient, overloaded};
    use std::time::Duration;

    fn headlines() -> HeadlineSet {
        aggregate(vec![vec![
            "[한겨레] 종각역 택시 돌진 사고".to_string(),
            "[정부정책] 청년 월세 지원 신청".to_string(),
        ]])
        .unwrap()
    }

    fn strs(keywords: &[Keyword]) -> Vec<&str> {
        keywords.iter().map(Keyword::as_str).collect()
    }

    #[test]
    fn test_parse_comma_reply() {
        let keywords = parse_keyword_reply(
            "종각역 사고, 청년월세지원 ,a, 종각역사고, 월세신청방법",
            KeywordFormat::Comma,
        )
        .unwrap();
        assert_eq!(strs(&keywords), vec!["종각역사고", "청년월세지원", "월세신청방법"]);
    }

    #[test]
    fn test_parse_newline_reply_with_markers() {
        let reply = "1. 종각역사고\n2) \"청년월세지원\"\n- 월세신청방법\n\n";
        let keywords = parse_keyword_reply(reply, KeywordFormat::Newline).unwrap();
        assert_eq!(strs(&keywords), vec!["종각역사고", "청년월세지원", "월세신청방법"]);
    }

    #[test]
    fn test_parse_keeps_digits_inside_keywords() {
        let keywords = parse_keyword_reply("2026년최저임금, 갤럭시S26", KeywordFormat::Comma).unwrap();
        assert_eq!(strs(&keywords), vec!["2026년최저임금", "갤럭시S26"]);
    }

    #[test]
    fn test_parse_keeps_dotted_dates_and_decimals() {
        let keywords =
            parse_keyword_reply("3.1절기념식, 5.18민주화운동, 2.5단계", KeywordFormat::Comma).unwrap();
        assert_eq!(strs(&keywords), vec!["3.1절기념식", "5.18민주화운동", "2.5단계"]);

        let reply = "1. 5.18민주화운동\n2) 3.1절기념식";
        let keywords = parse_keyword_reply(reply, KeywordFormat::Newline).unwrap();
        assert_eq!(strs(&keywords), vec!["5.18민주화운동", "3.1절기념식"]);
    }

    #[test]
    fn test_parse_rejects_prose() {
        let reply = "죄송하지만 요청하신 헤드라인 목록을 분석하는 과정에서 문제가 발생하여 키워드를 제공할 수 없습니다";
        let err = parse_keyword_reply(reply, KeywordFormat::Comma).unwrap_err();
        assert!(matches!(err, ExtractionError::NoUsableKeywords));
    }

    #[test]
    fn test_parse_empty_reply() {
        let err = parse_keyword_reply(" , ,, ", KeywordFormat::Comma).unwrap_err();
        assert!(matches!(err, ExtractionError::NoUsableKeywords));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_keywords(["  금값 전망", "금값전망", "x", "환율 급등 ", "AI 반도체"]);
        let twice = normalize_keywords(once.iter().map(Keyword::as_str));
        assert_eq!(once, twice);
        assert_eq!(strs(&once), vec!["금값전망", "환율급등", "AI반도체"]);
    }

    #[test]
    fn test_clean_narrative() {
        assert_eq!(
            clean_narrative("```html\n<section>본문</section>\n```").as_deref(),
            Some("<section>본문</section>")
        );
        assert_eq!(
            clean_narrative("  <section>x</section> ").as_deref(),
            Some("<section>x</section>")
        );
        assert_eq!(clean_narrative("```\n```"), None);
        assert_eq!(clean_narrative("   "), None);
    }

    #[test]
    fn test_prompts_embed_headlines_and_directive() {
        let set = headlines();
        let comma = keyword_prompt(&set, KeywordFormat::Comma);
        assert!(comma.contains("- [한겨레] 종각역 택시 돌진 사고"));
        assert!(comma.contains("쉼표"));
        let newline = keyword_prompt(&set, KeywordFormat::Newline);
        assert!(newline.contains("한 줄에 하나씩"));
        assert!(narrative_prompt(&set).contains("【핵심키워드】"));
    }

    #[tokio::test]
    async fn test_extract_keywords_mode() {
        let client = ScriptedClient::new(vec![Ok("종각역사고, 청년월세지원".to_string())]);
        let extractor = KeywordExtractor::new(&client, RunMode::Keywords, &LlmSettings::default());
        let outcome = extractor.extract(&headlines()).await.unwrap();
        match outcome {
            ExtractionOutcome::Keywords(keywords) => {
                assert_eq!(strs(&keywords), vec!["종각역사고", "청년월세지원"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_extract_narrative_mode_is_chosen_by_config() {
        // Content that looks like a keyword list is still a narrative in this mode.
        let client = ScriptedClient::new(vec![Ok("<h3>【금값】 상승</h3>, 오류".to_string())]);
        let extractor = KeywordExtractor::new(&client, RunMode::Narrative, &LlmSettings::default());
        let outcome = extractor.extract(&headlines()).await.unwrap();
        assert_eq!(
            outcome,
            ExtractionOutcome::Narrative("<h3>【금값】 상승</h3>, 오류".to_string())
        );
    }

    #[tokio::test]
    async fn test_extract_propagates_non_overload_failure() {
        let client = ScriptedClient::new(vec![Err(LlmError::MissingApiKey)]);
        let extractor = KeywordExtractor::new(&client, RunMode::Keywords, &LlmSettings::default());
        let err = extractor.extract(&headlines()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Llm(LlmError::MissingApiKey)));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extract_gives_up_after_three_overloads() {
        let inner = ScriptedClient::new(vec![
            Err(overloaded()),
            Err(overloaded()),
            Err(overloaded()),
            Ok("절대도달안함".to_string()),
        ]);
        let settings = LlmSettings::default();
        let client = RetryComplete::new(&inner, settings.retry_schedule());
        let extractor = KeywordExtractor::new(client, RunMode::Keywords, &settings);

        let t0 = tokio::time::Instant::now();
        let err = extractor.extract(&headlines()).await.unwrap_err();

        assert!(matches!(
            err,
            ExtractionError::Llm(LlmError::RetriesExhausted { attempts: 3 })
        ));
        assert_eq!(inner.calls(), 3);
        assert_eq!(t0.elapsed().as_secs(), Duration::from_secs(30 + 60 + 90).as_secs());
    }
}
