//! Explicit run configuration.
//!
//! Tunables come from an optional YAML settings file (every field has a
//! default), secrets come from the CLI or the environment. Both are folded into
//! an [`AppConfig`] once at startup; each component receives only its own
//! section in its constructor.

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::models::RunMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub http: HttpSettings,
    pub llm: LlmSettings,
    pub collectors: CollectorSettings,
    pub search_ad: SearchAdSettings,
    pub blog_search: BlogSearchSettings,
    pub resolver: ResolverSettings,
    pub report: ReportSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
            timeout_secs: 15,
            connect_timeout_secs: 5,
        }
    }
}

/// Separator the LLM is asked to use between keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordFormat {
    #[default]
    Comma,
    Newline,
}

impl KeywordFormat {
    pub fn separator(self) -> char {
        match self {
            KeywordFormat::Comma => ',',
            KeywordFormat::Newline => '\n',
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub narrative_max_tokens: u32,
    pub temperature: f32,
    pub keyword_format: KeywordFormat,
    /// Delay before each retry after an overload signal; its length bounds the
    /// number of attempts.
    pub retry_backoff_secs: Vec<u64>,
    /// Per-request limit for a completion, replacing the shared client's
    /// `http.timeout_secs`. Long replies take well over a minute.
    pub timeout_secs: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1024,
            narrative_max_tokens: 4096,
            temperature: 0.3,
            keyword_format: KeywordFormat::Comma,
            retry_backoff_secs: vec![30, 60, 90],
            timeout_secs: 180,
            api_key: None,
        }
    }
}

impl LlmSettings {
    pub fn retry_schedule(&self) -> Vec<Duration> {
        self.retry_backoff_secs
            .iter()
            .map(|s| Duration::from_secs(*s))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorSettings {
    pub naver_ranking_url: String,
    pub naver_limit: usize,
    pub daum_url: String,
    pub daum_backup_url: String,
    pub daum_limit: usize,
    pub policy_url: String,
    pub policy_rows: u32,
    /// Titles kept even without a benefit term, counted from the top.
    pub policy_min_items: usize,
    #[serde(skip)]
    pub policy_api_key: Option<String>,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            naver_ranking_url: "https://news.naver.com/main/ranking/popularDay.naver".to_string(),
            naver_limit: 20,
            daum_url: "https://news.daum.net/".to_string(),
            daum_backup_url: "https://news.daum.net/ranking/popular".to_string(),
            daum_limit: 15,
            policy_url: "http://apis.data.go.kr/1371000/policyNewsService/getPolicyNewsList"
                .to_string(),
            policy_rows: 10,
            policy_min_items: 3,
            policy_api_key: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchAdSettings {
    pub base_url: String,
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(skip)]
    pub secret: Option<String>,
    #[serde(skip)]
    pub customer_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BlogSearchSettings {
    pub base_url: String,
    #[serde(skip)]
    pub client_id: Option<String>,
    #[serde(skip)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub document_delay_ms: u64,
    pub top_n: usize,
    pub exclude_zero_volume: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay_ms: 100,
            document_delay_ms: 100,
            top_n: 50,
            exclude_zero_volume: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub report_file: String,
    pub archive_dir: String,
    pub snapshot_file: String,
    pub archive_display_limit: usize,
    /// `{keyword}` is replaced by the URL-encoded keyword.
    pub search_url_template: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            report_file: "index.html".to_string(),
            archive_dir: "archive".to_string(),
            snapshot_file: "keywords.json".to_string(),
            archive_display_limit: 10,
            search_url_template: "https://search.naver.com/search.naver?where=blog&query={keyword}"
                .to_string(),
        }
    }
}

// Substituted for empty `base_url` settings.
const SEARCH_AD_BASE_URL: &str = "https://api.naver.com";
const BLOG_SEARCH_BASE_URL: &str = "https://openapi.naver.com";

/// Everything a run needs, validated.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mode: RunMode,
    pub output_dir: PathBuf,
    pub template_path: PathBuf,
    pub settings: Settings,
}

impl AppConfig {
    /// Build the run configuration from parsed CLI arguments.
    #[instrument(level = "info", skip_all)]
    pub fn from_cli(cli: &Cli) -> Result<AppConfig, ConfigError> {
        let mut settings = match &cli.config {
            Some(path) => {
                let settings = load_settings(Path::new(path))?;
                info!(path = %path, "Loaded settings file");
                settings
            }
            None => Settings::default(),
        };

        if settings.search_ad.base_url.is_empty() {
            settings.search_ad.base_url = SEARCH_AD_BASE_URL.to_string();
        }
        if settings.blog_search.base_url.is_empty() {
            settings.blog_search.base_url = BLOG_SEARCH_BASE_URL.to_string();
        }

        settings.llm.api_key = non_empty(&cli.anthropic_api_key);
        settings.search_ad.api_key = non_empty(&cli.naver_ad_client_id);
        settings.search_ad.secret = non_empty(&cli.naver_ad_client_secret);
        settings.search_ad.customer_id = non_empty(&cli.naver_ad_customer_id);
        settings.blog_search.client_id = non_empty(&cli.naver_client_id);
        settings.blog_search.client_secret = non_empty(&cli.naver_client_secret);
        settings.collectors.policy_api_key = non_empty(&cli.data_go_kr_key);

        validate(&settings)?;

        Ok(AppConfig {
            mode: cli.mode,
            output_dir: PathBuf::from(&cli.output_dir),
            template_path: PathBuf::from(&cli.template),
            settings,
        })
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(&self.settings.report.report_file)
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.output_dir.join(&self.settings.report.archive_dir)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.output_dir.join(&self.settings.report.snapshot_file)
    }
}

pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_settings(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_settings(raw: &str) -> Result<Settings, serde_yaml::Error> {
    if raw.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(raw)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    let batch = settings.resolver.batch_size;
    if !(1..=100).contains(&batch) {
        return Err(ConfigError::Invalid {
            field: "resolver.batch_size",
            reason: format!("{batch} is outside 1..=100"),
        });
    }
    if settings.resolver.top_n == 0 {
        return Err(ConfigError::Invalid {
            field: "resolver.top_n",
            reason: "must be at least 1".to_string(),
        });
    }
    if settings.llm.timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            field: "llm.timeout_secs",
            reason: "must be at least 1".to_string(),
        });
    }
    if settings.llm.retry_backoff_secs.is_empty() {
        return Err(ConfigError::Invalid {
            field: "llm.retry_backoff_secs",
            reason: "at least one attempt is required".to_string(),
        });
    }
    Ok(())
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
