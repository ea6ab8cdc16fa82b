//! Command-line interface definitions.
//!
//! Paths and the run mode are flags; API credentials are flags that fall back
//! to environment variables (a `.env` file is loaded before parsing).

use crate::models::RunMode;
use clap::Parser;

/// Command-line arguments for a single pipeline run.
///
/// # Examples
///
/// ```sh
/// # Keyword report with credentials from .env
/// blog_keyword_radar -o ./output -t ./templates/layout.html
///
/// # Narrative report with tuned settings
/// blog_keyword_radar --mode narrative --config radar.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory receiving the current report, the JSON snapshot and the archive
    #[arg(short, long, default_value = "output")]
    pub output_dir: String,

    /// HTML template with {{content}}, {{date}} and optional {{archive}} slots
    #[arg(short, long, default_value = "templates/layout.html")]
    pub template: String,

    /// Optional path to a YAML settings file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Extraction contract for this run
    #[arg(long, value_enum, default_value_t = RunMode::Keywords)]
    pub mode: RunMode,

    /// Anthropic API key (required for extraction)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    /// Naver search-ad API key
    #[arg(long, env = "NAVER_AD_CLIENT_ID", hide_env_values = true)]
    pub naver_ad_client_id: Option<String>,

    /// Naver search-ad secret used to sign requests
    #[arg(long, env = "NAVER_AD_CLIENT_SECRET", hide_env_values = true)]
    pub naver_ad_client_secret: Option<String>,

    /// Naver search-ad customer id
    #[arg(long, env = "NAVER_AD_CUSTOMER_ID", hide_env_values = true)]
    pub naver_ad_customer_id: Option<String>,

    /// Naver open API client id (blog document counts)
    #[arg(long, env = "NAVER_CLIENT_ID", hide_env_values = true)]
    pub naver_client_id: Option<String>,

    /// Naver open API client secret
    #[arg(long, env = "NAVER_CLIENT_SECRET", hide_env_values = true)]
    pub naver_client_secret: Option<String>,

    /// data.go.kr service key for the policy briefing feed
    #[arg(long, env = "DATA_GO_KR_KEY", hide_env_values = true)]
    pub data_go_kr_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["blog_keyword_radar"]);
        assert_eq!(cli.output_dir, "output");
        assert_eq!(cli.template, "templates/layout.html");
        assert_eq!(cli.mode, RunMode::Keywords);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "blog_keyword_radar",
            "-o",
            "/tmp/out",
            "-t",
            "/tmp/layout.html",
            "-c",
            "/tmp/radar.yaml",
        ]);

        assert_eq!(cli.output_dir, "/tmp/out");
        assert_eq!(cli.template, "/tmp/layout.html");
        assert_eq!(cli.config.as_deref(), Some("/tmp/radar.yaml"));
    }

    #[test]
    fn test_cli_mode_flag() {
        let cli = Cli::parse_from(["blog_keyword_radar", "--mode", "narrative"]);
        assert_eq!(cli.mode, RunMode::Narrative);
        assert!(Cli::try_parse_from(["blog_keyword_radar", "--mode", "bogus"]).is_err());
    }
}
