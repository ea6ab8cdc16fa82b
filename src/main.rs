//! # Blog Keyword Radar
//!
//! A daily batch job that turns news headlines into a ranked list of blog
//! keywords. It collects headlines from a few Korean news sources, asks an
//! LLM for searchable keywords, scores each keyword by how saturated it is
//! with existing blog posts, and publishes an HTML report with an archive of
//! past reports.
//!
//! ## Usage
//!
//! ```sh
//! blog_keyword_radar -o ./output -t ./templates/layout.html
//! blog_keyword_radar --mode narrative
//! ```
//!
//! ## Architecture
//!
//! One run is a straight pipeline, every call awaited in turn:
//! 1. **Collecting**: each source is fetched; failing sources contribute nothing
//! 2. **Aggregating**: headlines are deduplicated; none at all stops the run
//! 3. **Extracting**: the LLM returns keywords (or a narrative); failure stops the run
//! 4. **Resolving**: search volume and blog counts give each keyword a saturation
//! 5. **Publishing**: the previous report is archived and the new one written
//!
//! Exit status is 0 on success, 2 when a run stops before producing a report
//! and 1 for configuration or I/O failures.

use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregator;
mod cli;
mod collectors;
mod config;
mod error;
mod extractor;
mod llm;
mod models;
mod outputs;
mod resolver;
mod utils;

use aggregator::aggregate;
use cli::Cli;
use collectors::daum::DaumNews;
use collectors::naver::NaverRanking;
use collectors::policy::PolicyBriefing;
use collectors::{build_http_client, run_source};
use config::AppConfig;
use error::PipelineError;
use extractor::KeywordExtractor;
use llm::{AnthropicClient, RetryComplete};
use models::{ExtractionOutcome, Keyword};
use outputs::ReportAssembler;
use outputs::json::Snapshot;
use resolver::MetricResolver;
use resolver::blog_search::BlogSearchClient;
use resolver::search_ad::SearchAdClient;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("blog_keyword_radar starting up");

    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) => debug!(error = %e, "No .env loaded"),
    }

    let args = Cli::parse();
    debug!(output_dir = %args.output_dir, template = %args.template, mode = %args.mode, "Parsed CLI arguments");

    let config = match AppConfig::from_cli(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::from(PipelineError::from(e).exit_code());
        }
    };

    // Early check: ensure the output dir is writable
    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return ExitCode::FAILURE;
    }

    let outcome = run(&config).await;
    let elapsed = start_time.elapsed();
    match outcome {
        Ok(report_path) => {
            info!(
                report = %report_path.display(),
                elapsed_secs = elapsed.as_secs_f64(),
                "Run completed"
            );
            ExitCode::SUCCESS
        }
        Err(e) if e.is_hard_stop() => {
            error!(error = %e, elapsed_secs = elapsed.as_secs_f64(), "Run stopped; no report produced");
            ExitCode::from(e.exit_code())
        }
        Err(e) => {
            error!(error = %e, elapsed_secs = elapsed.as_secs_f64(), "Run failed");
            ExitCode::from(e.exit_code())
        }
    }
}

#[instrument(level = "info", skip_all, fields(mode = %config.mode))]
async fn run(config: &AppConfig) -> Result<PathBuf, PipelineError> {
    let settings = &config.settings;
    let http = build_http_client(&settings.http).map_err(PipelineError::HttpClient)?;

    // ---- Collect & aggregate ----
    let naver = NaverRanking::new(&settings.collectors);
    let policy = PolicyBriefing::new(&settings.collectors);
    let daum = DaumNews::new(&settings.collectors);
    let per_source = vec![
        run_source(&naver, &http).await,
        run_source(&policy, &http).await,
        run_source(&daum, &http).await,
    ];
    let headlines = aggregate(per_source)?;

    // ---- Extract ----
    let llm = RetryComplete::new(
        AnthropicClient::new(&http, &settings.llm),
        settings.llm.retry_schedule(),
    );
    let extractor = KeywordExtractor::new(llm, config.mode, &settings.llm);
    let outcome = extractor.extract(&headlines).await?;

    // ---- Resolve metrics (keyword mode only) ----
    let (keywords, metrics): (&[Keyword], _) = match &outcome {
        ExtractionOutcome::Keywords(keywords) => {
            let resolver = MetricResolver::new(
                SearchAdClient::new(&http, &settings.search_ad, &settings.resolver),
                BlogSearchClient::new(&http, &settings.blog_search),
                &settings.resolver,
            );
            (keywords.as_slice(), resolver.resolve(keywords).await)
        }
        ExtractionOutcome::Narrative(_) => (&[], Vec::new()),
    };

    // ---- Publish ----
    let generated_at = Local::now().naive_local();
    let assembler = ReportAssembler::new(config);
    let report = assembler.build_report(&outcome, &metrics, generated_at);
    let snapshot = Snapshot::new(
        generated_at,
        config.mode,
        headlines.len(),
        keywords,
        &metrics,
    );
    let path = assembler.publish(&report, &snapshot).await?;
    Ok(path)
}
