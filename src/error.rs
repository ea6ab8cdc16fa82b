//! Error types for every pipeline stage.
//!
//! Only [`PipelineError`] ever reaches `main`. The per-stage enums are typed at
//! their origin so that each stage can decide whether a failure is local
//! (logged and replaced by an empty or zero value) or a hard stop.

use std::path::PathBuf;

/// A single headline source failed. Always recovered by the caller.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("no strategy matched the page markup")]
    MarkupDrift,
}

/// Failure talking to the text-completion provider.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM API key is not configured")]
    MissingApiKey,

    /// Provider signalled overload or rate limiting. The only retryable kind.
    #[error("provider overloaded (status {status}): {message}")]
    Overloaded { status: u16, message: String },

    #[error("provider returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned no text")]
    EmptyResponse,

    #[error("provider still overloaded after {attempts} attempts")]
    RetriesExhausted { attempts: usize },
}

impl LlmError {
    pub fn is_overload(&self) -> bool {
        matches!(self, LlmError::Overloaded { .. })
    }
}

/// The extraction stage produced nothing usable.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("response contained no usable keywords")]
    NoUsableKeywords,

    #[error("response contained no narrative body")]
    EmptyNarrative,
}

/// A metric sub-call failed. Degrades to a zero value for the affected keywords.
#[derive(Debug, thiserror::Error)]
pub enum MetricError {
    #[error("missing credential: {0}")]
    MissingCredentials(&'static str),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not sign request: {0}")]
    Signature(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("template not found at {path}: {source}")]
    TemplateMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Conditions that end a run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no headlines were collected from any source")]
    EmptyInput,

    #[error("keyword extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("report generation failed: {0}")]
    Report(#[from] ReportError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("could not build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl PipelineError {
    /// `true` for the two conditions that stop the run before a report exists.
    pub fn is_hard_stop(&self) -> bool {
        matches!(self, PipelineError::EmptyInput | PipelineError::Extraction(_))
    }

    /// Process exit status: 2 for hard stops, 1 for everything else.
    pub fn exit_code(&self) -> u8 {
        if self.is_hard_stop() { 2 } else { 1 }
    }
}
