//! Merge per-source headline lists into one deduplicated [`HeadlineSet`].
//!
//! An empty union is the first of the two conditions that stop a run.

use crate::error::PipelineError;
use crate::models::HeadlineSet;
use itertools::Itertools;
use tracing::{error, info, instrument};

/// Merge, trim and deduplicate (exact, case-sensitive) headlines.
#[instrument(level = "info", skip_all, fields(sources = per_source.len()))]
pub fn aggregate(per_source: Vec<Vec<String>>) -> Result<HeadlineSet, PipelineError> {
    let total: usize = per_source.iter().map(Vec::len).sum();

    let unique: Vec<String> = per_source
        .into_iter()
        .flatten()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unique()
        .collect();

    if unique.is_empty() {
        error!(total, "No headlines collected from any source");
        return Err(PipelineError::EmptyInput);
    }

    info!(total, unique = unique.len(), "Aggregated headlines");
    Ok(HeadlineSet::from_unique(unique))
}
