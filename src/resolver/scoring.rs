//! Saturation scoring and ranking.

use crate::models::{Keyword, KeywordMetric, Tier};
use std::cmp::Ordering;

/// Saturation assigned when there is no search volume to divide by.
pub const UNSCOREABLE: f64 = 999.0;

/// `documents / volume`, rounded to two decimals. [`UNSCOREABLE`] when volume is 0.
///
/// Rounding works on the exact binary value of the ratio, so `61 / 200`
/// (stored just below 0.305) gives 0.3, and exact halves go to the even
/// digit.
pub fn saturation(volume: u64, documents: u64) -> f64 {
    if volume == 0 {
        return UNSCOREABLE;
    }
    let ratio = documents as f64 / volume as f64;
    format!("{ratio:.2}").parse().unwrap_or(ratio)
}

pub fn score(keyword: Keyword, volume: u64, documents: u64) -> KeywordMetric {
    let saturation = saturation(volume, documents);
    KeywordMetric {
        keyword,
        monthly_search_volume: volume,
        blog_document_count: documents,
        saturation,
        tier: Tier::from_saturation(saturation),
    }
}

/// Sort ascending by saturation; ties go to the higher volume.
pub fn rank(mut metrics: Vec<KeywordMetric>) -> Vec<KeywordMetric> {
    metrics.sort_by(compare);
    metrics
}

fn compare(a: &KeywordMetric, b: &KeywordMetric) -> Ordering {
    a.saturation
        .total_cmp(&b.saturation)
        .then_with(|| b.monthly_search_volume.cmp(&a.monthly_search_volume))
}
