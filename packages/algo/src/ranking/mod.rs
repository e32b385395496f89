//! Score-to-ranking conversion.
//!
//! Sorting is stable: candidates with equal scores keep their relative input
//! order. `0.0` and `-0.0` count as a tie; NaN scores sink to the bottom.

use crate::error::{RecommenderError, Result};
use crate::types::Recommendation;

/// Sort `candidates` by descending `scores`
pub fn scores_to_recos(candidates: &[usize], scores: &[f64]) -> Result<Recommendation> {
    if candidates.len() != scores.len() {
        return Err(RecommenderError::DimensionMismatch {
            expected: candidates.len(),
            actual: scores.len(),
        });
    }

    let keys: Vec<f64> = scores.iter().map(|&s| sort_key(s)).collect();
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    // slice::sort_by is stable
    order.sort_by(|&a, &b| keys[b].total_cmp(&keys[a]));

    Ok(Recommendation {
        items: order.iter().map(|&i| candidates[i]).collect(),
        scores: order.iter().map(|&i| scores[i]).collect(),
    })
}

fn sort_key(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        // folds -0.0 into 0.0
        score + 0.0
    }
}
