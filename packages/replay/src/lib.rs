//! Replay harness for `streamrec-algo`: loads an interaction log and runs a
//! prequential evaluation of the incremental matrix factorization model.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod loader;
pub mod logging;

use streamrec_algo::MatrixFactorization;

use crate::config::ReplayConfig;
use crate::error::ReplayError;
use crate::evaluator::{Evaluator, PrequentialStats};

pub fn run(config: &ReplayConfig) -> Result<PrequentialStats, ReplayError> {
    let path = config.events_path.as_deref().ok_or(ReplayError::MissingInput)?;
    let events = loader::load_events(path)?;

    let model = MatrixFactorization::new(config.model.clone())?;
    let mut evaluator = Evaluator::new(model, config.top_n, config.progress_every);
    let stats = evaluator.run(&events)?;

    let diagnostics = evaluator.model().diagnose();
    tracing::info!(
        events = stats.events,
        evaluated = stats.evaluated,
        top_n = config.top_n,
        recall = stats.recall(),
        rmse = stats.rmse(),
        healthy = diagnostics.is_healthy,
        max_user_norm = diagnostics.max_user_norm,
        max_item_norm = diagnostics.max_item_norm,
        "replay finished"
    );
    if !diagnostics.is_healthy {
        tracing::warn!(message = %diagnostics.message, "factor diagnostics report a problem");
    }

    Ok(stats)
}
