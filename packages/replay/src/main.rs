use std::process::ExitCode;

use streamrec_replay::config::ReplayConfig;
use streamrec_replay::logging::{init_tracing, LogSettings};

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = ReplayConfig::from_env(std::env::args().nth(1));
    let _log_guard = init_tracing(&LogSettings::from_env(&config.log_level));

    if let Err(err) = config.model.validate() {
        tracing::error!(error = %err, "invalid model configuration");
        return ExitCode::FAILURE;
    }

    tracing::info!(
        k = config.model.k,
        learning_rate = config.model.learning_rate,
        l2_reg = config.model.l2_reg,
        forgetting = ?config.model.forgetting,
        "starting replay"
    );

    match streamrec_replay::run(&config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "replay failed");
            ExitCode::FAILURE
        }
    }
}
