use std::path::PathBuf;

use streamrec_algo::MfConfig;

const DEFAULT_TOP_N: usize = 10;
const DEFAULT_PROGRESS_EVERY: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub events_path: Option<PathBuf>,
    pub top_n: usize,
    pub progress_every: u64,
    pub log_level: String,
    pub model: MfConfig,
}

impl ReplayConfig {
    /// `cli_path` wins over `REPLAY_EVENTS`
    pub fn from_env(cli_path: Option<String>) -> Self {
        Self::from_lookup(cli_path, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        cli_path: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let events_path = cli_path
            .or_else(|| lookup("REPLAY_EVENTS"))
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let top_n = lookup("REPLAY_TOP_N")
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_TOP_N);

        let progress_every = lookup("REPLAY_PROGRESS_EVERY")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_PROGRESS_EVERY);

        let log_level = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Self {
            events_path,
            top_n,
            progress_every,
            log_level,
            model: MfConfig::from_lookup(lookup),
        }
    }
}
