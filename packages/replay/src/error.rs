use streamrec_algo::RecommenderError;

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("no event file given (set REPLAY_EVENTS or pass a path)")]
    MissingInput,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("line {line}: {message}")]
    Parse { line: u64, message: String },
    #[error(transparent)]
    Model(#[from] RecommenderError),
}
