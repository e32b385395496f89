use crate::types::EntityKind;

/// Errors surfaced by the recommender core. All of them signal caller misuse;
/// none is retryable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecommenderError {
    #[error("unregistered {kind} {index} (matrix holds {rows} rows)")]
    UnregisteredEntity {
        kind: EntityKind,
        index: usize,
        rows: usize,
    },
    #[error("{kind} index {index} exceeds factor matrix capacity")]
    CapacityExceeded { kind: EntityKind, index: usize },
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("non-finite value: {0}")]
    NonFiniteValue(String),
}

pub type Result<T> = std::result::Result<T, RecommenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_message() {
        let err = RecommenderError::UnregisteredEntity {
            kind: EntityKind::Item,
            index: 12,
            rows: 3,
        };
        assert_eq!(err.to_string(), "unregistered item 12 (matrix holds 3 rows)");
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = RecommenderError::DimensionMismatch {
            expected: 4,
            actual: 2,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 4, got 2");
    }

    #[test]
    fn test_capacity_message() {
        let err = RecommenderError::CapacityExceeded {
            kind: EntityKind::User,
            index: usize::MAX,
        };
        assert_eq!(
            err.to_string(),
            format!("user index {} exceeds factor matrix capacity", usize::MAX)
        );
    }
}
