//! Common Types and Constants
//!
//! Shared data structures used across the factor store, the update engine and
//! the ranker.

use std::fmt;

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Default latent dimension
pub const DEFAULT_LATENT_DIM: usize = 40;

/// Default SGD step size
pub const DEFAULT_LEARNING_RATE: f64 = 0.003;

/// Default L2 regularization coefficient
pub const DEFAULT_L2_REG: f64 = 0.01;

/// Standard deviation of the normal distribution new rows are drawn from
pub const DEFAULT_INIT_STD: f64 = 0.2;

/// Default decay constant for exponential user-factor fading
pub const DEFAULT_FADE_ALPHA: f64 = 0.999999;

/// Candidate count from which scoring fans out over the rayon pool
pub const PARALLEL_SCORE_THRESHOLD: usize = 4096;

/// Row norm above which diagnostics report drift
pub const MAX_HEALTHY_ROW_NORM: f64 = 1e6;

// ==================== Identity ====================

/// Which factor matrix an index addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Item,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Item => "item",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== Events ====================

/// One observed user-item interaction
///
/// For implicit feedback the rating is a constant positive signal (1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub user: usize,
    pub item: usize,
    pub rating: f64,
}

impl Event {
    pub fn new(user: usize, item: usize, rating: f64) -> Self {
        Self { user, item, rating }
    }

    /// Positive-only feedback event
    pub fn implicit(user: usize, item: usize) -> Self {
        Self::new(user, item, 1.0)
    }
}

/// Result of a single gradient step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// dot(u, v) before the step (after forgetting)
    pub prediction: f64,
    /// rating - prediction
    pub error: f64,
    /// Regularization term over the rows as written back
    pub reg_term: f64,
}

// ==================== Ranking ====================

/// Candidates sorted by descending score, positionally aligned
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub items: Vec<usize>,
    pub scores: Vec<f64>,
}

impl Recommendation {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keep the first `n` entries
    pub fn top(mut self, n: usize) -> Self {
        self.items.truncate(n);
        self.scores.truncate(n);
        self
    }

    /// Position of `item` in the ranking, if present
    pub fn rank_of(&self, item: usize) -> Option<usize> {
        self.items.iter().position(|&i| i == item)
    }
}

// ==================== Diagnostics ====================

/// Health report over both factor matrices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorDiagnostics {
    pub is_healthy: bool,
    pub has_nan: bool,
    pub has_inf: bool,
    pub max_user_norm: f64,
    pub max_item_norm: f64,
    pub registered_users: usize,
    pub registered_items: usize,
    pub message: String,
}

// ==================== Tests ====================
