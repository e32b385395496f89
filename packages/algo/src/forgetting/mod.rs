//! Forgetting Policies
//!
//! Temporal decay applied to a user's factor vector before each update, modelling
//! drift in user taste. Policies are stateless and time-unaware: "once per
//! call" is the only unit they know about.
//!
//! - `None` leaves the vector unchanged
//! - `ExponentialFade { alpha }` scales every component by `alpha`, `alpha` in (0, 1]

use serde::{Deserialize, Serialize};

use crate::error::{RecommenderError, Result};
use crate::matrix::scale_in_place;
use crate::types::DEFAULT_FADE_ALPHA;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Forgetting {
    #[default]
    None,
    ExponentialFade { alpha: f64 },
}

impl Forgetting {
    /// Validated exponential fade
    pub fn exponential(alpha: f64) -> Result<Self> {
        let policy = Forgetting::ExponentialFade { alpha };
        policy.validate()?;
        Ok(policy)
    }

    /// Exponential fade with the default near-one decay
    pub fn default_fade() -> Self {
        Forgetting::ExponentialFade {
            alpha: DEFAULT_FADE_ALPHA,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            Forgetting::None => Ok(()),
            Forgetting::ExponentialFade { alpha } => {
                // NaN fails both comparisons
                if alpha > 0.0 && alpha <= 1.0 {
                    Ok(())
                } else {
                    Err(RecommenderError::InvalidConfiguration(format!(
                        "fade alpha must be in (0, 1], got {alpha}"
                    )))
                }
            }
        }
    }

    pub fn is_noop(&self) -> bool {
        match *self {
            Forgetting::None => true,
            Forgetting::ExponentialFade { alpha } => alpha == 1.0,
        }
    }

    pub fn apply(&self, user_vec: &[f64]) -> Vec<f64> {
        let mut out = user_vec.to_vec();
        self.apply_in_place(&mut out);
        out
    }

    pub fn apply_in_place(&self, user_vec: &mut [f64]) {
        match *self {
            Forgetting::None => {}
            Forgetting::ExponentialFade { alpha } => scale_in_place(user_vec, alpha),
        }
    }
}
