use serde::{Deserialize, Serialize};

use crate::error::{RecommenderError, Result};
use crate::forgetting::Forgetting;
use crate::types::{DEFAULT_INIT_STD, DEFAULT_L2_REG, DEFAULT_LATENT_DIM, DEFAULT_LEARNING_RATE};

/// Construction-time parameters of the matrix factorization recommender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MfConfig {
    /// Latent dimension
    pub k: usize,
    pub learning_rate: f64,
    pub l2_reg: f64,
    /// Std of the zero-mean normal new rows are drawn from
    pub init_std: f64,
    pub forgetting: Forgetting,
    /// RNG seed; time-derived when absent
    pub seed: Option<u64>,
}

impl Default for MfConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_LATENT_DIM,
            learning_rate: DEFAULT_LEARNING_RATE,
            l2_reg: DEFAULT_L2_REG,
            init_std: DEFAULT_INIT_STD,
            forgetting: Forgetting::None,
            seed: None,
        }
    }
}

impl MfConfig {
    pub fn new(k: usize, learning_rate: f64, l2_reg: f64, forgetting: Forgetting) -> Self {
        Self {
            k,
            learning_rate,
            l2_reg,
            forgetting,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_init_std(mut self, init_std: f64) -> Self {
        self.init_std = init_std;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(invalid("k must be positive".to_string()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(invalid(format!(
                "learning_rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        if !(self.l2_reg.is_finite() && self.l2_reg >= 0.0) {
            return Err(invalid(format!(
                "l2_reg must be non-negative and finite, got {}",
                self.l2_reg
            )));
        }
        if !(self.init_std.is_finite() && self.init_std >= 0.0) {
            return Err(invalid(format!(
                "init_std must be non-negative and finite, got {}",
                self.init_std
            )));
        }
        self.forgetting.validate()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: MfConfig = serde_json::from_str(json)
            .map_err(|e| invalid(format!("malformed config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read `STREAMREC_*` variables; unparsable values fall back to defaults.
    /// Validation is left to the caller.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`MfConfig::from_env`] over an arbitrary key-value source.
    /// Setting `STREAMREC_FADE_ALPHA` selects exponential fade.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let k = parsed(lookup("STREAMREC_K")).unwrap_or(defaults.k);
        let learning_rate =
            parsed(lookup("STREAMREC_LEARNING_RATE")).unwrap_or(defaults.learning_rate);
        let l2_reg = parsed(lookup("STREAMREC_L2_REG")).unwrap_or(defaults.l2_reg);
        let init_std = parsed(lookup("STREAMREC_INIT_STD")).unwrap_or(defaults.init_std);
        let forgetting = parsed::<f64>(lookup("STREAMREC_FADE_ALPHA"))
            .map(|alpha| Forgetting::ExponentialFade { alpha })
            .unwrap_or(defaults.forgetting);
        let seed = parsed(lookup("STREAMREC_SEED"));

        Self {
            k,
            learning_rate,
            l2_reg,
            init_std,
            forgetting,
            seed,
        }
    }
}

fn invalid(msg: String) -> RecommenderError {
    RecommenderError::InvalidConfiguration(msg)
}

fn parsed<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|value| value.trim().parse::<T>().ok())
}
