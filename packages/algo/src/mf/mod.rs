//! Incremental Matrix Factorization
//!
//! Online recommender that keeps one latent vector per user and per item and
//! adjusts the pair touched by each event with a single regularized SGD step.
//!
//! Per event:
//! 1. user row `u` is passed through the forgetting policy
//! 2. `p = dot(u, v)`, `err = rating - p`
//! 3. `u += lr * (err * v - reg * u)`, `v += lr * (err * u - reg * v)`,
//!    both computed from the values of step 1
//!
//! The faded `u` is what the step starts from and what gets written back;
//! items never fade. Randomness only enters at registration, so an update is
//! a pure function of the two rows, the rating and the configuration.
//!
//! Reference: J. Vinagre et al., "Fast Incremental Matrix Factorization for
//! Recommendation with Positive-only Feedback", UMAP 2014.

use crate::config::MfConfig;
use crate::error::{RecommenderError, Result};
use crate::factors::FactorStore;
use crate::forgetting::Forgetting;
use crate::matrix::{dot_product, gradient_step, l1_norm};
use crate::sanitize::has_invalid_values;
use crate::types::{EntityKind, Event, FactorDiagnostics, Recommendation, UpdateOutcome};

// ==================== Recommender Contract ====================

/// Operations an online recommender exposes to its event source and to its
/// serving/evaluation side.
pub trait Recommender {
    /// Make room for a user; returns whether it was new
    fn register_user(&mut self, user: usize) -> Result<bool>;

    /// Make room for an item; returns whether it was new
    fn register_item(&mut self, item: usize) -> Result<bool>;

    /// Learn from one event. Both identities must already be registered.
    fn update(&mut self, event: &Event) -> Result<UpdateOutcome>;

    /// Scores aligned with `candidates`
    fn score(&self, user: usize, candidates: &[usize]) -> Result<Vec<f64>>;

    /// Candidates sorted by descending score, ties in input order
    fn recommend(&self, user: usize, candidates: &[usize]) -> Result<Recommendation>;
}

// ==================== Matrix Factorization ====================

#[derive(Debug, Clone)]
pub struct MatrixFactorization {
    store: FactorStore,
    learning_rate: f64,
    l2_reg: f64,
    forgetting: Forgetting,
    update_count: u64,
}

impl MatrixFactorization {
    pub fn new(config: MfConfig) -> Result<Self> {
        config.validate()?;
        let store = FactorStore::new(config.k, config.init_std, config.seed)?;

        tracing::debug!(
            k = config.k,
            learning_rate = config.learning_rate,
            l2_reg = config.l2_reg,
            forgetting = ?config.forgetting,
            "matrix factorization initialized"
        );

        Ok(Self {
            store,
            learning_rate: config.learning_rate,
            l2_reg: config.l2_reg,
            forgetting: config.forgetting,
            update_count: 0,
        })
    }

    pub fn store(&self) -> &FactorStore {
        &self.store
    }

    pub fn dimension(&self) -> usize {
        self.store.dimension()
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn l2_reg(&self) -> f64 {
        self.l2_reg
    }

    pub fn forgetting(&self) -> Forgetting {
        self.forgetting
    }

    /// Successful updates so far
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn is_known_user(&self, user: usize) -> bool {
        self.store.is_registered(EntityKind::User, user)
    }

    pub fn is_known_item(&self, item: usize) -> bool {
        self.store.is_registered(EntityKind::Item, item)
    }

    pub fn user_factors(&self, user: usize) -> Result<&[f64]> {
        self.store.row(EntityKind::User, user)
    }

    pub fn item_factors(&self, item: usize) -> Result<&[f64]> {
        self.store.row(EntityKind::Item, item)
    }

    /// Overwrite a registered user's row (warm start)
    pub fn set_user_factors(&mut self, user: usize, values: &[f64]) -> Result<()> {
        self.store.set_row(EntityKind::User, user, values)
    }

    /// Overwrite a registered item's row (warm start)
    pub fn set_item_factors(&mut self, item: usize, values: &[f64]) -> Result<()> {
        self.store.set_row(EntityKind::Item, item, values)
    }

    /// `dot(u, v)` with no forgetting and no side effects
    pub fn predict(&self, user: usize, item: usize) -> Result<f64> {
        let u = self.store.row(EntityKind::User, user)?;
        let v = self.store.row(EntityKind::Item, item)?;
        Ok(dot_product(u, v))
    }

    /// `reg * (||u||₁² + ||v||₁²)` over the rows as currently stored.
    /// Called after `update`, this reads the post-update rows.
    pub fn reg_term(&self, user: usize, item: usize) -> Result<f64> {
        let u = self.store.row(EntityKind::User, user)?;
        let v = self.store.row(EntityKind::Item, item)?;
        Ok(reg_term_of(self.l2_reg, u, v))
    }

    /// One gradient step for `(user, item, rating)`
    pub fn update_indices(
        &mut self,
        user: usize,
        item: usize,
        rating: f64,
    ) -> Result<UpdateOutcome> {
        if !rating.is_finite() {
            return Err(RecommenderError::NonFiniteValue(format!(
                "rating {rating} for user {user}, item {item}"
            )));
        }

        let mut u = self.store.row(EntityKind::User, user)?.to_vec();
        let v = self.store.row(EntityKind::Item, item)?;

        if !self.forgetting.is_noop() {
            self.forgetting.apply_in_place(&mut u);
        }

        let prediction = dot_product(&u, v);
        let error = rating - prediction;
        let (u_new, v_new) = gradient_step(&u, v, error, self.learning_rate, self.l2_reg);

        if has_invalid_values(&u_new) || has_invalid_values(&v_new) {
            tracing::warn!(
                user,
                item,
                rating,
                prediction,
                "rejected update producing non-finite factors"
            );
            return Err(RecommenderError::NonFiniteValue(format!(
                "update for user {user}, item {item} diverged"
            )));
        }

        self.store.write_pair(user, &u_new, item, &v_new);
        self.update_count += 1;

        let reg_term = reg_term_of(self.l2_reg, &u_new, &v_new);
        tracing::trace!(user, item, rating, prediction, error, "factor update");

        Ok(UpdateOutcome {
            prediction,
            error,
            reg_term,
        })
    }

    /// Register the event's user and item if new, then update
    pub fn process(&mut self, event: &Event) -> Result<UpdateOutcome> {
        if !event.rating.is_finite() {
            return Err(RecommenderError::NonFiniteValue(format!(
                "rating {} for user {}, item {}",
                event.rating, event.user, event.item
            )));
        }
        self.store.register(EntityKind::User, event.user)?;
        self.store.register(EntityKind::Item, event.item)?;
        self.update(event)
    }

    /// Rank every registered item for `user`
    pub fn recommend_all(&self, user: usize) -> Result<Recommendation> {
        let candidates: Vec<usize> = self.store.registered(EntityKind::Item).collect();
        self.store.recommend(user, &candidates)
    }

    pub fn diagnose(&self) -> FactorDiagnostics {
        self.store.diagnose()
    }

    pub fn self_test(&self) -> bool {
        self.diagnose().is_healthy
    }
}

impl Recommender for MatrixFactorization {
    fn register_user(&mut self, user: usize) -> Result<bool> {
        self.store.register(EntityKind::User, user)
    }

    fn register_item(&mut self, item: usize) -> Result<bool> {
        self.store.register(EntityKind::Item, item)
    }

    fn update(&mut self, event: &Event) -> Result<UpdateOutcome> {
        self.update_indices(event.user, event.item, event.rating)
    }

    fn score(&self, user: usize, candidates: &[usize]) -> Result<Vec<f64>> {
        self.store.score(user, candidates)
    }

    fn recommend(&self, user: usize, candidates: &[usize]) -> Result<Recommendation> {
        self.store.recommend(user, candidates)
    }
}

fn reg_term_of(l2_reg: f64, u: &[f64], v: &[f64]) -> f64 {
    l2_reg * (l1_norm(u).powi(2) + l1_norm(v).powi(2))
}
