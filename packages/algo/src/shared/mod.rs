//! Shared Recommender
//!
//! Thread-safe handle for concurrent ingestion. The whole model sits behind a
//! single reader-writer lock: registrations and updates take the write side,
//! scoring takes the read side. Row-level locking would be unsound because
//! registration may reallocate an entire matrix.
//!
//! `snapshot()` copies the factor store between updates so long-running
//! queries can be served without holding the lock.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::MfConfig;
use crate::error::Result;
use crate::factors::FactorStore;
use crate::mf::{MatrixFactorization, Recommender};
use crate::types::{EntityKind, Event, FactorDiagnostics, Recommendation, UpdateOutcome};

/// Cloneable handle; clones share one model
#[derive(Debug, Clone)]
pub struct SharedRecommender {
    inner: Arc<RwLock<MatrixFactorization>>,
}

impl SharedRecommender {
    pub fn new(config: MfConfig) -> Result<Self> {
        Ok(Self::from_model(MatrixFactorization::new(config)?))
    }

    pub fn from_model(model: MatrixFactorization) -> Self {
        Self {
            inner: Arc::new(RwLock::new(model)),
        }
    }

    pub fn register_user(&self, user: usize) -> Result<bool> {
        self.inner.write().register_user(user)
    }

    pub fn register_item(&self, item: usize) -> Result<bool> {
        self.inner.write().register_item(item)
    }

    pub fn update(&self, event: &Event) -> Result<UpdateOutcome> {
        self.inner.write().update(event)
    }

    /// Register-if-new and update under one write lock
    pub fn process(&self, event: &Event) -> Result<UpdateOutcome> {
        self.inner.write().process(event)
    }

    pub fn score(&self, user: usize, candidates: &[usize]) -> Result<Vec<f64>> {
        self.inner.read().score(user, candidates)
    }

    pub fn recommend(&self, user: usize, candidates: &[usize]) -> Result<Recommendation> {
        self.inner.read().recommend(user, candidates)
    }

    pub fn predict(&self, user: usize, item: usize) -> Result<f64> {
        self.inner.read().predict(user, item)
    }

    pub fn update_count(&self) -> u64 {
        self.inner.read().update_count()
    }

    pub fn diagnose(&self) -> FactorDiagnostics {
        self.inner.read().diagnose()
    }

    /// Immutable copy of the factors as of the last completed update
    pub fn snapshot(&self) -> ModelSnapshot {
        let model = self.inner.read();
        ModelSnapshot {
            store: Arc::new(model.store().clone()),
            update_count: model.update_count(),
        }
    }

    /// Run `f` with exclusive access, e.g. to warm-start rows
    pub fn with_model_mut<R>(&self, f: impl FnOnce(&mut MatrixFactorization) -> R) -> R {
        f(&mut self.inner.write())
    }
}

/// Read-only factors detached from the live model
#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    store: Arc<FactorStore>,
    update_count: u64,
}

impl ModelSnapshot {
    /// Number of updates the snapshot reflects
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn store(&self) -> &FactorStore {
        &self.store
    }

    pub fn score(&self, user: usize, candidates: &[usize]) -> Result<Vec<f64>> {
        self.store.score(user, candidates)
    }

    pub fn recommend(&self, user: usize, candidates: &[usize]) -> Result<Recommendation> {
        self.store.recommend(user, candidates)
    }

    pub fn recommend_all(&self, user: usize) -> Result<Recommendation> {
        let candidates: Vec<usize> = self.store.registered(EntityKind::Item).collect();
        self.store.recommend(user, &candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn shared() -> SharedRecommender {
        SharedRecommender::new(MfConfig::new(4, 0.05, 0.01, Default::default()).with_seed(11))
            .unwrap()
    }

    #[test]
    fn test_clones_share_state() {
        let a = shared();
        let b = a.clone();
        a.process(&Event::implicit(0, 0)).unwrap();
        assert_eq!(b.update_count(), 1);
        assert!(b.score(0, &[0]).is_ok());
    }

    #[test]
    fn test_concurrent_updates_all_land() {
        let rec = shared();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let rec = rec.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        rec.process(&Event::implicit(t, i % 5)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(rec.update_count(), 100);
        assert!(rec.diagnose().is_healthy);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_updates() {
        let rec = shared();
        rec.process(&Event::implicit(0, 0)).unwrap();
        let snap = rec.snapshot();
        let before = snap.score(0, &[0]).unwrap();

        for _ in 0..10 {
            rec.process(&Event::new(0, 0, 5.0)).unwrap();
        }
        rec.register_item(1).unwrap();

        assert_eq!(snap.score(0, &[0]).unwrap(), before);
        assert_eq!(snap.update_count(), 1);
        assert!(snap.score(0, &[1]).is_err());
        assert_ne!(rec.score(0, &[0]).unwrap(), before);
    }

    #[test]
    fn test_snapshot_recommend_all() {
        let rec = shared();
        rec.process(&Event::implicit(0, 2)).unwrap();
        rec.register_item(5).unwrap();
        let rec_list = rec.snapshot().recommend_all(0).unwrap();
        assert_eq!(rec_list.len(), 2);
    }

    #[test]
    fn test_with_model_mut() {
        let rec = shared();
        rec.register_user(0).unwrap();
        rec.register_item(0).unwrap();
        rec.with_model_mut(|m| {
            m.set_user_factors(0, &[1.0, 0.0, 0.0, 0.0])?;
            m.set_item_factors(0, &[2.0, 0.0, 0.0, 0.0])
        })
        .unwrap();
        assert_eq!(rec.predict(0, 0).unwrap(), 2.0);
    }
}
