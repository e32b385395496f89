//! Factor Store
//!
//! Two growable row-major matrices, one row per user and one per item, each
//! row a latent vector of fixed length `k`.
//!
//! Rows are addressed by the externally assigned integer index. Registering
//! index `i` grows the matrix to at least `i + 1` rows, drawing every new row
//! from a zero-mean normal distribution. Rows that were allocated to fill a
//! gap stay unreadable until their own index is registered.
//!
//! Invariants:
//! - row count never shrinks
//! - registration never overwrites existing values
//! - only registered rows are readable or scorable

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;
use rayon::prelude::*;

use crate::error::{RecommenderError, Result};
use crate::matrix::dot_product;
use crate::ranking::scores_to_recos;
use crate::sanitize::{diagnose_factors, ensure_finite};
use crate::types::{EntityKind, FactorDiagnostics, Recommendation, PARALLEL_SCORE_THRESHOLD};

// ==================== Factor Matrix ====================

/// Row-major latent matrix with per-row registration flags
#[derive(Debug, Clone, PartialEq)]
pub struct FactorMatrix {
    k: usize,
    data: Vec<f64>,
    registered: Vec<bool>,
    registered_count: usize,
}

impl FactorMatrix {
    fn new(k: usize) -> Self {
        Self {
            k,
            data: Vec::new(),
            registered: Vec::new(),
            registered_count: 0,
        }
    }

    /// Allocated rows, registered or not
    pub fn rows(&self) -> usize {
        self.registered.len()
    }

    pub fn dimension(&self) -> usize {
        self.k
    }

    pub fn registered_count(&self) -> usize {
        self.registered_count
    }

    pub fn is_registered(&self, index: usize) -> bool {
        self.registered.get(index).copied().unwrap_or(false)
    }

    /// Raw storage, `rows() * dimension()` values
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        if self.is_registered(index) {
            Some(self.slice(index))
        } else {
            None
        }
    }

    pub fn registered_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.registered
            .iter()
            .enumerate()
            .filter_map(|(i, &r)| r.then_some(i))
    }

    fn slice(&self, index: usize) -> &[f64] {
        &self.data[index * self.k..(index + 1) * self.k]
    }

    fn slice_mut(&mut self, index: usize) -> &mut [f64] {
        &mut self.data[index * self.k..(index + 1) * self.k]
    }

    /// Append freshly drawn rows until `rows` exist; returns how many were added.
    /// `None` when the storage for `rows` cannot be sized or allocated.
    fn grow_to(
        &mut self,
        rows: usize,
        rng: &mut ChaCha8Rng,
        init: &Normal<f64>,
    ) -> Option<usize> {
        let current = self.rows();
        if rows <= current {
            return Some(0);
        }
        let added = rows - current;
        rows.checked_mul(self.k)?;
        let values = added * self.k;
        self.data.try_reserve_exact(values).ok()?;
        self.registered.try_reserve_exact(added).ok()?;
        for _ in 0..values {
            self.data.push(init.sample(rng));
        }
        self.registered.resize(rows, false);
        Some(added)
    }

    fn unregistered(&self, kind: EntityKind, index: usize) -> RecommenderError {
        RecommenderError::UnregisteredEntity {
            kind,
            index,
            rows: self.rows(),
        }
    }
}

// ==================== Factor Store ====================

/// User and item factor matrices plus the RNG that initializes new rows
#[derive(Debug, Clone)]
pub struct FactorStore {
    k: usize,
    users: FactorMatrix,
    items: FactorMatrix,
    rng: ChaCha8Rng,
    init: Normal<f64>,
}

impl FactorStore {
    /// Create an empty store. `seed` makes row initialization reproducible.
    pub fn new(k: usize, init_std: f64, seed: Option<u64>) -> Result<Self> {
        if k == 0 {
            return Err(RecommenderError::InvalidConfiguration(
                "k must be positive".to_string(),
            ));
        }
        let init = Normal::new(0.0, init_std).map_err(|e| {
            RecommenderError::InvalidConfiguration(format!("init_std {init_std}: {e}"))
        })?;

        let seed = seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(42)
        });

        Ok(Self {
            k,
            users: FactorMatrix::new(k),
            items: FactorMatrix::new(k),
            rng: ChaCha8Rng::seed_from_u64(seed),
            init,
        })
    }

    pub fn dimension(&self) -> usize {
        self.k
    }

    pub fn matrix(&self, kind: EntityKind) -> &FactorMatrix {
        match kind {
            EntityKind::User => &self.users,
            EntityKind::Item => &self.items,
        }
    }

    fn matrix_mut(&mut self, kind: EntityKind) -> &mut FactorMatrix {
        match kind {
            EntityKind::User => &mut self.users,
            EntityKind::Item => &mut self.items,
        }
    }

    pub fn rows(&self, kind: EntityKind) -> usize {
        self.matrix(kind).rows()
    }

    pub fn registered_count(&self, kind: EntityKind) -> usize {
        self.matrix(kind).registered_count()
    }

    pub fn is_registered(&self, kind: EntityKind, index: usize) -> bool {
        self.matrix(kind).is_registered(index)
    }

    pub fn registered(&self, kind: EntityKind) -> impl Iterator<Item = usize> + '_ {
        self.matrix(kind).registered_indices()
    }

    /// Ensure a row exists at `index` and mark it registered.
    ///
    /// Returns `true` when the identity was not registered before. Calling it
    /// again for the same index changes nothing, RNG state included. Fails
    /// with `CapacityExceeded` when the matrix cannot grow to hold `index`;
    /// the store is left unchanged in that case.
    pub fn register(&mut self, kind: EntityKind, index: usize) -> Result<bool> {
        let Self {
            users,
            items,
            rng,
            init,
            ..
        } = self;
        let matrix = match kind {
            EntityKind::User => users,
            EntityKind::Item => items,
        };
        let grown = index
            .checked_add(1)
            .and_then(|rows| matrix.grow_to(rows, rng, init));
        let Some(added) = grown else {
            tracing::warn!(kind = %kind, index, "factor matrix cannot grow to index");
            return Err(RecommenderError::CapacityExceeded { kind, index });
        };
        if added > 0 {
            tracing::debug!(
                kind = %kind,
                added,
                rows = matrix.rows(),
                "grew factor matrix"
            );
        }
        if matrix.registered[index] {
            return Ok(false);
        }
        matrix.registered[index] = true;
        matrix.registered_count += 1;
        tracing::debug!(kind = %kind, index, "registered identity");
        Ok(true)
    }

    /// Current latent vector of a registered identity
    pub fn row(&self, kind: EntityKind, index: usize) -> Result<&[f64]> {
        let matrix = self.matrix(kind);
        matrix
            .row(index)
            .ok_or_else(|| matrix.unregistered(kind, index))
    }

    /// Overwrite a registered row with caller-supplied values
    pub fn set_row(&mut self, kind: EntityKind, index: usize, values: &[f64]) -> Result<()> {
        let matrix = self.matrix(kind);
        if !matrix.is_registered(index) {
            return Err(matrix.unregistered(kind, index));
        }
        if values.len() != self.k {
            return Err(RecommenderError::DimensionMismatch {
                expected: self.k,
                actual: values.len(),
            });
        }
        ensure_finite(&format!("{kind} {index} row"), values)?;

        self.matrix_mut(kind)
            .slice_mut(index)
            .copy_from_slice(values);
        Ok(())
    }

    /// Write back the result of an update. Both rows must be registered and
    /// both vectors `k` long; the update engine checks this before calling.
    pub(crate) fn write_pair(&mut self, user: usize, u: &[f64], item: usize, v: &[f64]) {
        self.users.slice_mut(user).copy_from_slice(u);
        self.items.slice_mut(item).copy_from_slice(v);
    }

    // ==================== Scoring ====================

    /// `dot(u, v_c)` for every candidate, aligned with `candidates`
    pub fn score(&self, user: usize, candidates: &[usize]) -> Result<Vec<f64>> {
        self.score_with(user, candidates, candidates.len() >= PARALLEL_SCORE_THRESHOLD)
    }

    fn score_with(&self, user: usize, candidates: &[usize], parallel: bool) -> Result<Vec<f64>> {
        let u = self.row(EntityKind::User, user)?;

        // validate everything first so a failure never yields partial scores
        if let Some(&bad) = candidates.iter().find(|&&c| !self.items.is_registered(c)) {
            return Err(self.items.unregistered(EntityKind::Item, bad));
        }

        let items = &self.items;
        let scores: Vec<f64> = if parallel {
            candidates
                .par_iter()
                .map(|&c| dot_product(u, items.slice(c)))
                .collect()
        } else {
            candidates
                .iter()
                .map(|&c| dot_product(u, items.slice(c)))
                .collect()
        };
        Ok(scores)
    }

    /// Candidates ranked by descending score, ties in input order
    pub fn recommend(&self, user: usize, candidates: &[usize]) -> Result<Recommendation> {
        let scores = self.score(user, candidates)?;
        scores_to_recos(candidates, &scores)
    }

    pub fn diagnose(&self) -> FactorDiagnostics {
        diagnose_factors(
            self.users.as_slice(),
            self.items.as_slice(),
            self.k,
            self.users.registered_count(),
            self.items.registered_count(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(k: usize) -> FactorStore {
        FactorStore::new(k, 0.2, Some(7)).unwrap()
    }

    fn bits(m: &FactorMatrix) -> Vec<u64> {
        m.as_slice().iter().map(|x| x.to_bits()).collect()
    }

    #[test]
    fn test_new_rejects_zero_dimension() {
        assert!(matches!(
            FactorStore::new(0, 0.2, None),
            Err(RecommenderError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_new_rejects_negative_std() {
        assert!(matches!(
            FactorStore::new(3, -1.0, None),
            Err(RecommenderError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_register_grows_to_index_plus_one() {
        let mut s = store(3);
        assert!(s.register(EntityKind::User, 4).unwrap());
        assert_eq!(s.rows(EntityKind::User), 5);
        assert_eq!(s.matrix(EntityKind::User).as_slice().len(), 15);
        assert_eq!(s.registered_count(EntityKind::User), 1);
        assert_eq!(s.rows(EntityKind::Item), 0);
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut s = store(4);
        s.register(EntityKind::Item, 2).unwrap();
        let before = bits(s.matrix(EntityKind::Item));
        assert!(!s.register(EntityKind::Item, 2).unwrap());
        assert_eq!(bits(s.matrix(EntityKind::Item)), before);
        assert_eq!(s.registered_count(EntityKind::Item), 1);
    }

    #[test]
    fn test_register_preserves_existing_rows() {
        let mut s = store(2);
        s.register(EntityKind::User, 0).unwrap();
        let first = s.row(EntityKind::User, 0).unwrap().to_vec();
        s.register(EntityKind::User, 10).unwrap();
        assert_eq!(s.row(EntityKind::User, 0).unwrap(), first.as_slice());
    }

    #[test]
    fn test_register_gap_row_keeps_values() {
        let mut s = store(2);
        s.register(EntityKind::User, 3).unwrap();
        let gap = s.matrix(EntityKind::User).as_slice()[2..4].to_vec();
        assert!(s.register(EntityKind::User, 1).unwrap());
        assert_eq!(s.rows(EntityKind::User), 4);
        assert_eq!(s.row(EntityKind::User, 1).unwrap(), gap.as_slice());
    }

    #[test]
    fn test_register_rejects_unaddressable_index() {
        let mut s = store(4);
        s.register(EntityKind::User, 1).unwrap();
        let before = bits(s.matrix(EntityKind::User));

        for index in [usize::MAX, usize::MAX / 2] {
            assert_eq!(
                s.register(EntityKind::User, index),
                Err(RecommenderError::CapacityExceeded {
                    kind: EntityKind::User,
                    index,
                })
            );
        }
        assert_eq!(s.rows(EntityKind::User), 2);
        assert_eq!(s.registered_count(EntityKind::User), 1);
        assert_eq!(bits(s.matrix(EntityKind::User)), before);

        // the failed attempts drew nothing from the RNG
        let mut fresh = store(4);
        fresh.register(EntityKind::User, 1).unwrap();
        fresh.register(EntityKind::Item, 0).unwrap();
        s.register(EntityKind::Item, 0).unwrap();
        assert_eq!(
            s.row(EntityKind::Item, 0).unwrap(),
            fresh.row(EntityKind::Item, 0).unwrap()
        );
    }

    #[test]
    fn test_row_unregistered_beyond_rows() {
        let s = store(2);
        let err = s.row(EntityKind::Item, 0).unwrap_err();
        assert_eq!(
            err,
            RecommenderError::UnregisteredEntity {
                kind: EntityKind::Item,
                index: 0,
                rows: 0
            }
        );
    }

    #[test]
    fn test_row_unregistered_gap() {
        let mut s = store(2);
        s.register(EntityKind::Item, 5).unwrap();
        assert!(s.row(EntityKind::Item, 5).is_ok());
        assert!(matches!(
            s.row(EntityKind::Item, 2),
            Err(RecommenderError::UnregisteredEntity { index: 2, rows: 6, .. })
        ));
    }

    #[test]
    fn test_same_seed_same_rows() {
        let mut a = store(5);
        let mut b = store(5);
        a.register(EntityKind::User, 3).unwrap();
        b.register(EntityKind::User, 3).unwrap();
        assert_eq!(bits(a.matrix(EntityKind::User)), bits(b.matrix(EntityKind::User)));
    }

    #[test]
    fn test_zero_std_gives_zero_rows() {
        let mut s = FactorStore::new(3, 0.0, Some(1)).unwrap();
        s.register(EntityKind::Item, 1).unwrap();
        assert!(s.matrix(EntityKind::Item).as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_set_row_checks() {
        let mut s = store(2);
        assert!(matches!(
            s.set_row(EntityKind::User, 0, &[1.0, 0.0]),
            Err(RecommenderError::UnregisteredEntity { .. })
        ));
        s.register(EntityKind::User, 0).unwrap();
        assert_eq!(
            s.set_row(EntityKind::User, 0, &[1.0]),
            Err(RecommenderError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert!(matches!(
            s.set_row(EntityKind::User, 0, &[1.0, f64::NAN]),
            Err(RecommenderError::NonFiniteValue(_))
        ));
        s.set_row(EntityKind::User, 0, &[1.0, 0.0]).unwrap();
        assert_eq!(s.row(EntityKind::User, 0).unwrap(), &[1.0, 0.0]);
    }

    #[test]
    fn test_score_matches_dot_products() {
        let mut s = store(3);
        s.register(EntityKind::User, 0).unwrap();
        for i in 0..4 {
            s.register(EntityKind::Item, i).unwrap();
        }
        let candidates = [3, 0, 2];
        let scores = s.score(0, &candidates).unwrap();
        let u = s.row(EntityKind::User, 0).unwrap();
        for (score, &c) in scores.iter().zip(candidates.iter()) {
            assert_eq!(*score, dot_product(u, s.row(EntityKind::Item, c).unwrap()));
        }
    }

    #[test]
    fn test_parallel_scoring_matches_sequential() {
        let mut s = store(8);
        s.register(EntityKind::User, 0).unwrap();
        for i in 0..64 {
            s.register(EntityKind::Item, i).unwrap();
        }
        let candidates: Vec<usize> = (0..64).rev().collect();
        let seq = s.score_with(0, &candidates, false).unwrap();
        let par = s.score_with(0, &candidates, true).unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn test_score_rejects_unregistered_candidate() {
        let mut s = store(2);
        s.register(EntityKind::User, 0).unwrap();
        s.register(EntityKind::Item, 3).unwrap();
        let err = s.score(0, &[3, 1]).unwrap_err();
        assert!(matches!(
            err,
            RecommenderError::UnregisteredEntity {
                kind: EntityKind::Item,
                index: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_score_empty_candidates() {
        let mut s = store(2);
        s.register(EntityKind::User, 0).unwrap();
        assert!(s.score(0, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_registered_iterator() {
        let mut s = store(2);
        s.register(EntityKind::Item, 4).unwrap();
        s.register(EntityKind::Item, 1).unwrap();
        let ids: Vec<usize> = s.registered(EntityKind::Item).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn test_diagnose_fresh_store() {
        let mut s = store(4);
        s.register(EntityKind::User, 2).unwrap();
        s.register(EntityKind::Item, 0).unwrap();
        let diag = s.diagnose();
        assert!(diag.is_healthy);
        assert_eq!(diag.registered_users, 1);
        assert_eq!(diag.registered_items, 1);
    }
}
