//! Prequential (test-then-train) evaluation.
//!
//! Each event is first used as a test case, provided both its user and its
//! item are already known, and only then fed to the model.

use streamrec_algo::{Event, MatrixFactorization};

use crate::error::ReplayError;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PrequentialStats {
    pub events: u64,
    /// Events whose user and item were both known beforehand
    pub evaluated: u64,
    /// Evaluated events whose item made the top-N
    pub hits: u64,
    pub squared_error_sum: f64,
}

impl PrequentialStats {
    pub fn recall(&self) -> f64 {
        if self.evaluated == 0 {
            0.0
        } else {
            self.hits as f64 / self.evaluated as f64
        }
    }

    pub fn rmse(&self) -> f64 {
        if self.evaluated == 0 {
            0.0
        } else {
            (self.squared_error_sum / self.evaluated as f64).sqrt()
        }
    }
}

pub struct Evaluator {
    model: MatrixFactorization,
    top_n: usize,
    progress_every: u64,
    stats: PrequentialStats,
}

impl Evaluator {
    pub fn new(model: MatrixFactorization, top_n: usize, progress_every: u64) -> Self {
        Self {
            model,
            top_n,
            progress_every,
            stats: PrequentialStats::default(),
        }
    }

    pub fn model(&self) -> &MatrixFactorization {
        &self.model
    }

    pub fn stats(&self) -> PrequentialStats {
        self.stats
    }

    /// Test on `event`, then learn from it
    pub fn step(&mut self, event: &Event) -> Result<(), ReplayError> {
        if self.model.is_known_user(event.user) && self.model.is_known_item(event.item) {
            let rec = self.model.recommend_all(event.user)?.top(self.top_n);
            if rec.rank_of(event.item).is_some() {
                self.stats.hits += 1;
            }
            let prediction = self.model.predict(event.user, event.item)?;
            self.stats.squared_error_sum += (event.rating - prediction).powi(2);
            self.stats.evaluated += 1;
        }

        self.model.process(event)?;
        self.stats.events += 1;

        if self.progress_every > 0 && self.stats.events % self.progress_every == 0 {
            tracing::info!(
                events = self.stats.events,
                evaluated = self.stats.evaluated,
                recall = self.stats.recall(),
                rmse = self.stats.rmse(),
                "replay progress"
            );
        }
        Ok(())
    }

    pub fn run<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a Event>,
    ) -> Result<PrequentialStats, ReplayError> {
        for event in events {
            self.step(event)?;
        }
        Ok(self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamrec_algo::{Forgetting, MfConfig};

    fn evaluator(top_n: usize) -> Evaluator {
        let model =
            MatrixFactorization::new(MfConfig::new(4, 0.05, 0.01, Forgetting::None).with_seed(9))
                .unwrap();
        Evaluator::new(model, top_n, 0)
    }

    #[test]
    fn test_first_sight_events_are_not_evaluated() {
        let mut ev = evaluator(10);
        let events = [Event::implicit(0, 0), Event::implicit(1, 1), Event::implicit(0, 1)];
        let stats = ev.run(&events).unwrap();
        assert_eq!(stats.events, 3);
        assert_eq!(stats.evaluated, 1);
        // two known items and top-10: always a hit
        assert_eq!(stats.hits, 1);
        assert_eq!(ev.model().update_count(), 3);
    }

    #[test]
    fn test_empty_stats() {
        let stats = PrequentialStats::default();
        assert_eq!(stats.recall(), 0.0);
        assert_eq!(stats.rmse(), 0.0);
    }

    #[test]
    fn test_rmse_and_recall() {
        let stats = PrequentialStats {
            events: 10,
            evaluated: 4,
            hits: 1,
            squared_error_sum: 16.0,
        };
        assert_eq!(stats.recall(), 0.25);
        assert_eq!(stats.rmse(), 2.0);
    }

    #[test]
    fn test_model_error_propagates() {
        let mut ev = evaluator(5);
        let err = ev.step(&Event::new(0, 0, f64::INFINITY)).unwrap_err();
        assert!(matches!(err, ReplayError::Model(_)));
    }
}
