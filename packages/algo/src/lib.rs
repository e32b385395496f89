//! # streamrec-algo - streaming recommendation core
//!
//! Pure Rust incremental matrix factorization for event-at-a-time
//! recommendation:
//!
//! - **Factor Store** - growable user/item latent matrices keyed by dense index
//! - **Forgetting** - optional exponential fading of user factors
//! - **Update Engine** - one regularized SGD step per observed event
//! - **Ranking** - dot-product scoring with stable descending sort
//!
//! ## Module layout
//!
//! - [`factors`] - factor store (registration, growth, scoring)
//! - [`forgetting`] - forgetting policies
//! - [`mf`] - the matrix factorization recommender and the `Recommender` trait
//! - [`ranking`] - score-to-ranking conversion
//! - [`shared`] - lock-protected handle and snapshots for concurrent use
//! - [`matrix`] - vector math
//! - [`sanitize`] - finite checks and health diagnostics
//! - [`config`] - construction parameters
//! - [`types`] - shared types and constants
//!
//! ## Example
//!
//! ```rust
//! use streamrec_algo::{Event, Forgetting, MatrixFactorization, MfConfig, Recommender};
//!
//! let config = MfConfig::new(8, 0.05, 0.01, Forgetting::None).with_seed(42);
//! let mut mf = MatrixFactorization::new(config).unwrap();
//!
//! mf.process(&Event::implicit(0, 3)).unwrap();
//! mf.register_item(5).unwrap();
//!
//! let rec = mf.recommend(0, &[3, 5]).unwrap();
//! assert_eq!(rec.items.len(), 2);
//! ```

#![deny(clippy::all)]

// ============================================================================
// Modules
// ============================================================================

pub mod config;
pub mod error;
pub mod factors;
pub mod forgetting;
pub mod matrix;
pub mod mf;
pub mod ranking;
pub mod sanitize;
pub mod shared;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::MfConfig;
pub use error::{RecommenderError, Result};
pub use factors::{FactorMatrix, FactorStore};
pub use forgetting::Forgetting;
pub use mf::{MatrixFactorization, Recommender};
pub use ranking::scores_to_recos;
pub use shared::{ModelSnapshot, SharedRecommender};
pub use types::*;
