//! Data Sanitization
//!
//! Numerical stability utilities.
//!
//! Functions:
//! - Finite-value checks for ratings, injected rows and update results
//! - Row norm scans over a factor matrix
//! - Factor store health diagnostics

use crate::error::{RecommenderError, Result};
use crate::matrix::l2_norm;
use crate::types::{FactorDiagnostics, MAX_HEALTHY_ROW_NORM};

/// True when `arr` holds NaN or Inf
pub fn has_invalid_values(arr: &[f64]) -> bool {
    arr.iter().any(|&x| x.is_nan() || x.is_infinite())
}

/// Fail with `NonFiniteValue` when `arr` holds NaN or Inf
pub fn ensure_finite(what: &str, arr: &[f64]) -> Result<()> {
    if has_invalid_values(arr) {
        return Err(RecommenderError::NonFiniteValue(format!(
            "{what} contains NaN or infinite components"
        )));
    }
    Ok(())
}

/// Scan of a row-major matrix with `k` columns
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RowScan {
    pub has_nan: bool,
    pub has_inf: bool,
    /// Largest finite row L2 norm
    pub max_norm: f64,
}

pub fn scan_rows(data: &[f64], k: usize) -> RowScan {
    let mut scan = RowScan::default();
    if k == 0 {
        return scan;
    }

    for row in data.chunks_exact(k) {
        if row.iter().any(|x| x.is_nan()) {
            scan.has_nan = true;
            continue;
        }
        if row.iter().any(|x| x.is_infinite()) {
            scan.has_inf = true;
            continue;
        }
        scan.max_norm = scan.max_norm.max(l2_norm(row));
    }

    scan
}

/// Health check over both factor matrices
pub fn diagnose_factors(
    users: &[f64],
    items: &[f64],
    k: usize,
    registered_users: usize,
    registered_items: usize,
) -> FactorDiagnostics {
    let user_scan = scan_rows(users, k);
    let item_scan = scan_rows(items, k);

    let has_nan = user_scan.has_nan || item_scan.has_nan;
    let has_inf = user_scan.has_inf || item_scan.has_inf;
    let max_norm = user_scan.max_norm.max(item_scan.max_norm);
    let is_healthy = !has_nan && !has_inf && max_norm < MAX_HEALTHY_ROW_NORM;

    let message = if is_healthy {
        "Factors are healthy".to_string()
    } else if has_nan {
        "Factors contain NaN values".to_string()
    } else if has_inf {
        "Factors contain infinite values".to_string()
    } else {
        format!("Factor norm has drifted: {:.2e}", max_norm)
    };

    FactorDiagnostics {
        is_healthy,
        has_nan,
        has_inf,
        max_user_norm: user_scan.max_norm,
        max_item_norm: item_scan.max_norm,
        registered_users,
        registered_items,
        message,
    }
}
