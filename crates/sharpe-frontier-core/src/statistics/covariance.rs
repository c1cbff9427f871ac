use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::warn;

use crate::error::PortfolioSimError;
use crate::PortfolioSimResult;

use super::returns::ReturnSeries;

/// Sample covariance of daily returns (not annualized).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovarianceMatrix {
    pub symbols: Vec<String>,
    /// Row-major N x N values, exactly symmetric.
    pub values: Vec<Vec<f64>>,
}

impl CovarianceMatrix {
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i][j]
    }

    pub fn by_symbol(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.symbols.iter().position(|s| s == a)?;
        let j = self.symbols.iter().position(|s| s == b)?;
        Some(self.values[i][j])
    }

    /// Sigma * w
    pub fn mat_vec(&self, w: &[f64]) -> Vec<f64> {
        self.values
            .iter()
            .map(|row| row.iter().zip(w).map(|(a, b)| a * b).sum())
            .collect()
    }

    /// w' * Sigma * w
    pub fn quadratic_form(&self, w: &[f64]) -> f64 {
        self.mat_vec(w).iter().zip(w).map(|(a, b)| a * b).sum()
    }

    pub fn trace(&self) -> f64 {
        (0..self.dim()).map(|i| self.values[i][i]).sum()
    }
}

/// Sample (n - 1) covariance over the return rows.
///
/// A single return row gives an all-NaN matrix rather than an error.
///
/// Only the upper triangle is computed; the lower one is mirrored so
/// `values[i][j] == values[j][i]` holds bit-for-bit.
pub fn covariance_matrix(returns: &ReturnSeries) -> PortfolioSimResult<CovarianceMatrix> {
    if returns.num_assets() == 0 {
        return Err(PortfolioSimError::InsufficientData(
            "At least one asset column required".into(),
        ));
    }
    if returns.num_rows() == 0 {
        return Err(PortfolioSimError::InsufficientData(
            "No return observations".into(),
        ));
    }

    let n = returns.num_assets();
    if returns.num_rows() == 1 {
        // (n - 1) = 0: undefined, left for the trials to surface as degenerate.
        warn!("single return row, sample covariance is undefined");
        return Ok(CovarianceMatrix {
            symbols: returns.symbols.clone(),
            values: vec![vec![f64::NAN; n]; n],
        });
    }

    let mut values = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let c = returns.columns[i].iter().covariance(returns.columns[j].iter());
            values[i][j] = c;
            values[j][i] = c;
        }
    }
    // Rounding can leave a constant column with a tiny negative variance.
    for (i, row) in values.iter_mut().enumerate() {
        if row[i] < 0.0 {
            row[i] = 0.0;
        }
    }

    Ok(CovarianceMatrix {
        symbols: returns.symbols.clone(),
        values,
    })
}
