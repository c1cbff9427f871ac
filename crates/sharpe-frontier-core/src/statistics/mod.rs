pub mod covariance;
pub mod returns;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PortfolioSimError;
use crate::prices::PriceTable;
use crate::PortfolioSimResult;

pub use covariance::{covariance_matrix, CovarianceMatrix};
pub use returns::{annualized_mean_returns, percentage_returns, MeanReturns, ReturnSeries};

/// Immutable inputs shared by the sampler and the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetStatistics {
    pub mean_returns: MeanReturns,
    pub covariance: CovarianceMatrix,
    pub trading_days_per_year: u32,
}

impl AssetStatistics {
    pub fn new(
        mean_returns: MeanReturns,
        covariance: CovarianceMatrix,
        trading_days_per_year: u32,
    ) -> PortfolioSimResult<Self> {
        let n = mean_returns.len();
        if n == 0 {
            return Err(PortfolioSimError::InsufficientData(
                "At least one asset required".into(),
            ));
        }
        if covariance.dim() != n || covariance.values.iter().any(|row| row.len() != n) {
            return Err(PortfolioSimError::invalid(
                "covariance",
                format!("Expected {n}x{n} matrix to match {n} mean returns"),
            ));
        }
        if trading_days_per_year == 0 {
            return Err(PortfolioSimError::invalid(
                "trading_days_per_year",
                "Must be at least 1",
            ));
        }
        Ok(Self {
            mean_returns,
            covariance,
            trading_days_per_year,
        })
    }

    /// Returns, annualized means and covariance from a raw price table.
    pub fn from_prices(prices: &PriceTable, trading_days_per_year: u32) -> PortfolioSimResult<Self> {
        let returns = percentage_returns(prices)?;
        let mean_returns = annualized_mean_returns(&returns, trading_days_per_year)?;
        let covariance = covariance_matrix(&returns)?;
        debug!(
            assets = returns.num_assets(),
            rows = returns.num_rows(),
            "computed return statistics"
        );
        Self::new(mean_returns, covariance, trading_days_per_year)
    }

    pub fn num_assets(&self) -> usize {
        self.mean_returns.len()
    }

    pub fn symbols(&self) -> &[String] {
        &self.mean_returns.symbols
    }

    pub fn expected_return(&self, weights: &[f64]) -> f64 {
        self.mean_returns.dot(weights)
    }

    /// Annualized volatility: `sqrt(w' Sigma w * trading_days)`.
    pub fn volatility(&self, weights: &[f64]) -> f64 {
        (self.covariance.quadratic_form(weights) * f64::from(self.trading_days_per_year)).sqrt()
    }
}

/// `(return - rf) / volatility`, left non-finite when volatility is zero.
pub fn sharpe_ratio(expected_return: f64, risk_free_rate: f64, volatility: f64) -> f64 {
    (expected_return - risk_free_rate) / volatility
}
