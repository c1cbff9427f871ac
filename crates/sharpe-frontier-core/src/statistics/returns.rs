use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::PortfolioSimError;
use crate::prices::PriceTable;
use crate::PortfolioSimResult;

/// Daily fractional returns, one row shorter than the source price table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    pub symbols: Vec<String>,
    /// Date of each return row (the later day of each pair).
    pub dates: Vec<NaiveDate>,
    /// Column-major: `columns[asset][row]`.
    pub columns: Vec<Vec<f64>>,
}

impl ReturnSeries {
    pub fn num_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn num_assets(&self) -> usize {
        self.symbols.len()
    }
}

/// Annualized mean return per asset, indexed like the price table columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanReturns {
    pub symbols: Vec<String>,
    pub values: Vec<f64>,
}

impl MeanReturns {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.values[i])
    }

    /// Expected portfolio return: `weights · mean`.
    pub fn dot(&self, weights: &[f64]) -> f64 {
        self.values.iter().zip(weights).map(|(m, w)| m * w).sum()
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Row-over-row percentage change of every column; the first row is dropped.
pub fn percentage_returns(prices: &PriceTable) -> PortfolioSimResult<ReturnSeries> {
    if prices.num_assets() == 0 {
        return Err(PortfolioSimError::InsufficientData(
            "At least one asset column required".into(),
        ));
    }
    if prices.num_rows() < 2 {
        return Err(PortfolioSimError::InsufficientData(format!(
            "At least 2 price rows required, got {}",
            prices.num_rows()
        )));
    }

    let columns = prices
        .columns()
        .map(|(_, closes)| closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect())
        .collect();

    Ok(ReturnSeries {
        symbols: prices.symbols().to_vec(),
        dates: prices.dates()[1..].to_vec(),
        columns,
    })
}

/// Mean daily return scaled linearly by `trading_days_per_year`.
///
/// This is simple annualization, not a compounded growth rate.
pub fn annualized_mean_returns(
    returns: &ReturnSeries,
    trading_days_per_year: u32,
) -> PortfolioSimResult<MeanReturns> {
    if returns.num_rows() == 0 {
        return Err(PortfolioSimError::InsufficientData(
            "No return observations".into(),
        ));
    }
    let scale = f64::from(trading_days_per_year);
    let values = returns
        .columns
        .iter()
        .map(|col| col.iter().mean() * scale)
        .collect();
    Ok(MeanReturns {
        symbols: returns.symbols.clone(),
        values,
    })
}
