use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::PortfolioSimError;
use crate::optimization::DEFAULT_FRONTIER_POINTS;
use crate::types::{Rate, TRADING_DAYS_PER_YEAR};
use crate::PortfolioSimResult;

/// Run settings for a simulation and its frontier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of random portfolios to draw.
    #[serde(default = "default_trials")]
    pub trials: usize,
    /// Annualized risk-free rate.
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: Rate,
    /// Optional seed for reproducibility.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_trading_days")]
    pub trading_days_per_year: u32,
    /// Number of target returns in the frontier sweep.
    #[serde(default = "default_frontier_points")]
    pub frontier_points: usize,
    /// Retired symbol -> current symbol.
    #[serde(default)]
    pub ticker_changes: BTreeMap<String, String>,
}

fn default_trials() -> usize {
    10_000
}

fn default_risk_free_rate() -> Rate {
    0.03
}

fn default_trading_days() -> u32 {
    TRADING_DAYS_PER_YEAR
}

fn default_frontier_points() -> usize {
    DEFAULT_FRONTIER_POINTS
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            trials: default_trials(),
            risk_free_rate: default_risk_free_rate(),
            seed: None,
            trading_days_per_year: default_trading_days(),
            frontier_points: default_frontier_points(),
            ticker_changes: BTreeMap::new(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> PortfolioSimResult<()> {
        if self.trials == 0 {
            return Err(PortfolioSimError::invalid("trials", "Must be at least 1"));
        }
        if self.frontier_points == 0 {
            return Err(PortfolioSimError::invalid(
                "frontier_points",
                "Must be at least 1",
            ));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(PortfolioSimError::invalid(
                "risk_free_rate",
                "Must be a finite number",
            ));
        }
        if self.trading_days_per_year == 0 {
            return Err(PortfolioSimError::invalid(
                "trading_days_per_year",
                "Must be at least 1",
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON config.
    ///
    /// The seed is checked before deserialization so a fractional or
    /// negative seed reports as an invalid `seed` rather than a generic
    /// parse failure.
    pub fn from_json_value(value: serde_json::Value) -> PortfolioSimResult<Self> {
        if let Some(seed) = value.get("seed") {
            if !seed.is_null() && seed.as_u64().is_none() {
                return Err(PortfolioSimError::invalid(
                    "seed",
                    format!("Must be a non-negative integer, got {seed}"),
                ));
            }
        }
        let config: SimulationConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> PortfolioSimResult<Self> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        Self::from_json_value(value)
    }
}
