use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use crate::error::PortfolioSimError;
use crate::optimization::{self, global_minimum_variance, EfficientFrontier, FrontierPoint};
use crate::prices::PriceTable;
use crate::sampler::{MonteCarloSampler, SimulationResult, TrialResult};
use crate::statistics::{AssetStatistics, MeanReturns};
use crate::types::{with_metadata, ComputationOutput};
use crate::PortfolioSimResult;

use super::config::SimulationConfig;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A single asset weight labelled by symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetWeight {
    pub symbol: String,
    pub weight: f64,
}

/// A scored portfolio with symbol-labelled weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub weights: Vec<AssetWeight>,
}

/// Frontier plus the notable portfolios on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierReport {
    pub frontier: EfficientFrontier,
    pub global_minimum_variance: Option<Allocation>,
    pub max_sharpe: Option<Allocation>,
}

/// Everything a presentation layer needs from one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub symbols: Vec<String>,
    pub mean_returns: MeanReturns,
    pub max_sharpe: Option<Allocation>,
    pub simulation: SimulationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontier: Option<FrontierReport>,
}

// ---------------------------------------------------------------------------
// Stateless entry points
// ---------------------------------------------------------------------------

/// Statistics then Monte Carlo sampling over a price table.
pub fn simulate(
    prices: &PriceTable,
    trials: usize,
    risk_free_rate: f64,
    seed: Option<u64>,
) -> PortfolioSimResult<SimulationResult> {
    let config = SimulationConfig {
        trials,
        risk_free_rate,
        seed,
        ..SimulationConfig::default()
    };
    Simulation::new(prices.clone(), config)?.simulate()
}

/// Frontier over the return range the Monte Carlo trials observed.
pub fn frontier(
    simulation: &SimulationResult,
    prices: &PriceTable,
    risk_free_rate: f64,
) -> PortfolioSimResult<EfficientFrontier> {
    let config = SimulationConfig {
        risk_free_rate,
        ..SimulationConfig::default()
    };
    Simulation::new(prices.clone(), config)?.frontier(simulation)
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs statistics, sampling and frontier tracing over one fixed price
/// table and config. Holds no other state between calls.
#[derive(Debug, Clone)]
pub struct Simulation {
    prices: PriceTable,
    config: SimulationConfig,
}

impl Simulation {
    pub fn new(prices: PriceTable, config: SimulationConfig) -> PortfolioSimResult<Self> {
        config.validate()?;
        Ok(Self { prices, config })
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn statistics(&self) -> PortfolioSimResult<AssetStatistics> {
        AssetStatistics::from_prices(&self.prices, self.config.trading_days_per_year)
    }

    pub fn simulate(&self) -> PortfolioSimResult<SimulationResult> {
        let stats = self.statistics()?;
        MonteCarloSampler::new(self.config.seed).sample(
            &stats,
            self.config.trials,
            self.config.risk_free_rate,
        )
    }

    pub fn frontier(&self, simulation: &SimulationResult) -> PortfolioSimResult<EfficientFrontier> {
        let stats = self.statistics()?;
        self.frontier_with(&stats, simulation)
    }

    fn frontier_with(
        &self,
        stats: &AssetStatistics,
        simulation: &SimulationResult,
    ) -> PortfolioSimResult<EfficientFrontier> {
        if simulation.symbols != self.prices.symbols() {
            return Err(PortfolioSimError::invalid(
                "simulation",
                "Simulation symbols do not match the price table columns",
            ));
        }
        let (min_return, max_return) = simulation.return_range().ok_or_else(|| {
            PortfolioSimError::InsufficientData(
                "Simulation has no finite trial returns to bound the frontier".into(),
            )
        })?;
        optimization::trace(stats, min_return, max_return, self.config.frontier_points)
    }

    /// Full run wrapped in the standard output envelope.
    pub fn run(&self, with_frontier: bool) -> PortfolioSimResult<ComputationOutput<SimulationReport>> {
        let start = Instant::now();
        let mut warnings: Vec<String> = Vec::new();
        let rf = self.config.risk_free_rate;
        let symbols = self.prices.symbols().to_vec();

        let stats = self.statistics()?;
        let simulation = MonteCarloSampler::new(self.config.seed).sample(
            &stats,
            self.config.trials,
            rf,
        )?;

        let degenerate = simulation.degenerate_count();
        if degenerate > 0 {
            warnings.push(format!(
                "{degenerate} of {} trials had zero or non-finite volatility and were excluded",
                simulation.trials.len()
            ));
        }
        let max_sharpe = simulation.best().map(|t| allocation_from_trial(&symbols, t));
        if max_sharpe.is_none() {
            warnings.push("No trial produced a finite Sharpe ratio".into());
        }

        let frontier = if with_frontier {
            let frontier = self.frontier_with(&stats, &simulation)?;
            if frontier.dropped() > 0 {
                warnings.push(format!(
                    "{} of {} frontier targets had no solution and were omitted",
                    frontier.dropped(),
                    frontier.requested_points
                ));
            }
            let gmv = global_minimum_variance(&stats)
                .ok()
                .map(|p| allocation_from_point(&symbols, &p, rf));
            let best = frontier
                .max_sharpe(rf)
                .map(|p| allocation_from_point(&symbols, p, rf));
            Some(FrontierReport {
                frontier,
                global_minimum_variance: gmv,
                max_sharpe: best,
            })
        } else {
            None
        };

        let report = SimulationReport {
            symbols,
            mean_returns: stats.mean_returns.clone(),
            max_sharpe,
            simulation,
            frontier,
        };

        let elapsed = start.elapsed().as_micros() as u64;
        info!(elapsed_us = elapsed, with_frontier, "simulation run complete");
        Ok(with_metadata(
            "Monte Carlo Sharpe Ratio Search with Long-Only Efficient Frontier",
            &serde_json::json!({
                "n_assets": stats.num_assets(),
                "price_rows": self.prices.num_rows(),
                "trials": self.config.trials,
                "risk_free_rate": rf,
                "seed": self.config.seed,
                "trading_days_per_year": self.config.trading_days_per_year,
                "frontier_points": self.config.frontier_points,
                "annualization": "linear mean, sqrt-time volatility",
            }),
            warnings,
            elapsed,
            report,
        ))
    }
}

fn label(symbols: &[String], weights: &[f64]) -> Vec<AssetWeight> {
    symbols
        .iter()
        .zip(weights)
        .map(|(s, w)| AssetWeight {
            symbol: s.clone(),
            weight: *w,
        })
        .collect()
}

fn allocation_from_trial(symbols: &[String], trial: &TrialResult) -> Allocation {
    Allocation {
        expected_return: trial.expected_return,
        volatility: trial.volatility,
        sharpe_ratio: trial.sharpe_ratio,
        weights: label(symbols, &trial.weights),
    }
}

fn allocation_from_point(symbols: &[String], point: &FrontierPoint, rf: f64) -> Allocation {
    Allocation {
        expected_return: point.expected_return,
        volatility: point.volatility,
        sharpe_ratio: point.sharpe_ratio(rf),
        weights: label(symbols, &point.weights),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    /// Deterministic wiggly price paths with distinct drifts.
    fn prices(rows: usize) -> PriceTable {
        let dates = (0..rows)
            .map(|i| NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + chrono::Days::new(i as u64))
            .collect();
        let drifts = [0.0008, 0.0002, 0.0005];
        let amps = [0.012, 0.004, 0.020];
        let columns = ["EQ", "BD", "CM"]
            .iter()
            .enumerate()
            .map(|(k, s)| {
                let mut p = 100.0;
                let closes = (0..rows)
                    .map(|t| {
                        if t > 0 {
                            let shock = ((t * (k + 3)) as f64 * 0.7).sin() * amps[k];
                            p *= 1.0 + drifts[k] + shock;
                        }
                        p
                    })
                    .collect();
                (s.to_string(), closes)
            })
            .collect();
        PriceTable::new(dates, columns).unwrap()
    }

    #[test]
    fn test_simulate_and_frontier() {
        let table = prices(120);
        let sim = simulate(&table, 2000, 0.01, Some(9)).unwrap();
        assert_eq!(sim.trials.len(), 2000);
        assert!(sim.best_index.is_some());

        let frontier = frontier(&sim, &table, 0.01).unwrap();
        assert!(!frontier.is_empty());
        let (lo, hi) = sim.return_range().unwrap();
        assert_eq!(frontier.min_return, lo);
        assert_eq!(frontier.max_return, hi);
    }

    #[test]
    fn test_frontier_rejects_foreign_simulation() {
        let table = prices(60);
        let mut sim = simulate(&table, 50, 0.0, Some(1)).unwrap();
        sim.symbols.reverse();
        assert!(frontier(&sim, &table, 0.0).is_err());
    }

    #[test]
    fn test_run_report_envelope() {
        let config = SimulationConfig {
            trials: 500,
            seed: Some(3),
            frontier_points: 15,
            ..SimulationConfig::default()
        };
        let out = Simulation::new(prices(90), config).unwrap().run(true).unwrap();
        assert_eq!(out.metadata.precision, "ieee754_f64");
        let report = &out.result;
        assert_eq!(report.symbols.len(), 3);
        assert_eq!(report.max_sharpe.as_ref().unwrap().weights.len(), 3);
        let fr = report.frontier.as_ref().unwrap();
        assert!(fr.global_minimum_variance.is_some());
        assert!(fr.frontier.len() <= 15);
    }

    #[test]
    fn test_run_without_frontier() {
        let config = SimulationConfig {
            trials: 100,
            seed: Some(3),
            ..SimulationConfig::default()
        };
        let out = Simulation::new(prices(30), config).unwrap().run(false).unwrap();
        assert!(out.result.frontier.is_none());
        assert!(out.warnings.is_empty(), "unexpected warnings {:?}", out.warnings);
    }

    #[test]
    fn test_run_two_asset_table_warns_only_on_degenerate_trials() {
        let dates = (0..2)
            .map(|i| NaiveDate::from_ymd_opt(2023, 1, 2).unwrap() + chrono::Days::new(i))
            .collect();
        let table = PriceTable::new(
            dates,
            vec![("A".into(), vec![1.0, 1.1]), ("B".into(), vec![2.0, 2.1])],
        )
        .unwrap();
        let config = SimulationConfig {
            trials: 20,
            seed: Some(1),
            frontier_points: 5,
            ..SimulationConfig::default()
        };
        let out = Simulation::new(table, config).unwrap().run(true).unwrap();
        assert!(out.result.max_sharpe.is_none());
        let fr = out.result.frontier.as_ref().unwrap();
        assert!(fr.frontier.is_empty());
        assert!(fr.global_minimum_variance.is_none());
        assert_eq!(out.warnings.len(), 3, "{:?}", out.warnings);
        assert!(out.warnings[0].starts_with("20 of 20 trials"));
        assert!(out.warnings[1].contains("finite Sharpe"));
        assert!(out.warnings[2].starts_with("5 of 5 frontier targets"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SimulationConfig {
            trials: 0,
            ..SimulationConfig::default()
        };
        assert!(Simulation::new(prices(10), config).is_err());
    }
}
