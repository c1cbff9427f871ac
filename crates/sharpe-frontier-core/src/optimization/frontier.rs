use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::PortfolioSimError;
use crate::statistics::AssetStatistics;
use crate::PortfolioSimResult;

use super::min_volatility::{minimize_volatility, FrontierPoint};

/// Default number of target returns in a frontier sweep.
pub const DEFAULT_FRONTIER_POINTS: usize = 100;

/// Minimum-volatility portfolios in strictly increasing target-return order.
///
/// Targets the optimizer could not solve are omitted, so `points` may be
/// shorter than `requested_points`, or empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficientFrontier {
    pub symbols: Vec<String>,
    pub points: Vec<FrontierPoint>,
    pub requested_points: usize,
    pub min_return: f64,
    pub max_return: f64,
}

impl EfficientFrontier {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dropped(&self) -> usize {
        self.requested_points.saturating_sub(self.points.len())
    }

    pub fn sharpe_ratios(&self, risk_free_rate: f64) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.sharpe_ratio(risk_free_rate))
            .collect()
    }

    /// Frontier point with the highest finite Sharpe ratio.
    pub fn max_sharpe(&self, risk_free_rate: f64) -> Option<&FrontierPoint> {
        let mut best: Option<(&FrontierPoint, f64)> = None;
        for p in &self.points {
            let s = p.sharpe_ratio(risk_free_rate);
            if !s.is_finite() {
                continue;
            }
            match best {
                Some((_, b)) if s <= b => {}
                _ => best = Some((p, s)),
            }
        }
        best.map(|(p, _)| p)
    }
}

/// `num_points` evenly spaced values over `[min_return, max_return]`,
/// endpoints included. A zero-width range yields a single target.
pub fn target_grid(
    min_return: f64,
    max_return: f64,
    num_points: usize,
) -> PortfolioSimResult<Vec<f64>> {
    if num_points == 0 {
        return Err(PortfolioSimError::invalid("num_points", "Must be at least 1"));
    }
    if !min_return.is_finite() || !max_return.is_finite() {
        return Err(PortfolioSimError::invalid(
            "target_range",
            "Bounds must be finite numbers",
        ));
    }
    if min_return > max_return {
        return Err(PortfolioSimError::invalid(
            "target_range",
            format!("min_return {min_return} exceeds max_return {max_return}"),
        ));
    }
    if num_points == 1 || min_return == max_return {
        return Ok(vec![min_return]);
    }

    let step = (max_return - min_return) / (num_points - 1) as f64;
    let mut grid: Vec<f64> = (0..num_points)
        .map(|i| min_return + step * i as f64)
        .collect();
    grid[num_points - 1] = max_return;
    Ok(grid)
}

/// Solve the minimum-volatility portfolio at every grid target.
///
/// Infeasible, non-convergent and zero-volatility targets are dropped
/// without retry; an all-failed sweep returns an empty frontier.
pub fn trace(
    stats: &AssetStatistics,
    min_return: f64,
    max_return: f64,
    num_points: usize,
) -> PortfolioSimResult<EfficientFrontier> {
    let grid = target_grid(min_return, max_return, num_points)?;
    let start = Instant::now();
    debug!(min_return, max_return, num_points, "tracing efficient frontier");

    #[cfg(feature = "parallel")]
    let outcomes: Vec<PortfolioSimResult<FrontierPoint>> = grid
        .par_iter()
        .map(|&target| minimize_volatility(target, stats))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<PortfolioSimResult<FrontierPoint>> = grid
        .iter()
        .map(|&target| minimize_volatility(target, stats))
        .collect();

    let mut points = Vec::with_capacity(grid.len());
    for (target, outcome) in grid.iter().zip(outcomes) {
        match outcome {
            Ok(point) => points.push(point),
            Err(e) if e.is_optimization_failure() => {
                debug!(target_return = *target, error = %e, "dropping frontier target");
            }
            Err(e) => return Err(e),
        }
    }

    let frontier = EfficientFrontier {
        symbols: stats.symbols().to_vec(),
        points,
        requested_points: grid.len(),
        min_return,
        max_return,
    };
    if frontier.dropped() > 0 {
        warn!(
            dropped = frontier.dropped(),
            requested = frontier.requested_points,
            "frontier targets without a solution were omitted"
        );
    }
    info!(
        points = frontier.len(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "efficient frontier traced"
    );
    Ok(frontier)
}
