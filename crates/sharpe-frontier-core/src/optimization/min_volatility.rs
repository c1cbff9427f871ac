use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PortfolioSimError;
use crate::statistics::AssetStatistics;
use crate::types::Weights;
use crate::PortfolioSimResult;

use super::linalg;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Minimum-volatility long-only portfolio for one target return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub target_return: f64,
    /// Return actually achieved by `weights` (equals the target within
    /// solver tolerance).
    pub expected_return: f64,
    /// Annualized volatility of `weights`.
    pub volatility: f64,
    pub weights: Weights,
}

impl FrontierPoint {
    pub fn sharpe_ratio(&self, risk_free_rate: f64) -> f64 {
        (self.expected_return - risk_free_rate) / self.volatility
    }
}

/// Iteration limits and tolerances of the active-set solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Hard cap on active-set iterations; `extra_per_asset` is added per asset.
    pub max_iterations: u32,
    pub extra_per_asset: u32,
    /// Largest step component treated as "no move".
    pub step_tolerance: f64,
    /// Largest residual accepted on the budget and return constraints.
    pub constraint_tolerance: f64,
    /// Diagonal regularisation relative to the mean variance.
    pub ridge: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            extra_per_asset: 10,
            step_tolerance: 1e-13,
            constraint_tolerance: 1e-8,
            ridge: 1e-8,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Minimize annualized volatility subject to `sum(w) = 1`,
/// `w · mean = target_return` and `0 <= w_i <= 1`.
///
/// A target outside `[min(mean), max(mean)]` has no long-only solution and
/// yields [`PortfolioSimError::Infeasible`].
pub fn minimize_volatility(
    target_return: f64,
    stats: &AssetStatistics,
) -> PortfolioSimResult<FrontierPoint> {
    minimize_volatility_with(target_return, stats, &SolverSettings::default())
}

pub fn minimize_volatility_with(
    target_return: f64,
    stats: &AssetStatistics,
    settings: &SolverSettings,
) -> PortfolioSimResult<FrontierPoint> {
    if !target_return.is_finite() {
        return Err(PortfolioSimError::invalid(
            "target_return",
            "Must be a finite number",
        ));
    }
    let mu = &stats.mean_returns.values;
    let lo = stats.mean_returns.min();
    let hi = stats.mean_returns.max();
    let tol = 1e-12 * (1.0 + lo.abs().max(hi.abs()));

    if target_return < lo - tol || target_return > hi + tol {
        return Err(PortfolioSimError::Infeasible {
            target: target_return,
            min: lo,
            max: hi,
        });
    }

    let weights = if hi - lo <= tol {
        // Every asset has the same mean: the return constraint is implied.
        solve_budget_only(stats, &all_indices(mu.len()), settings)?
    } else if target_return >= hi - tol {
        let top: Vec<usize> = (0..mu.len()).filter(|&i| mu[i] >= hi - tol).collect();
        solve_budget_only(stats, &top, settings)?
    } else if target_return <= lo + tol {
        let bottom: Vec<usize> = (0..mu.len()).filter(|&i| mu[i] <= lo + tol).collect();
        solve_budget_only(stats, &bottom, settings)?
    } else {
        let q = regularized(stats, &all_indices(mu.len()), settings.ridge);
        let start = feasible_start(mu, target_return);
        active_set(&q, Some((mu, target_return)), start, settings)?
    };

    finish(stats, target_return, weights, settings)
}

/// Lowest-volatility long-only portfolio with no return target.
pub fn global_minimum_variance(stats: &AssetStatistics) -> PortfolioSimResult<FrontierPoint> {
    let settings = SolverSettings::default();
    let weights = solve_budget_only(stats, &all_indices(stats.num_assets()), &settings)?;
    let achieved = stats.expected_return(&weights);
    finish(stats, achieved, weights, &settings)
}

// ---------------------------------------------------------------------------
// Active-set quadratic programming
// ---------------------------------------------------------------------------

/// Minimize `w' Q w / 2` subject to `sum(w) = 1`, the optional return
/// constraint `mu · w = target` and `w >= 0`, starting from a feasible `w`.
///
/// The working set holds the indices pinned at zero. Each iteration solves
/// the equality-constrained subproblem on the free indices through its KKT
/// system, then either steps toward it (stopping at the first bound hit)
/// or, when already stationary, releases the bound with the most negative
/// multiplier.
fn active_set(
    q: &[Vec<f64>],
    return_constraint: Option<(&[f64], f64)>,
    mut w: Vec<f64>,
    settings: &SolverSettings,
) -> PortfolioSimResult<Vec<f64>> {
    let n = w.len();
    let mut working: Vec<bool> = w.iter().map(|x| *x <= 0.0).collect();
    let max_iter = settings.max_iterations + settings.extra_per_asset * n as u32;
    let mut last_delta = f64::NAN;

    for iter in 0..max_iter {
        let free: Vec<usize> = (0..n).filter(|&i| !working[i]).collect();
        let g: Vec<f64> = q
            .iter()
            .map(|row| row.iter().zip(&w).map(|(a, b)| a * b).sum())
            .collect();

        // The return row is dropped when it is parallel to the budget row
        // on the free set (all free means equal).
        let mu_row = return_constraint.and_then(|(mu, _)| {
            let (min, max) = free.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), &i| {
                (a.min(mu[i]), b.max(mu[i]))
            });
            (max - min > 1e-14 * (1.0 + max.abs())).then_some(mu)
        });

        let f = free.len();
        let m = f + 1 + usize::from(mu_row.is_some());
        let mut kkt = vec![vec![0.0; m]; m];
        let mut rhs = vec![0.0; m];
        for (a, &i) in free.iter().enumerate() {
            for (b, &j) in free.iter().enumerate() {
                kkt[a][b] = q[i][j];
            }
            kkt[a][f] = 1.0;
            kkt[f][a] = 1.0;
            if let Some(mu) = mu_row {
                kkt[a][f + 1] = mu[i];
                kkt[f + 1][a] = mu[i];
            }
            rhs[a] = -g[i];
        }

        let Some(sol) = linalg::solve(kkt, rhs) else {
            return Err(PortfolioSimError::ConvergenceFailure {
                function: "active_set: singular KKT system".into(),
                iterations: iter,
                last_delta,
            });
        };
        let (p, lambda) = sol.split_at(f);
        last_delta = p.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));

        if last_delta <= settings.step_tolerance {
            // Stationary on the working face: check bound multipliers.
            let g_scale = g.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
            let nu_tol = 1e-9 * g_scale;
            let mut release: Option<(usize, f64)> = None;
            for i in (0..n).filter(|&i| working[i]) {
                let mut nu = g[i] + lambda[0];
                if let Some(mu) = mu_row {
                    nu += lambda[1] * mu[i];
                }
                if nu < -nu_tol && release.map_or(true, |(_, best)| nu < best) {
                    release = Some((i, nu));
                }
            }
            match release {
                Some((i, _)) => working[i] = false,
                None => return Ok(w),
            }
            continue;
        }

        let mut alpha = 1.0_f64;
        let mut blocking = None;
        for (a, &i) in free.iter().enumerate() {
            if p[a] < 0.0 {
                let ratio = -w[i] / p[a];
                if ratio < alpha {
                    alpha = ratio;
                    blocking = Some(i);
                }
            }
        }
        for (a, &i) in free.iter().enumerate() {
            w[i] += alpha * p[a];
        }
        if let Some(b) = blocking {
            w[b] = 0.0;
            working[b] = true;
        }
        for &i in &free {
            if w[i] < 0.0 {
                w[i] = 0.0;
                working[i] = true;
            }
        }
    }

    Err(PortfolioSimError::ConvergenceFailure {
        function: "active_set".into(),
        iterations: max_iter,
        last_delta,
    })
}

/// Budget-only problem restricted to `subset`, embedded back into a full
/// weight vector.
fn solve_budget_only(
    stats: &AssetStatistics,
    subset: &[usize],
    settings: &SolverSettings,
) -> PortfolioSimResult<Vec<f64>> {
    let q = regularized(stats, subset, settings.ridge);
    let start = vec![1.0 / subset.len() as f64; subset.len()];
    let local = active_set(&q, None, start, settings)?;

    let mut weights = vec![0.0; stats.num_assets()];
    for (&i, w) in subset.iter().zip(local) {
        weights[i] = w;
    }
    Ok(weights)
}

/// Covariance restricted to `subset` with a small ridge on the diagonal so
/// the KKT system stays non-singular for rank-deficient inputs.
fn regularized(stats: &AssetStatistics, subset: &[usize], ridge: f64) -> Vec<Vec<f64>> {
    let cov = &stats.covariance;
    let mean_var = cov.trace() / cov.dim() as f64;
    let eps = if mean_var > 0.0 { ridge * mean_var } else { 1e-12 };
    subset
        .iter()
        .map(|&i| {
            subset
                .iter()
                .map(|&j| cov.get(i, j) + if i == j { eps } else { 0.0 })
                .collect()
        })
        .collect()
}

/// Uniform weights moved toward the highest- or lowest-mean asset just far
/// enough to hit the target. Requires `min(mu) < target < max(mu)`.
fn feasible_start(mu: &[f64], target: f64) -> Vec<f64> {
    let n = mu.len();
    let uniform = 1.0 / n as f64;
    let avg: f64 = mu.iter().sum::<f64>() / n as f64;
    let mut w = vec![uniform; n];
    if target == avg {
        return w;
    }

    let pick = |better: fn(f64, f64) -> bool| {
        (0..n).fold(0, |k, i| if better(mu[i], mu[k]) { i } else { k })
    };
    let k = if target > avg {
        pick(|a, b| a > b)
    } else {
        pick(|a, b| a < b)
    };
    let alpha = ((target - avg) / (mu[k] - avg)).clamp(0.0, 1.0);
    for wi in w.iter_mut() {
        *wi *= 1.0 - alpha;
    }
    w[k] += alpha;
    w
}

fn all_indices(n: usize) -> Vec<usize> {
    (0..n).collect()
}

/// Clean rounding noise, verify constraints and score the weights.
fn finish(
    stats: &AssetStatistics,
    target_return: f64,
    mut weights: Vec<f64>,
    settings: &SolverSettings,
) -> PortfolioSimResult<FrontierPoint> {
    for w in weights.iter_mut() {
        *w = w.clamp(0.0, 1.0);
    }

    let expected_return = stats.expected_return(&weights);
    let budget_gap = (weights.iter().sum::<f64>() - 1.0).abs();
    let scale = 1.0 + stats.mean_returns.max().abs().max(stats.mean_returns.min().abs());
    let return_gap = (expected_return - target_return).abs() / scale;
    let residual = budget_gap.max(return_gap);
    if residual > settings.constraint_tolerance {
        return Err(PortfolioSimError::ConvergenceFailure {
            function: "minimize_volatility: constraint residual".into(),
            iterations: 0,
            last_delta: residual,
        });
    }

    let volatility = stats.volatility(&weights);
    if !volatility.is_finite() || volatility <= 0.0 {
        return Err(PortfolioSimError::DegenerateVolatility {
            context: format!("minimize_volatility(target={target_return})"),
        });
    }

    debug!(target_return, volatility, "solved minimum-volatility portfolio");
    Ok(FrontierPoint {
        target_return,
        expected_return,
        volatility,
        weights,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::{CovarianceMatrix, MeanReturns};
    use crate::types::is_valid_weight_vector;

    fn stats(mean: Vec<f64>, cov: Vec<Vec<f64>>) -> AssetStatistics {
        let symbols: Vec<String> = (0..mean.len()).map(|i| format!("A{i}")).collect();
        AssetStatistics::new(
            MeanReturns {
                symbols: symbols.clone(),
                values: mean,
            },
            CovarianceMatrix {
                symbols,
                values: cov,
            },
            252,
        )
        .unwrap()
    }

    fn three_assets() -> AssetStatistics {
        stats(
            vec![0.10, 0.04, 0.07],
            vec![
                vec![0.000090, 0.000012, 0.000006],
                vec![0.000012, 0.000016, 0.000010],
                vec![0.000006, 0.000010, 0.000250],
            ],
        )
    }

    /// Brute-force minimum variance over a fine simplex grid.
    fn grid_min_vol(s: &AssetStatistics, target: f64, tol: f64) -> f64 {
        let steps = 400;
        let mut best = f64::INFINITY;
        for i in 0..=steps {
            for j in 0..=(steps - i) {
                let w = [
                    i as f64 / steps as f64,
                    j as f64 / steps as f64,
                    (steps - i - j) as f64 / steps as f64,
                ];
                if (s.expected_return(&w) - target).abs() <= tol {
                    best = best.min(s.volatility(&w));
                }
            }
        }
        best
    }

    #[test]
    fn test_constraints_satisfied() {
        let s = three_assets();
        for target in [0.05, 0.06, 0.07, 0.08, 0.09] {
            let point = minimize_volatility(target, &s).unwrap();
            assert!(is_valid_weight_vector(&point.weights), "{:?}", point.weights);
            assert!(
                (point.expected_return - target).abs() < 1e-9,
                "target {} achieved {}",
                target,
                point.expected_return
            );
        }
    }

    #[test]
    fn test_matches_grid_search() {
        let s = three_assets();
        for target in [0.05, 0.065, 0.08] {
            let point = minimize_volatility(target, &s).unwrap();
            let grid = grid_min_vol(&s, target, 2e-4);
            // The grid only approximates the target, so allow a little slack.
            assert!(
                point.volatility <= grid * 1.01,
                "solver {} vs grid {} at target {}",
                point.volatility,
                grid,
                target
            );
        }
    }

    #[test]
    fn test_two_asset_unique_solution() {
        let s = stats(
            vec![0.12, 0.04],
            vec![vec![0.0004, 0.00005], vec![0.00005, 0.0001]],
        );
        let point = minimize_volatility(0.08, &s).unwrap();
        assert!((point.weights[0] - 0.5).abs() < 1e-9);
        assert!((point.weights[1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_long_only_binds() {
        // Unconstrained optimum would short the last asset.
        let s = stats(
            vec![0.10, 0.08, 0.02],
            vec![
                vec![0.00010, 0.00002, 0.00009],
                vec![0.00002, 0.00010, 0.00009],
                vec![0.00009, 0.00009, 0.00010],
            ],
        );
        let point = minimize_volatility(0.09, &s).unwrap();
        assert!(point.weights.iter().all(|w| *w >= 0.0));
        assert!(is_valid_weight_vector(&point.weights));
    }

    #[test]
    fn test_target_above_max_is_infeasible() {
        let err = minimize_volatility(0.11, &three_assets()).unwrap_err();
        assert!(matches!(err, PortfolioSimError::Infeasible { .. }));
        assert!(err.is_optimization_failure());
    }

    #[test]
    fn test_target_below_min_is_infeasible() {
        assert!(matches!(
            minimize_volatility(0.0, &three_assets()),
            Err(PortfolioSimError::Infeasible { .. })
        ));
    }

    #[test]
    fn test_extreme_target_selects_single_asset() {
        let point = minimize_volatility(0.10, &three_assets()).unwrap();
        assert!((point.weights[0] - 1.0).abs() < 1e-12);
        let point = minimize_volatility(0.04, &three_assets()).unwrap();
        assert!((point.weights[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_target_rejected() {
        assert!(matches!(
            minimize_volatility(f64::NAN, &three_assets()),
            Err(PortfolioSimError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_zero_variance_is_degenerate() {
        let s = stats(vec![0.05], vec![vec![0.0]]);
        let err = minimize_volatility(0.05, &s).unwrap_err();
        assert!(matches!(err, PortfolioSimError::DegenerateVolatility { .. }));
    }

    #[test]
    fn test_single_asset_point() {
        let s = stats(vec![0.05], vec![vec![0.0001]]);
        let point = minimize_volatility(0.05, &s).unwrap();
        assert_eq!(point.weights, vec![1.0]);
    }

    #[test]
    fn test_global_minimum_variance_is_lowest() {
        let s = three_assets();
        let gmv = global_minimum_variance(&s).unwrap();
        assert!(is_valid_weight_vector(&gmv.weights));
        for target in [0.05, 0.07, 0.09] {
            let point = minimize_volatility(target, &s).unwrap();
            assert!(gmv.volatility <= point.volatility + 1e-12);
        }
    }

    #[test]
    fn test_duplicate_assets_still_solve() {
        // Perfectly collinear columns make the covariance singular.
        let s = stats(
            vec![0.10, 0.10, 0.02],
            vec![
                vec![0.0001, 0.0001, 0.00001],
                vec![0.0001, 0.0001, 0.00001],
                vec![0.00001, 0.00001, 0.00004],
            ],
        );
        let point = minimize_volatility(0.06, &s).unwrap();
        assert!(is_valid_weight_vector(&point.weights));
        assert!((point.expected_return - 0.06).abs() < 1e-9);
    }

    #[test]
    fn test_feasible_start_hits_target() {
        let mu = [0.10, 0.04, 0.07];
        for target in [0.05, 0.07, 0.09] {
            let w = feasible_start(&mu, target);
            let ret: f64 = w.iter().zip(mu).map(|(a, b)| a * b).sum();
            assert!((ret - target).abs() < 1e-12);
            assert!(w.iter().all(|x| *x > 0.0));
        }
    }
}
