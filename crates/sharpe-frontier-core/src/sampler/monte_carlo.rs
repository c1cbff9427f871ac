use rand::distributions::Open01;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::PortfolioSimError;
use crate::statistics::{sharpe_ratio, AssetStatistics};
use crate::types::Weights;
use crate::PortfolioSimResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One random portfolio and how it scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub weights: Weights,
    /// Annualized expected return.
    pub expected_return: f64,
    /// Annualized volatility.
    pub volatility: f64,
    /// Non-finite when volatility is zero.
    pub sharpe_ratio: f64,
}

/// All trials of one sampling run, in draw order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub symbols: Vec<String>,
    pub trials: Vec<TrialResult>,
    /// Index of the maximum finite Sharpe ratio; first occurrence wins ties.
    pub best_index: Option<usize>,
    /// Seed the caller supplied, if any.
    pub seed: Option<u64>,
    pub risk_free_rate: f64,
}

impl SimulationResult {
    pub fn best(&self) -> Option<&TrialResult> {
        self.best_index.map(|i| &self.trials[i])
    }

    /// Smallest and largest finite expected return across trials.
    pub fn return_range(&self) -> Option<(f64, f64)> {
        self.trials
            .iter()
            .map(|t| t.expected_return)
            .filter(|r| r.is_finite())
            .fold(None, |acc, r| match acc {
                None => Some((r, r)),
                Some((lo, hi)) => Some((lo.min(r), hi.max(r))),
            })
    }

    /// Trials excluded from best selection because their Sharpe is not finite.
    pub fn degenerate_count(&self) -> usize {
        self.trials
            .iter()
            .filter(|t| !t.sharpe_ratio.is_finite())
            .count()
    }
}

// ---------------------------------------------------------------------------
// Sampler
// ---------------------------------------------------------------------------

/// Random long-only portfolio generator.
///
/// The generator is seeded once at construction. It only hands out a base
/// key; every trial then derives its own sub-seed from that key and its
/// index, so the result does not depend on execution order.
#[derive(Debug, Clone)]
pub struct MonteCarloSampler {
    seed: Option<u64>,
    base_key: u64,
}

impl MonteCarloSampler {
    pub fn new(seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            seed,
            base_key: rng.gen(),
        }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Run `trials` draws, fanned out over the rayon pool when the
    /// `parallel` feature is enabled.
    pub fn sample(
        &self,
        stats: &AssetStatistics,
        trials: usize,
        risk_free_rate: f64,
    ) -> PortfolioSimResult<SimulationResult> {
        validate(trials, risk_free_rate)?;
        let start = Instant::now();

        #[cfg(feature = "parallel")]
        let results: Vec<TrialResult> = (0..trials)
            .into_par_iter()
            .map(|i| run_trial(stats, risk_free_rate, trial_seed(self.base_key, i as u64)))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let results: Vec<TrialResult> = (0..trials)
            .map(|i| run_trial(stats, risk_free_rate, trial_seed(self.base_key, i as u64)))
            .collect();

        let out = self.finish(stats, results, risk_free_rate);
        info!(
            trials,
            best_index = ?out.best_index,
            elapsed_us = start.elapsed().as_micros() as u64,
            "monte carlo sampling complete"
        );
        Ok(out)
    }

    /// Single-threaded run; yields exactly what [`Self::sample`] yields.
    pub fn sample_sequential(
        &self,
        stats: &AssetStatistics,
        trials: usize,
        risk_free_rate: f64,
    ) -> PortfolioSimResult<SimulationResult> {
        validate(trials, risk_free_rate)?;
        let results = (0..trials)
            .map(|i| run_trial(stats, risk_free_rate, trial_seed(self.base_key, i as u64)))
            .collect();
        Ok(self.finish(stats, results, risk_free_rate))
    }

    fn finish(
        &self,
        stats: &AssetStatistics,
        trials: Vec<TrialResult>,
        risk_free_rate: f64,
    ) -> SimulationResult {
        let best_index = select_best(&trials);
        let out = SimulationResult {
            symbols: stats.symbols().to_vec(),
            trials,
            best_index,
            seed: self.seed,
            risk_free_rate,
        };
        let degenerate = out.degenerate_count();
        if degenerate > 0 {
            warn!(degenerate, "trials with non-finite Sharpe ratio excluded");
        }
        out
    }
}

/// Draw and score `trials` random portfolios.
pub fn sample(
    stats: &AssetStatistics,
    trials: usize,
    risk_free_rate: f64,
    seed: Option<u64>,
) -> PortfolioSimResult<SimulationResult> {
    MonteCarloSampler::new(seed).sample(stats, trials, risk_free_rate)
}

/// Index of the highest finite Sharpe ratio, first occurrence on ties.
pub fn select_best(trials: &[TrialResult]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, t) in trials.iter().enumerate() {
        if !t.sharpe_ratio.is_finite() {
            continue;
        }
        match best {
            Some((_, s)) if t.sharpe_ratio <= s => {}
            _ => best = Some((i, t.sharpe_ratio)),
        }
    }
    best.map(|(i, _)| i)
}

// ---------------------------------------------------------------------------
// Trial evaluation
// ---------------------------------------------------------------------------

/// Score one portfolio drawn from its own seeded generator.
///
/// Weights are independent Uniform(0, 1) draws normalized by their sum,
/// which is not a uniform draw over the simplex.
fn run_trial(stats: &AssetStatistics, risk_free_rate: f64, seed: u64) -> TrialResult {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut weights: Weights = (0..stats.num_assets())
        .map(|_| rng.sample::<f64, _>(Open01))
        .collect();
    let total: f64 = weights.iter().sum();
    for w in weights.iter_mut() {
        *w /= total;
    }

    let expected_return = stats.expected_return(&weights);
    let volatility = stats.volatility(&weights);
    let sharpe = sharpe_ratio(expected_return, risk_free_rate, volatility);

    TrialResult {
        weights,
        expected_return,
        volatility,
        sharpe_ratio: sharpe,
    }
}

/// SplitMix64 finalizer over the base key and trial index.
fn trial_seed(base_key: u64, index: u64) -> u64 {
    let mut z = base_key.wrapping_add(index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn validate(trials: usize, risk_free_rate: f64) -> PortfolioSimResult<()> {
    if trials == 0 {
        return Err(PortfolioSimError::invalid("trials", "Must be at least 1"));
    }
    if !risk_free_rate.is_finite() {
        return Err(PortfolioSimError::invalid(
            "risk_free_rate",
            "Must be a finite number",
        ));
    }
    debug!(trials, risk_free_rate, "sampling random portfolios");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
