pub mod monte_carlo;

pub use monte_carlo::{sample, select_best, MonteCarloSampler, SimulationResult, TrialResult};
