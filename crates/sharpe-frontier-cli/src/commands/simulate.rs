use clap::Args;
use serde_json::Value;
use tracing::debug;

use sharpe_frontier_core::simulation::{Simulation, SimulationConfig};

use crate::input;

/// Arguments shared by `simulate` and `frontier`
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to a CSV of daily closes (header: date,SYM1,SYM2,...)
    #[arg(long)]
    pub prices: String,

    /// Path to a JSON or YAML run config (stdin JSON is read when omitted)
    #[arg(long)]
    pub config: Option<String>,

    /// Number of random portfolios to draw
    #[arg(long)]
    pub trials: Option<usize>,

    /// Annualized risk-free rate as a decimal
    #[arg(long)]
    pub risk_free_rate: Option<f64>,

    /// Seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of target returns in the frontier sweep
    #[arg(long)]
    pub frontier_points: Option<usize>,

    /// Leave the per-trial list out of the output
    #[arg(long)]
    pub omit_trials: bool,
}

/// Arguments for the Monte Carlo weight search
#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Also trace the efficient frontier over the sampled return range
    #[arg(long)]
    pub frontier: bool,
}

/// Arguments for the weight search followed by the frontier sweep
#[derive(Args, Debug, Clone)]
pub struct FrontierArgs {
    #[command(flatten)]
    pub run: RunArgs,
}

pub fn run_simulate(args: SimulateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    execute(&args.run, args.frontier)
}

pub fn run_frontier(args: FrontierArgs) -> Result<Value, Box<dyn std::error::Error>> {
    execute(&args.run, true)
}

fn execute(args: &RunArgs, with_frontier: bool) -> Result<Value, Box<dyn std::error::Error>> {
    let config = load_config(args)?;
    let prices = input::prices::read_prices(&args.prices, &config.ticker_changes)?;
    debug!(
        rows = prices.num_rows(),
        assets = prices.num_assets(),
        trials = config.trials,
        "loaded price table"
    );

    let simulation = Simulation::new(prices, config)?;
    let output = simulation.run(with_frontier)?;
    let mut value = serde_json::to_value(output)?;
    if args.omit_trials {
        strip_trials(&mut value);
    }
    Ok(value)
}

/// Config file (or piped JSON/YAML), then command-line overrides on top.
fn load_config(args: &RunArgs) -> Result<SimulationConfig, Box<dyn std::error::Error>> {
    let base: Value = if let Some(ref path) = args.config {
        input::file::read_config_value(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        Value::Object(serde_json::Map::new())
    };
    let mut config = SimulationConfig::from_json_value(base)?;

    if let Some(trials) = args.trials {
        config.trials = trials;
    }
    if let Some(rf) = args.risk_free_rate {
        config.risk_free_rate = rf;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(points) = args.frontier_points {
        config.frontier_points = points;
    }
    config.validate()?;
    Ok(config)
}

fn strip_trials(value: &mut Value) {
    if let Some(Value::Object(sim)) = value.pointer_mut("/result/simulation") {
        sim.remove("trials");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_trials_removes_only_trial_list() {
        let mut value = json!({
            "result": {
                "simulation": { "trials": [1, 2, 3], "best_index": 0 },
                "symbols": ["A"]
            }
        });
        strip_trials(&mut value);
        assert!(value.pointer("/result/simulation/trials").is_none());
        assert_eq!(value.pointer("/result/simulation/best_index"), Some(&json!(0)));
        assert_eq!(value.pointer("/result/symbols"), Some(&json!(["A"])));
    }
}
