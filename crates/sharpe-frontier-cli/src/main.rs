mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::simulate::{FrontierArgs, SimulateArgs};
use commands::stats::StatsArgs;

/// Monte Carlo Sharpe-ratio search and efficient frontier tracing
#[derive(Parser)]
#[command(
    name = "sharpe-frontier",
    version,
    about = "Monte Carlo Sharpe-ratio search and efficient frontier tracing",
    long_about = "Estimates the Sharpe-optimal long-only weighting of a basket of assets \
                  from historical daily closes, and traces the Markowitz efficient \
                  frontier with a constrained minimum-volatility solver."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Debug-level logging on stderr (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Monte Carlo weight search
    Simulate(SimulateArgs),
    /// Run the weight search, then trace the efficient frontier
    Frontier(FrontierArgs),
    /// Annualized mean returns and covariance of a price file
    Stats(StatsArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "sharpe_frontier_core=debug,sharpe_frontier_cli=debug"
    } else {
        "sharpe_frontier_core=info,sharpe_frontier_cli=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Simulate(args) => commands::simulate::run_simulate(args),
        Commands::Frontier(args) => commands::simulate::run_frontier(args),
        Commands::Stats(args) => commands::stats::run_stats(args),
        Commands::Version => {
            println!("sharpe-frontier {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
