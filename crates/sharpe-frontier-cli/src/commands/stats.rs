use clap::Args;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;

use sharpe_frontier_core::statistics::AssetStatistics;
use sharpe_frontier_core::types::{with_metadata, TRADING_DAYS_PER_YEAR};

use crate::input;

/// Arguments for the per-asset statistics report
#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    /// Path to a CSV of daily closes (header: date,SYM1,SYM2,...)
    #[arg(long)]
    pub prices: String,

    /// Trading sessions per year used for annualisation
    #[arg(long, default_value_t = TRADING_DAYS_PER_YEAR)]
    pub trading_days: u32,
}

#[derive(Debug, Serialize)]
struct AssetRow {
    symbol: String,
    mean_return: f64,
    volatility: f64,
}

#[derive(Debug, Serialize)]
struct StatsReport {
    assets: Vec<AssetRow>,
    covariance: BTreeMap<String, BTreeMap<String, f64>>,
    first_date: String,
    last_date: String,
    price_rows: usize,
}

pub fn run_stats(args: StatsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if args.trading_days == 0 {
        return Err("--trading-days must be at least 1".into());
    }
    let start = Instant::now();
    let prices = input::prices::read_prices(&args.prices, &BTreeMap::new())?;
    let stats = AssetStatistics::from_prices(&prices, args.trading_days)?;

    let symbols = stats.symbols().to_vec();
    let td = f64::from(args.trading_days);
    let assets = symbols
        .iter()
        .enumerate()
        .map(|(i, symbol)| AssetRow {
            symbol: symbol.clone(),
            mean_return: stats.mean_returns.values[i],
            volatility: (stats.covariance.get(i, i) * td).sqrt(),
        })
        .collect();

    let mut covariance = BTreeMap::new();
    for (i, row_sym) in symbols.iter().enumerate() {
        let row: BTreeMap<String, f64> = symbols
            .iter()
            .enumerate()
            .map(|(j, col_sym)| (col_sym.clone(), stats.covariance.get(i, j)))
            .collect();
        covariance.insert(row_sym.clone(), row);
    }

    let dates = prices.dates();
    let report = StatsReport {
        assets,
        covariance,
        first_date: dates.first().map(|d| d.to_string()).unwrap_or_default(),
        last_date: dates.last().map(|d| d.to_string()).unwrap_or_default(),
        price_rows: prices.num_rows(),
    };

    let output = with_metadata(
        "Annualized mean of daily percentage returns; daily sample covariance",
        &serde_json::json!({
            "trading_days_per_year": args.trading_days,
            "covariance_scale": "daily",
        }),
        Vec::new(),
        start.elapsed().as_micros() as u64,
        report,
    );
    Ok(serde_json::to_value(output)?)
}
