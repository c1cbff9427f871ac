//! Portfolio risk/return simulation.
//!
//! Derives annualized returns and covariance from a dense close-price
//! table, searches random long-only portfolios for the best Sharpe ratio,
//! and traces the long-only efficient frontier with a constrained
//! minimum-volatility solver.

pub mod error;
pub mod optimization;
pub mod prices;
pub mod sampler;
pub mod simulation;
pub mod statistics;
pub mod types;

pub use error::PortfolioSimError;
pub use types::*;

/// Standard result type for all portfolio simulation operations
pub type PortfolioSimResult<T> = Result<T, PortfolioSimError>;
