pub mod frontier;
pub mod linalg;
pub mod min_volatility;

pub use frontier::{target_grid, trace, EfficientFrontier, DEFAULT_FRONTIER_POINTS};
pub use min_volatility::{
    global_minimum_variance, minimize_volatility, minimize_volatility_with, FrontierPoint,
    SolverSettings,
};
