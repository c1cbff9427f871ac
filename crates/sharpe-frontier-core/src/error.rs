use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortfolioSimError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Degenerate volatility in {context}")]
    DegenerateVolatility { context: String },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta:e})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: f64,
    },

    #[error("Infeasible target return {target}: achievable range is [{min}, {max}]")]
    Infeasible { target: f64, min: f64, max: f64 },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PortfolioSimError {
    /// True for per-target optimizer outcomes that the frontier tracer
    /// drops instead of propagating.
    pub fn is_optimization_failure(&self) -> bool {
        matches!(
            self,
            PortfolioSimError::ConvergenceFailure { .. }
                | PortfolioSimError::Infeasible { .. }
                | PortfolioSimError::DegenerateVolatility { .. }
        )
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        PortfolioSimError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for PortfolioSimError {
    fn from(e: serde_json::Error) -> Self {
        PortfolioSimError::SerializationError(e.to_string())
    }
}

impl From<chrono::ParseError> for PortfolioSimError {
    fn from(e: chrono::ParseError) -> Self {
        PortfolioSimError::DateError(e.to_string())
    }
}
