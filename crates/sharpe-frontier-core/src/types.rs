use serde::{Deserialize, Serialize};

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = f64;

/// Portfolio fractions, one per asset column, summing to 1.
pub type Weights = Vec<f64>;

/// Conventional number of trading sessions per year used for annualisation.
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// Tolerance applied when checking that weights form a valid long-only vector.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}

/// Check the long-only budget invariant: every entry in [0, 1], sum 1.
pub fn is_valid_weight_vector(weights: &[f64]) -> bool {
    if weights.is_empty() {
        return false;
    }
    let sum: f64 = weights.iter().sum();
    (sum - 1.0).abs() <= WEIGHT_TOLERANCE
        && weights
            .iter()
            .all(|w| w.is_finite() && *w >= -WEIGHT_TOLERANCE && *w <= 1.0 + WEIGHT_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_weight_vector() {
        assert!(is_valid_weight_vector(&[0.25, 0.75]));
        assert!(is_valid_weight_vector(&[1.0]));
    }

    #[test]
    fn test_invalid_weight_vectors() {
        assert!(!is_valid_weight_vector(&[]));
        assert!(!is_valid_weight_vector(&[0.5, 0.6]));
        assert!(!is_valid_weight_vector(&[1.5, -0.5]));
        assert!(!is_valid_weight_vector(&[f64::NAN, 1.0]));
    }

    #[test]
    fn test_metadata_precision() {
        let out = with_metadata("test", &serde_json::json!({}), vec![], 10, 1.0_f64);
        assert_eq!(out.metadata.precision, "ieee754_f64");
        assert_eq!(out.metadata.computation_time_us, 10);
    }
}
