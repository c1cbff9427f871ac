use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

use crate::error::PortfolioSimError;
use crate::PortfolioSimResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Daily closes for a single symbol as delivered by a price provider.
///
/// Dates missing from `closes` are gaps; [`PriceTable::align`] fills them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub closes: BTreeMap<NaiveDate, f64>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            closes: BTreeMap::new(),
        }
    }

    pub fn from_points(symbol: impl Into<String>, points: &[(NaiveDate, f64)]) -> Self {
        Self {
            symbol: symbol.into(),
            closes: points.iter().copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}

/// Dense, aligned close-price table: one shared date axis, one column per
/// symbol. Column order defines the index order of every weight vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    symbols: Vec<String>,
    columns: Vec<Vec<f64>>,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl PriceTable {
    /// Build a table from an already dense set of columns.
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> PortfolioSimResult<Self> {
        if columns.is_empty() {
            return Err(PortfolioSimError::InsufficientData(
                "At least one asset column required".into(),
            ));
        }

        if let Some(pos) = dates.windows(2).position(|w| w[1] <= w[0]) {
            return Err(PortfolioSimError::invalid(
                "dates",
                format!(
                    "Dates must be strictly increasing: {} is followed by {}",
                    dates[pos],
                    dates[pos + 1]
                ),
            ));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for (symbol, closes) in &columns {
            if !seen.insert(symbol.as_str()) {
                return Err(PortfolioSimError::invalid(
                    "symbols",
                    format!("Duplicate symbol '{}'", symbol),
                ));
            }
            if closes.len() != dates.len() {
                return Err(PortfolioSimError::invalid(
                    symbol,
                    format!("Expected {} prices but got {}", dates.len(), closes.len()),
                ));
            }
            if let Some((i, p)) = closes
                .iter()
                .enumerate()
                .find(|(_, p)| !p.is_finite() || **p <= 0.0)
            {
                return Err(PortfolioSimError::invalid(
                    symbol,
                    format!("Price on {} must be finite and positive, got {}", dates[i], p),
                ));
            }
        }

        let (symbols, columns) = columns.into_iter().unzip();
        Ok(Self {
            dates,
            symbols,
            columns,
        })
    }

    /// Align raw series onto the union of their dates.
    ///
    /// Gaps are forward-filled, then leading gaps are back-filled from the
    /// first observation. Series without any observation are dropped.
    pub fn align(series: Vec<PriceSeries>) -> PortfolioSimResult<Self> {
        let (present, empty): (Vec<_>, Vec<_>) =
            series.into_iter().partition(|s| !s.is_empty());
        for s in &empty {
            warn!(symbol = %s.symbol, "no price data, dropping symbol");
        }
        if present.is_empty() {
            return Err(PortfolioSimError::InsufficientData(
                "No symbol has any price data".into(),
            ));
        }

        let axis: BTreeSet<NaiveDate> = present
            .iter()
            .flat_map(|s| s.closes.keys().copied())
            .collect();
        let dates: Vec<NaiveDate> = axis.into_iter().collect();

        let mut columns = Vec::with_capacity(present.len());
        for s in present {
            let mut filled: Vec<Option<f64>> =
                dates.iter().map(|d| s.closes.get(d).copied()).collect();
            let gaps = filled.iter().filter(|v| v.is_none()).count();

            let mut last = None;
            for slot in filled.iter_mut() {
                match slot {
                    Some(v) => last = Some(*v),
                    None => *slot = last,
                }
            }
            // Leading gaps take the first observed close.
            let first = filled.iter().flatten().next().copied();
            let closes: Vec<f64> = filled
                .into_iter()
                .map(|v| v.or(first).unwrap_or(f64::NAN))
                .collect();

            if gaps > 0 {
                debug!(symbol = %s.symbol, gaps, "filled price gaps");
            }
            columns.push((s.symbol, closes));
        }

        Self::new(dates, columns)
    }
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

impl PriceTable {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn num_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn num_assets(&self) -> usize {
        self.symbols.len()
    }

    /// Closes for the column at `index`.
    pub fn column(&self, index: usize) -> &[f64] {
        &self.columns[index]
    }

    pub fn column_by_symbol(&self, symbol: &str) -> Option<&[f64]> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.symbols
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_new_valid_table() {
        let table = PriceTable::new(
            vec![d(2), d(3), d(4)],
            vec![
                ("AAA".into(), vec![10.0, 11.0, 12.0]),
                ("BBB".into(), vec![20.0, 19.0, 21.0]),
            ],
        )
        .unwrap();
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.num_assets(), 2);
        assert_eq!(table.symbols(), &["AAA".to_string(), "BBB".to_string()]);
        assert_eq!(table.column_by_symbol("BBB").unwrap(), &[20.0, 19.0, 21.0]);
        assert!(table.column_by_symbol("CCC").is_none());
    }

    #[test]
    fn test_new_rejects_no_columns() {
        let err = PriceTable::new(vec![d(2)], vec![]).unwrap_err();
        assert!(matches!(err, PortfolioSimError::InsufficientData(_)));
    }

    #[test]
    fn test_new_rejects_unsorted_dates() {
        let err = PriceTable::new(
            vec![d(3), d(2)],
            vec![("AAA".into(), vec![1.0, 2.0])],
        )
        .unwrap_err();
        assert!(matches!(err, PortfolioSimError::InvalidInput { .. }));
    }

    #[test]
    fn test_new_rejects_duplicate_dates() {
        assert!(PriceTable::new(
            vec![d(2), d(2)],
            vec![("AAA".into(), vec![1.0, 2.0])],
        )
        .is_err());
    }

    #[test]
    fn test_new_rejects_duplicate_symbols() {
        assert!(PriceTable::new(
            vec![d(2)],
            vec![("AAA".into(), vec![1.0]), ("AAA".into(), vec![2.0])],
        )
        .is_err());
    }

    #[test]
    fn test_new_rejects_ragged_and_non_positive() {
        assert!(PriceTable::new(vec![d(2), d(3)], vec![("AAA".into(), vec![1.0])]).is_err());
        assert!(PriceTable::new(vec![d(2)], vec![("AAA".into(), vec![0.0])]).is_err());
        assert!(PriceTable::new(vec![d(2)], vec![("AAA".into(), vec![f64::NAN])]).is_err());
    }

    #[test]
    fn test_align_forward_then_backward_fill() {
        let a = PriceSeries::from_points("AAA", &[(d(2), 10.0), (d(4), 12.0)]);
        let b = PriceSeries::from_points("BBB", &[(d(3), 5.0), (d(5), 6.0)]);
        let table = PriceTable::align(vec![a, b]).unwrap();

        assert_eq!(table.dates(), &[d(2), d(3), d(4), d(5)]);
        assert_eq!(table.column(0), &[10.0, 10.0, 12.0, 12.0]);
        assert_eq!(table.column(1), &[5.0, 5.0, 5.0, 6.0]);
    }

    #[test]
    fn test_align_drops_empty_series() {
        let a = PriceSeries::from_points("AAA", &[(d(2), 10.0)]);
        let table = PriceTable::align(vec![a, PriceSeries::new("GONE")]).unwrap();
        assert_eq!(table.symbols(), &["AAA".to_string()]);
    }

    #[test]
    fn test_align_all_empty_is_insufficient() {
        let err = PriceTable::align(vec![PriceSeries::new("GONE")]).unwrap_err();
        assert!(matches!(err, PortfolioSimError::InsufficientData(_)));
    }
}
