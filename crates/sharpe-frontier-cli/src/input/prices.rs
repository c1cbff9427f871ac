use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;

use sharpe_frontier_core::prices::tickers::merge_ticker_changes;
use sharpe_frontier_core::prices::{PriceSeries, PriceTable};

use super::file::resolve_path;

/// Load a wide CSV of daily closes into an aligned price table.
///
/// Header is `date,SYM1,SYM2,...`; dates are ISO `YYYY-MM-DD`. Empty cells
/// are gaps, filled by the table's forward/backward fill. Retired tickers
/// are merged into their current symbol before alignment.
pub fn read_prices(
    path: &str,
    ticker_changes: &BTreeMap<String, String>,
) -> Result<PriceTable, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let file = File::open(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let series = parse_series(file)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    let series = merge_ticker_changes(series, ticker_changes);
    Ok(PriceTable::align(series)?)
}

fn parse_series<R: Read>(reader: R) -> Result<Vec<PriceSeries>, Box<dyn std::error::Error>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.len() < 2 {
        return Err("expected a date column followed by at least one symbol column".into());
    }
    let mut series: Vec<PriceSeries> = headers
        .iter()
        .skip(1)
        .map(PriceSeries::new)
        .collect();

    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let row = line + 2;
        let raw_date = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
            .map_err(|e| format!("row {row}: invalid date '{raw_date}': {e}"))?;

        for (col, s) in series.iter_mut().enumerate() {
            let cell = record.get(col + 1).unwrap_or_default();
            if cell.is_empty() {
                continue;
            }
            let close: f64 = cell
                .parse()
                .map_err(|_| format!("row {row}: invalid price '{cell}' for {}", s.symbol))?;
            if s.closes.insert(date, close).is_some() {
                return Err(format!("row {row}: duplicate date {date} for {}", s.symbol).into());
            }
        }
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_wide_csv_with_gaps() {
        let csv = "date,AAA,BBB\n2024-01-02,10.0,20.0\n2024-01-03,,21.0\n2024-01-04,11.0,\n";
        let series = parse_series(csv.as_bytes()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].symbol, "AAA");
        assert_eq!(series[0].closes.len(), 2);
        assert_eq!(series[1].closes.get(&d("2024-01-03")), Some(&21.0));
        assert!(series[1].closes.get(&d("2024-01-04")).is_none());
    }

    #[test]
    fn test_gaps_are_filled_after_alignment() {
        let csv = "date,AAA,BBB\n2024-01-02,10.0,20.0\n2024-01-03,,21.0\n2024-01-04,11.0,22.0\n";
        let table = PriceTable::align(parse_series(csv.as_bytes()).unwrap()).unwrap();
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.column_by_symbol("AAA").unwrap(), &[10.0, 10.0, 11.0]);
    }

    #[test]
    fn test_rows_out_of_order_are_sorted() {
        let csv = "date,AAA\n2024-01-04,12.0\n2024-01-02,10.0\n2024-01-03,11.0\n";
        let series = parse_series(csv.as_bytes()).unwrap();
        let dates: Vec<NaiveDate> = series[0].closes.keys().copied().collect();
        assert_eq!(dates, vec![d("2024-01-02"), d("2024-01-03"), d("2024-01-04")]);
    }

    #[test]
    fn test_duplicate_date_rejected() {
        let csv = "date,AAA\n2024-01-02,10.0\n2024-01-02,11.0\n";
        let err = parse_series(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("duplicate date"));
    }

    #[test]
    fn test_bad_date_rejected() {
        let csv = "date,AAA\n02/01/2024,10.0\n";
        let err = parse_series(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("invalid date"));
    }

    #[test]
    fn test_missing_symbol_columns_rejected() {
        let csv = "date\n2024-01-02\n";
        assert!(parse_series(csv.as_bytes()).is_err());
    }
}
