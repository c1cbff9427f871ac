use serde_json::{Map, Value};
use std::io;

/// Write output as CSV to stdout.
///
/// A simulation report is written as one row per frontier point when a
/// frontier was traced, else one row per trial with a weight column per
/// symbol. Stats reports write one row per asset.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value.get("result").and_then(|r| r.as_object().map(|m| (r, m))) {
        Some((result, res)) => {
            let symbols = symbol_list(res);
            if let Some(Value::Array(points)) = result.pointer("/frontier/frontier/points") {
                write_weighted_rows(
                    &mut wtr,
                    &symbols,
                    &["target_return", "expected_return", "volatility"],
                    points,
                );
            } else if let Some(Value::Array(trials)) = result.pointer("/simulation/trials") {
                write_weighted_rows(
                    &mut wtr,
                    &symbols,
                    &["expected_return", "volatility", "sharpe_ratio"],
                    trials,
                );
            } else if let Some(Value::Array(assets)) = res.get("assets") {
                write_array_csv(&mut wtr, assets);
            } else {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in res {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }
        }
        _ => match value {
            Value::Array(arr) => write_array_csv(&mut wtr, arr),
            other => {
                let _ = wtr.write_record([&format_csv_value(other)]);
            }
        },
    }

    let _ = wtr.flush();
}

fn symbol_list(res: &Map<String, Value>) -> Vec<String> {
    match res.get("symbols") {
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Rows of scalar fields followed by one column per symbol weight.
fn write_weighted_rows(
    wtr: &mut csv::Writer<io::StdoutLock<'_>>,
    symbols: &[String],
    fields: &[&str],
    rows: &[Value],
) {
    let mut header: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
    header.extend(symbols.iter().map(|s| format!("w_{s}")));
    let _ = wtr.write_record(&header);

    for row in rows {
        let mut record: Vec<String> = fields
            .iter()
            .map(|f| row.get(*f).map(format_csv_value).unwrap_or_default())
            .collect();
        if let Some(Value::Array(weights)) = row.get("weights") {
            record.extend(weights.iter().map(format_csv_value));
        }
        let _ = wtr.write_record(&record);
    }
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
