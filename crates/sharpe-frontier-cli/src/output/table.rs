use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::format_value;

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res) if res.contains_key("simulation") => print_simulation(res),
        Value::Object(res) if res.contains_key("assets") => print_stats(res),
        Value::Object(res) => print_flat_object(res),
        other => println!("{}", other),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_simulation(res: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    if let Some(symbols) = res.get("symbols") {
        builder.push_record(["symbols".to_string(), format_value(symbols)]);
    }
    if let Some(Value::Object(sim)) = res.get("simulation") {
        for key in ["seed", "risk_free_rate", "best_index"] {
            if let Some(val) = sim.get(key) {
                builder.push_record([key.to_string(), format_value(val)]);
            }
        }
        if let Some(Value::Array(trials)) = sim.get("trials") {
            builder.push_record(["trials".to_string(), trials.len().to_string()]);
        }
    }
    println!("{}", Table::from(builder));

    match res.get("max_sharpe") {
        Some(alloc) if alloc.is_object() => print_allocation("Max Sharpe (sampled)", alloc),
        _ => println!("\nMax Sharpe (sampled): none"),
    }

    if let Some(Value::Object(report)) = res.get("frontier") {
        for (key, title) in [
            ("global_minimum_variance", "Global minimum variance"),
            ("max_sharpe", "Max Sharpe (frontier)"),
        ] {
            if let Some(alloc) = report.get(key).filter(|a| a.is_object()) {
                print_allocation(title, alloc);
            }
        }
        if let Some(Value::Array(points)) = report.get("frontier").and_then(|f| f.get("points")) {
            print_frontier_points(points);
        }
    }
}

fn print_allocation(title: &str, alloc: &Value) {
    println!("\n{}", title);
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for key in ["expected_return", "volatility", "sharpe_ratio"] {
        if let Some(val) = alloc.get(key) {
            builder.push_record([key.to_string(), format_value(val)]);
        }
    }
    if let Some(Value::Array(weights)) = alloc.get("weights") {
        for w in weights {
            let symbol = w.get("symbol").map(format_value).unwrap_or_default();
            let weight = w.get("weight").map(format_value).unwrap_or_default();
            builder.push_record([format!("weight {symbol}"), weight]);
        }
    }
    println!("{}", Table::from(builder));
}

fn print_frontier_points(points: &[Value]) {
    println!("\nEfficient frontier ({} points)", points.len());
    if points.is_empty() {
        println!("(empty)");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(["target_return", "expected_return", "volatility"]);
    for p in points {
        builder.push_record(["target_return", "expected_return", "volatility"].map(|k| {
            p.get(k).map(format_value).unwrap_or_default()
        }));
    }
    println!("{}", Table::from(builder));
}

fn print_stats(res: &Map<String, Value>) {
    if let Some(Value::Array(assets)) = res.get("assets") {
        print_array_table(assets);
    }
    if let Some(Value::Object(cov)) = res.get("covariance") {
        println!("\nDaily covariance");
        let symbols: Vec<String> = cov.keys().cloned().collect();
        let mut builder = Builder::default();
        let mut header = vec![String::new()];
        header.extend(symbols.iter().cloned());
        builder.push_record(header);
        for (row_sym, row) in cov {
            let mut record = vec![row_sym.clone()];
            record.extend(
                symbols
                    .iter()
                    .map(|s| row.get(s).map(format_value).unwrap_or_default()),
            );
            builder.push_record(record);
        }
        println!("{}", Table::from(builder));
    }
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}
