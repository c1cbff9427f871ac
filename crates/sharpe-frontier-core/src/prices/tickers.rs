//! Ticker-history normalization.
//!
//! A company that changes its ticker leaves its history split across two
//! symbols. Merging folds the retired symbol's closes into the current one
//! so the table carries a single column under the current name.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use super::table::PriceSeries;

/// Fold each retired symbol into its current symbol.
///
/// Chains (`X -> A`, `A -> Z`) are followed to their final symbol and
/// applied newest link first, so on dates where several symbols have a
/// close the oldest retired close is kept. Pairs whose retired symbol is
/// absent are ignored; when the current symbol is absent the retired series
/// is simply renamed in place. Cyclic chains are skipped.
pub fn merge_ticker_changes(
    mut series: Vec<PriceSeries>,
    changes: &BTreeMap<String, String>,
) -> Vec<PriceSeries> {
    for (retired, current) in resolve_chains(changes) {
        let Some(old_idx) = series.iter().position(|s| s.symbol == retired) else {
            continue;
        };
        let old = series.remove(old_idx);

        match series.iter_mut().find(|s| s.symbol == current) {
            Some(target) => {
                let merged = old.closes.len();
                target.closes.extend(old.closes);
                debug!(%retired, %current, merged, "merged ticker history");
            }
            None => {
                debug!(%retired, %current, "renamed ticker");
                series.insert(
                    old_idx,
                    PriceSeries {
                        symbol: current,
                        closes: old.closes,
                    },
                );
            }
        }
    }
    series
}

/// `(retired, final symbol)` pairs ordered by chain depth, shallowest first.
fn resolve_chains(changes: &BTreeMap<String, String>) -> Vec<(String, String)> {
    let mut resolved: Vec<(usize, String, String)> = Vec::with_capacity(changes.len());
    'pairs: for retired in changes.keys() {
        let mut seen = BTreeSet::from([retired.as_str()]);
        let mut current = retired.as_str();
        let mut depth = 0;
        while let Some(next) = changes.get(current) {
            if next == current {
                break;
            }
            if !seen.insert(next.as_str()) {
                warn!(%retired, "cyclic ticker changes, skipping");
                continue 'pairs;
            }
            current = next.as_str();
            depth += 1;
        }
        if depth > 0 {
            resolved.push((depth, retired.clone(), current.to_string()));
        }
    }
    resolved.sort();
    resolved
        .into_iter()
        .map(|(_, retired, current)| (retired, current))
        .collect()
}
