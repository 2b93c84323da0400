//! Per-region latency and uptime statistics over a [`Dataset`].
//!
//! Nothing here fails: regions without records, and records whose fields are
//! missing or unparseable, degrade to zero-valued statistics.

use serde_json::Value;

use regionstats_common::{LatencyQuery, LatencyResponse, RegionStats};

use crate::config::LATENCY_PERCENTILE;
use crate::dataset::{Dataset, TelemetryRecord};
use crate::extract::{LATENCY, UPTIME};

/// Case-insensitive comparison of a record's `region` against an already-lowercased name.
/// Numeric regions compare by their JSON text; any other type never matches.
fn region_matches(record: &TelemetryRecord, wanted_lower: &str) -> bool {
    match record.get("region") {
        Some(Value::String(s)) => eq_lowercase(s, wanted_lower),
        Some(Value::Number(n)) => eq_lowercase(&n.to_string(), wanted_lower),
        _ => false,
    }
}

// Both sides must go through `str::to_lowercase`: it maps a word-final Σ to ς,
// which per-char lowercasing does not.
fn eq_lowercase(candidate: &str, wanted_lower: &str) -> bool {
    candidate.to_lowercase() == wanted_lower
}

/// Records of `dataset` tagged with `region`, ignoring case, in dataset order.
pub fn filter_region<'a>(
    dataset: &'a Dataset,
    region: &str,
) -> impl Iterator<Item = &'a TelemetryRecord> + 'a {
    let wanted = region.to_lowercase();
    dataset.records().iter().filter(move |record| region_matches(record, &wanted))
}

/// Nearest-rank percentile: the element at index `round(q * (n - 1))` of a sorted copy,
/// clamped to the valid range. Halves round to even. Returns 0.0 for an empty slice.
///
/// The result is always one of the input values; ranks are never interpolated.
pub fn nearest_rank(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let last = sorted.len() - 1;
    let rank = (q * last as f64).round_ties_even();
    let idx = if rank.is_nan() || rank < 0.0 { 0 } else { (rank as usize).min(last) };
    sorted[idx]
}

/// Arithmetic mean, 0.0 for an empty slice. Stays finite for finite inputs: when the
/// plain sum overflows, each value is scaled by `1/n` before summing.
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let sum: f64 = values.iter().sum();
    if sum.is_finite() {
        sum / n
    } else {
        values.iter().map(|v| v / n).sum()
    }
}

/// Statistics for one region's records. `region` is echoed as given.
pub fn aggregate_region<'a>(
    region: &str,
    records: impl IntoIterator<Item = &'a TelemetryRecord>,
    threshold_ms: f64,
) -> RegionStats {
    let mut latencies = Vec::new();
    let mut uptimes = Vec::new();
    for record in records {
        latencies.extend(LATENCY.extract(record));
        uptimes.extend(UPTIME.extract(record));
    }

    let mut stats = RegionStats::empty(region);
    if !latencies.is_empty() {
        stats.avg_latency = mean(&latencies);
        stats.p95_latency = nearest_rank(&latencies, LATENCY_PERCENTILE);
        stats.breaches = latencies.iter().filter(|&&ms| ms > threshold_ms).count() as u64;
    }
    if !uptimes.is_empty() {
        stats.avg_uptime = mean(&uptimes);
    }
    stats
}

/// Answer a query: one entry per requested region, in request order, duplicates included.
pub fn compute(dataset: &Dataset, query: &LatencyQuery) -> LatencyResponse {
    let regions = query
        .regions
        .iter()
        .map(|region| aggregate_region(region, filter_region(dataset, region), query.threshold_ms))
        .collect();
    LatencyResponse { regions }
}
