use proptest::prelude::*;
use regionstats_common::{LatencyQuery, RegionStats};
use regionstats_server::aggregate::{aggregate_region, compute, filter_region, nearest_rank};
use regionstats_server::dataset::Dataset;

// --- Test helpers ---

fn sample_dataset() -> Dataset {
    Dataset::from_json_str(
        r#"[
            {"region":"us-east","latency_ms":100,"uptime":1},
            {"region":"us-east","latency_ms":300,"uptime":0},
            {"region":"eu-west","latency_ms":50,"uptime":1}
        ]"#,
    )
    .unwrap()
}

fn query(regions: &[&str], threshold_ms: f64) -> LatencyQuery {
    LatencyQuery { regions: regions.iter().map(|r| r.to_string()).collect(), threshold_ms }
}

fn single(dataset: &Dataset, region: &str, threshold_ms: f64) -> RegionStats {
    let mut response = compute(dataset, &query(&[region], threshold_ms));
    assert_eq!(response.regions.len(), 1);
    response.regions.remove(0)
}

// --- Percentile ---

#[test]
fn test_nearest_rank_empty_is_zero() {
    assert_eq!(nearest_rank(&[], 0.95), 0.0);
}

#[test]
fn test_nearest_rank_single_value() {
    assert_eq!(nearest_rank(&[42.0], 0.95), 42.0);
}

#[test]
fn test_nearest_rank_two_values_selects_upper() {
    // index round(0.95 * 1) = 1
    assert_eq!(nearest_rank(&[300.0, 100.0], 0.95), 300.0);
}

#[test]
fn test_nearest_rank_does_not_interpolate() {
    // n = 5: index round(0.95 * 4) = round(3.8) = 4 -> 50.0
    // Linear interpolation would give 48.0.
    assert_eq!(nearest_rank(&[10.0, 20.0, 30.0, 40.0, 50.0], 0.95), 50.0);

    // n = 4: index round(0.95 * 3) = round(2.85) = 3
    assert_eq!(nearest_rank(&[4.0, 1.0, 3.0, 2.0], 0.95), 4.0);
}

#[test]
fn test_nearest_rank_twenty_values() {
    // n = 20: index round(0.95 * 19) = round(18.05) = 18 -> 19th smallest
    let values: Vec<f64> = (1..=20).map(f64::from).collect();
    assert_eq!(nearest_rank(&values, 0.95), 19.0);
}

#[test]
fn test_nearest_rank_halfway_rounds_to_even() {
    // q * (n - 1) = 0.5 * 3 = 1.5 -> index 2; 0.5 * 5 = 2.5 -> index 2
    assert_eq!(nearest_rank(&[1.0, 2.0, 3.0, 4.0], 0.5), 3.0);
    assert_eq!(nearest_rank(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 0.5), 3.0);
}

#[test]
fn test_nearest_rank_clamps_quantile() {
    let values = [3.0, 1.0, 2.0];
    assert_eq!(nearest_rank(&values, 0.0), 1.0);
    assert_eq!(nearest_rank(&values, 1.0), 3.0);
    assert_eq!(nearest_rank(&values, 2.0), 3.0);
    assert_eq!(nearest_rank(&values, -1.0), 1.0);
}

#[test]
fn test_nearest_rank_leaves_input_untouched() {
    let values = vec![5.0, 1.0, 3.0];
    nearest_rank(&values, 0.95);
    assert_eq!(values, vec![5.0, 1.0, 3.0]);
}

// --- Region filter ---

#[test]
fn test_filter_region_is_case_insensitive() {
    let dataset = sample_dataset();
    assert_eq!(filter_region(&dataset, "us-east").count(), 2);
    assert_eq!(filter_region(&dataset, "US-EAST").count(), 2);
    assert_eq!(filter_region(&dataset, "Eu-West").count(), 1);
    assert_eq!(filter_region(&dataset, "ap-south").count(), 0);
}

#[test]
fn test_filter_region_matches_mixed_case_records() {
    let dataset = Dataset::from_json_str(r#"[{"region":"US-East","ms":1},{"region":"us-east","ms":2}]"#).unwrap();
    assert_eq!(filter_region(&dataset, "us-EAST").count(), 2);
}

#[test]
fn test_filter_region_skips_records_without_string_region() {
    let dataset = Dataset::from_json_str(
        r#"[{"latency_ms":1},{"region":null,"latency_ms":2},{"region":["us-east"]},{"region":7,"ms":3}]"#,
    )
    .unwrap();
    assert_eq!(filter_region(&dataset, "us-east").count(), 0);
    assert_eq!(filter_region(&dataset, "7").count(), 1);
}

#[test]
fn test_filter_region_treats_name_as_opaque() {
    let dataset = sample_dataset();
    assert_eq!(filter_region(&dataset, "").count(), 0);
    assert_eq!(filter_region(&dataset, "us-east ").count(), 0);
    assert_eq!(filter_region(&dataset, ".*").count(), 0);
}

#[test]
fn test_filter_region_matches_identical_final_sigma_names() {
    let dataset = Dataset::from_json_str(r#"[{"region":"ΟΔΟΣ","latency_ms":10},{"region":"οδος","latency_ms":20}]"#).unwrap();
    assert_eq!(filter_region(&dataset, "ΟΔΟΣ").count(), 2);
    assert_eq!(filter_region(&dataset, "οδος").count(), 2);
    assert_eq!(filter_region(&dataset, "Οδος").count(), 2);
}

// --- Aggregation ---

#[test]
fn test_end_to_end_example() {
    let stats = single(&sample_dataset(), "us-east", 150.0);
    assert_eq!(
        stats,
        RegionStats {
            region: "us-east".to_string(),
            avg_latency: 200.0,
            p95_latency: 300.0,
            avg_uptime: 0.5,
            breaches: 1,
        }
    );
}

#[test]
fn test_unmatched_region_yields_zeros() {
    let stats = single(&sample_dataset(), "ap-south", 150.0);
    assert_eq!(stats, RegionStats::empty("ap-south"));
}

#[test]
fn test_empty_dataset_yields_zeros() {
    let stats = single(&Dataset::empty(), "us-east", 0.0);
    assert_eq!(stats, RegionStats::empty("us-east"));
}

#[test]
fn test_case_insensitive_queries_agree_and_echo_input() {
    let dataset = sample_dataset();
    let lower = single(&dataset, "us-east", 150.0);
    let upper = single(&dataset, "US-EAST", 150.0);

    assert_eq!(upper.region, "US-EAST");
    assert_eq!(lower.avg_latency, upper.avg_latency);
    assert_eq!(lower.p95_latency, upper.p95_latency);
    assert_eq!(lower.avg_uptime, upper.avg_uptime);
    assert_eq!(lower.breaches, upper.breaches);
}

#[test]
fn test_threshold_equal_is_not_a_breach() {
    let dataset = sample_dataset();
    assert_eq!(single(&dataset, "us-east", 300.0).breaches, 0);
    assert_eq!(single(&dataset, "us-east", 299.999).breaches, 1);
    assert_eq!(single(&dataset, "us-east", 100.0).breaches, 1);
    assert_eq!(single(&dataset, "us-east", 99.0).breaches, 2);
}

#[test]
fn test_negative_threshold_counts_every_latency() {
    assert_eq!(single(&sample_dataset(), "us-east", -1.0).breaches, 2);
}

#[test]
fn test_record_without_latency_still_counts_uptime() {
    let dataset = Dataset::from_json_str(
        r#"[
            {"region":"r","latency_ms":200,"uptime":1},
            {"region":"r","uptime":0}
        ]"#,
    )
    .unwrap();
    let stats = single(&dataset, "r", 100.0);
    assert_eq!(stats.avg_latency, 200.0);
    assert_eq!(stats.p95_latency, 200.0);
    assert_eq!(stats.breaches, 1);
    assert_eq!(stats.avg_uptime, 0.5);
}

#[test]
fn test_record_without_uptime_still_counts_latency() {
    let dataset = Dataset::from_json_str(
        r#"[
            {"region":"r","latency_ms":100,"uptime":true},
            {"region":"r","latency_ms":300,"uptime":"broken"}
        ]"#,
    )
    .unwrap();
    let stats = single(&dataset, "r", 150.0);
    assert_eq!(stats.avg_latency, 200.0);
    assert_eq!(stats.avg_uptime, 1.0);
    assert_eq!(stats.breaches, 1);
}

#[test]
fn test_all_fields_unparseable_yields_zeros() {
    let dataset = Dataset::from_json_str(
        r#"[{"region":"r","latency_ms":"slow","uptime":"mostly"},{"region":"r"}]"#,
    )
    .unwrap();
    assert_eq!(single(&dataset, "r", 10.0), RegionStats::empty("r"));
}

#[test]
fn test_heterogeneous_aliases_in_one_region() {
    let dataset = Dataset::from_json_str(
        r#"[
            {"region":"mixed","latency_ms":100,"uptime":1},
            {"region":"mixed","ms":"200","up":false},
            {"region":"mixed","latency":300.0,"uptime_pct":50,"host":"a1"}
        ]"#,
    )
    .unwrap();
    let stats = single(&dataset, "mixed", 250.0);
    assert_eq!(stats.avg_latency, 200.0);
    assert_eq!(stats.p95_latency, 300.0);
    assert_eq!(stats.avg_uptime, 0.5);
    assert_eq!(stats.breaches, 1);
}

#[test]
fn test_huge_latencies_keep_mean_finite() {
    let dataset = Dataset::from_json_str(
        r#"[{"region":"r","latency_ms":1e308,"uptime":1},{"region":"r","latency_ms":1e308,"uptime":1}]"#,
    )
    .unwrap();
    let stats = single(&dataset, "r", 150.0);
    assert_eq!(stats.avg_latency, 1e308);
    assert_eq!(stats.p95_latency, 1e308);
    assert_eq!(stats.breaches, 2);
    assert_eq!(stats.avg_uptime, 1.0);
}

#[test]
fn test_opposite_extreme_latencies_average_to_zero() {
    let dataset = Dataset::from_json_str(
        r#"[{"region":"r","ms":1.7e308},{"region":"r","ms":1.7e308},{"region":"r","ms":-1.7e308},{"region":"r","ms":-1.7e308}]"#,
    )
    .unwrap();
    let stats = single(&dataset, "r", 0.0);
    assert!(stats.avg_latency.is_finite());
    assert_eq!(stats.avg_latency, 0.0);
}

#[test]
fn test_duplicate_regions_are_not_deduplicated() {
    let response = compute(&sample_dataset(), &query(&["us-east", "eu-west", "us-east"], 150.0));
    assert_eq!(response.regions.len(), 3);
    assert_eq!(response.regions[0], response.regions[2]);
    assert_eq!(response.regions[1].region, "eu-west");
    assert_eq!(response.regions[1].avg_latency, 50.0);
}

#[test]
fn test_empty_region_list_yields_empty_response() {
    let response = compute(&sample_dataset(), &query(&[], 150.0));
    assert!(response.regions.is_empty());
}

#[test]
fn test_aggregate_region_accepts_any_record_iterator() {
    let dataset = sample_dataset();
    let stats = aggregate_region("all", dataset.records(), 75.0);
    assert_eq!(stats.region, "all");
    assert_eq!(stats.avg_latency, 150.0);
    assert_eq!(stats.breaches, 2);
}

// --- Properties ---

proptest! {
    #[test]
    fn prop_p95_is_an_input_value(values in prop::collection::vec(-1.0e6f64..1.0e6, 1..200)) {
        let p = nearest_rank(&values, 0.95);
        prop_assert!(values.contains(&p));
    }

    #[test]
    fn prop_breaches_match_strict_count(
        latencies in prop::collection::vec(0u32..1_000, 0..100),
        threshold in 0u32..1_000,
    ) {
        let records: Vec<String> = latencies
            .iter()
            .map(|ms| format!(r#"{{"region":"r","latency_ms":{}}}"#, ms))
            .collect();
        let dataset = Dataset::from_json_str(&format!("[{}]", records.join(","))).unwrap();

        let stats = aggregate_region("r", filter_region(&dataset, "R"), f64::from(threshold));
        let expected = latencies.iter().filter(|&&ms| ms > threshold).count() as u64;
        prop_assert_eq!(stats.breaches, expected);
    }
}
