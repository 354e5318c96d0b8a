//! Feature extraction tests on hand-built windows.

use std::time::Duration;
use stream_feature_extractor::{
    longest_streak, Direction, FeatureConfig, FeatureExtractor, FeatureMatrix, FlowSeries,
    PacketRecord, PeakProminence, RollingAggregator, RollingStat, SpectralProminenceEstimator,
    StreamingLabel, Windower,
};

const S: Direction = Direction::Sent;
const R: Direction = Direction::Received;

fn flow(packets: &[(i64, u64, Direction)], label: StreamingLabel) -> FlowSeries {
    let records = packets
        .iter()
        .map(|&(t, size, dir)| PacketRecord::new(t, size, dir))
        .collect();
    FlowSeries::new("test", label, records)
}

/// Extract the single window of a short flow.
fn extract_one(extractor: &FeatureExtractor, flow: &FlowSeries) -> Option<[f64; 13]> {
    let window = Windower::new(90_000).windows(flow).next()?;
    extractor
        .extract(&window)
        .unwrap()
        .map(|vector| vector.features())
}

// ============================================================================
// Per-window features
// ============================================================================

#[test]
fn test_ratios_and_size_classes() {
    let packets = [
        (0, 100, S),
        (5, 1500, R),
        (10, 1500, R),
        (20, 150, R),
        (30, 1300, S),
        (40, 800, R),
    ];
    let row = extract_one(
        &FeatureExtractor::new(),
        &flow(&packets, StreamingLabel::Streaming),
    )
    .unwrap();

    assert_eq!(row[0], 1400.0 / 3950.0); // bytes_sr_ratio
    assert_eq!(row[1], 2.0 / 4.0); // count_sr_ratio
    assert_eq!(row[4], 3950.0 / 4.0); // received_mean_size
    assert_eq!(row[5], 700.0); // sent_mean_size
    assert_eq!(row[6], 0.5); // sent_large_prop
    assert_eq!(row[7], 0.5); // sent_small_prop
    assert_eq!(row[8], 0.5); // received_large_prop
    assert_eq!(row[9], 0.25); // received_small_prop
}

#[test]
fn test_streaks_and_delays_use_all_but_first_packet() {
    // Delay frame: R R R S R, delays 10 20 30 40 50
    let packets = [
        (0, 100, S),
        (10, 900, R),
        (30, 900, R),
        (60, 900, R),
        (100, 100, S),
        (150, 900, R),
    ];
    let row = extract_one(
        &FeatureExtractor::new(),
        &flow(&packets, StreamingLabel::Streaming),
    )
    .unwrap();

    assert_eq!(row[10], 1.0); // sent_longest_streak
    assert_eq!(row[11], 3.0); // received_longest_streak

    // Trailing-window means of 10, 20, 30, 40, 50 inside a 10 s horizon:
    // 10, 15, 20, 25, 30 -> 20
    assert_eq!(row[2], 20.0);
    assert_eq!(row[3], 20.0);
}

#[test]
fn test_short_horizon_forgets_old_delays() {
    let config = FeatureConfig::default().with_rolling_windows(1_000, 60_000);
    let extractor = FeatureExtractor::with_config(config).unwrap();

    // Delays 100, 100, 3000, 100
    let packets = [
        (0, 100, S),
        (100, 900, R),
        (200, 900, R),
        (3_200, 900, R),
        (3_300, 100, S),
    ];
    let row = extract_one(&extractor, &flow(&packets, StreamingLabel::Streaming)).unwrap();

    // 1 s means: 100, 100, 3000, 1550
    let short = (100.0 + 100.0 + 3000.0 + 1550.0) / 4.0;
    assert!((row[2] - short).abs() < 1e-9);
    // 60 s means: 100, 100, 1066.67, 825
    let long = (100.0 + 100.0 + 3200.0 / 3.0 + 825.0) / 4.0;
    assert!((row[3] - long).abs() < 1e-9);
}

#[test]
fn test_label_follows_flow() {
    let packets = [(0, 100, S), (10, 900, R), (20, 100, S)];
    let extractor = FeatureExtractor::new();
    for label in [StreamingLabel::Streaming, StreamingLabel::NotStreaming] {
        let flow = flow(&packets, label);
        let window = Windower::new(90_000).windows(&flow).next().unwrap();
        let vector = extractor.extract(&window).unwrap().unwrap();
        assert_eq!(vector.streaming, label);
        assert_eq!(vector.to_row()[13], label.as_f64());
    }
}

// ============================================================================
// Skipped and incomplete windows
// ============================================================================

#[test]
fn test_uplink_only_window_is_skipped() {
    let packets = [(0, 100, S), (10, 100, S), (20, 100, S)];
    let row = extract_one(&FeatureExtractor::new(), &flow(&packets, StreamingLabel::Streaming));
    assert!(row.is_none());
}

#[test]
fn test_downlink_only_window_is_dropped_from_matrix() {
    let packets = [(0, 900, R), (10, 900, R), (20, 900, R)];
    let flow = flow(&packets, StreamingLabel::Streaming);
    let window = Windower::new(90_000).windows(&flow).next().unwrap();
    let vector = FeatureExtractor::new().extract(&window).unwrap().unwrap();

    assert!(vector.sent_mean_size.is_nan());
    assert_eq!(vector.sent_large_prop, 0.0);
    assert_eq!(vector.bytes_sr_ratio, 0.0);
    assert!(!vector.is_complete());

    let matrix = FeatureMatrix::from_vectors(vec![vector]);
    assert!(matrix.is_empty());
    assert_eq!(matrix.dropped_incomplete(), 1);
}

// ============================================================================
// Building blocks
// ============================================================================

#[test]
fn test_longest_streak() {
    let dirs = [S, S, R, R, R, S, R, R];
    assert_eq!(longest_streak(dirs, S), 2);
    assert_eq!(longest_streak(dirs, R), 3);
    assert_eq!(longest_streak([S, S], R), 0);
    assert_eq!(longest_streak(Vec::<Direction>::new(), S), 0);
}

#[test]
fn test_rolling_aggregator_statistics() {
    let agg = RollingAggregator::from_names(Duration::from_secs(2), &["mean", "max", "count"])
        .unwrap();
    let times = [0, 1_000, 1_500, 2_000, 5_000];
    let values = [4.0, 2.0, 6.0, 1.0, 3.0];
    let series = agg.aggregate(&times, &values).unwrap();

    assert_eq!(series.column(RollingStat::Count).unwrap(), &[1.0, 2.0, 3.0, 3.0, 1.0]);
    assert_eq!(series.column(RollingStat::Max).unwrap(), &[4.0, 4.0, 6.0, 6.0, 3.0]);
    let means = series.column(RollingStat::Mean).unwrap();
    for (mean, expected) in means.iter().zip([4.0, 3.0, 4.0, 3.0, 3.0]) {
        assert!((mean - expected).abs() < 1e-9, "{mean} != {expected}");
    }
    assert!(series.column(RollingStat::Std).is_none());
}

#[test]
fn test_rolling_aggregator_rejects_unknown_name() {
    assert!(RollingAggregator::from_names(Duration::from_secs(1), &["median"]).is_err());
}

#[test]
fn test_spectral_periodic_beats_constant() {
    let estimator = SpectralProminenceEstimator::new(500, 2.0);

    let periodic: Vec<(i64, f64)> = (0..240)
        .map(|i| (i * 250, if i % 16 < 2 { 1400.0 } else { 60.0 }))
        .collect();
    let constant: Vec<(i64, f64)> = (0..240).map(|i| (i * 250, 500.0)).collect();

    let periodic = estimator.estimate(periodic);
    let constant = estimator.estimate(constant);

    assert!(periodic.is_peak());
    assert!(periodic.value() > constant.value());
}

#[test]
fn test_spectral_empty_input_has_no_peak() {
    let estimator = SpectralProminenceEstimator::new(500, 2.0);
    assert_eq!(estimator.estimate(Vec::<(i64, f64)>::new()), PeakProminence::NoPeak);
}
