// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the frame statistics engine

use depthstats::depth::{
    CalibrationCurve, CalibrationTable, DegradationEvent, DegradationTracker, RawFrame,
    StatisticsParams, compute_statistics,
};
use depthstats::StatsError;

fn small_params() -> StatisticsParams {
    StatisticsParams {
        domain_size: 4,
        sentinel_code: 3,
        degradation_threshold_percent: 35,
    }
}

#[test]
fn test_ten_pixel_scenario() {
    let frame = RawFrame::new(10, 1, vec![0u16, 0, 1, 1, 1, 2, 3, 3, 0, 1]);
    let stats = compute_statistics(&frame, &small_params()).unwrap();

    assert_eq!(stats.invalid_count, 2);
    assert_eq!(stats.valid_count(), 8);
    assert_eq!(stats.fine_histogram, vec![3, 4, 1, 0]);
    assert_eq!(stats.mean, 0.75);
    assert_eq!(stats.median_code, 1);
    assert_eq!(stats.invalid_percent(), 20);
    assert!(!stats.over_threshold);
}

#[test]
fn test_min_max_first_occurrence() {
    let frame = RawFrame::new(10, 1, vec![0u16, 0, 1, 1, 1, 2, 3, 3, 0, 1]);
    let stats = compute_statistics(&frame, &small_params()).unwrap();

    assert_eq!((stats.min_code, stats.min_index), (0, 0));
    assert_eq!((stats.max_code, stats.max_index), (2, 5));
}

#[test]
fn test_all_sentinel_frame() {
    let frame = RawFrame::new(4, 2, vec![2047u16; 8]);
    let err = compute_statistics(&frame, &StatisticsParams::default()).unwrap_err();
    assert_eq!(
        err,
        StatsError::NoValidSamples {
            total_pixels: 8,
            over_threshold: true,
        }
    );
}

#[test]
fn test_threshold_is_strict() {
    let params = StatisticsParams::default();

    // 35 of 100 invalid is not flagged
    let mut samples = vec![500u16; 100];
    samples[..35].fill(2047);
    let stats = compute_statistics(&RawFrame::new(10, 10, samples.clone()), &params).unwrap();
    assert!(!stats.over_threshold);

    // 36 of 100 is
    samples[35] = 2047;
    let stats = compute_statistics(&RawFrame::new(10, 10, samples), &params).unwrap();
    assert!(stats.over_threshold);
}

#[test]
fn test_tracker_sequence() {
    let mut tracker = DegradationTracker::new();
    let events: Vec<_> = [false, false, true, true, false]
        .into_iter()
        .map(|flag| tracker.update(flag))
        .collect();

    assert_eq!(
        events,
        vec![
            None,
            None,
            Some(DegradationEvent::EnteredDegraded),
            None,
            Some(DegradationEvent::ExitedDegraded),
        ]
    );
}

#[test]
fn test_malformed_frames_rejected() {
    let params = small_params();
    assert!(matches!(
        compute_statistics(&RawFrame::new(3, 1, vec![0u16, 1]), &params),
        Err(StatsError::InvalidFrame(_))
    ));
    assert!(matches!(
        compute_statistics(&RawFrame::new(2, 1, vec![0u16, 9]), &params),
        Err(StatsError::InvalidFrame(_))
    ));
    assert!(matches!(
        compute_statistics(&RawFrame::new(0, 0, Vec::<u16>::new()), &params),
        Err(StatsError::InvalidFrame(_))
    ));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    const DOMAIN: usize = 64;
    const SENTINEL: u16 = 63;

    fn params() -> StatisticsParams {
        StatisticsParams {
            domain_size: DOMAIN,
            sentinel_code: SENTINEL,
            degradation_threshold_percent: 35,
        }
    }

    fn cumulative(histogram: &[u32], up_to: usize) -> u64 {
        histogram[..=up_to].iter().map(|&c| c as u64).sum()
    }

    proptest! {
        #[test]
        fn prop_histograms_account_for_every_pixel(
            samples in prop::collection::vec(0u16..DOMAIN as u16, 1..400)
        ) {
            let frame = RawFrame::new(samples.len() as u32, 1, samples);
            match compute_statistics(&frame, &params()) {
                Ok(stats) => {
                    let fine: u64 = stats.fine_histogram.iter().map(|&c| c as u64).sum();
                    let coarse: u64 = stats.coarse_histogram.iter().map(|&c| c as u64).sum();
                    prop_assert_eq!(fine + stats.invalid_count as u64, stats.total_pixels as u64);
                    prop_assert_eq!(coarse, fine);
                }
                Err(StatsError::NoValidSamples { total_pixels, .. }) => {
                    prop_assert!(frame.samples.iter().all(|&s| s == SENTINEL));
                    prop_assert_eq!(total_pixels, frame.samples.len());
                }
                Err(e) => prop_assert!(false, "unexpected error: {}", e),
            }
        }

        #[test]
        fn prop_median_is_lowest_half_point(
            samples in prop::collection::vec(0u16..(DOMAIN as u16 - 1), 1..400)
        ) {
            let frame = RawFrame::new(samples.len() as u32, 1, samples);
            let stats = compute_statistics(&frame, &params()).unwrap();
            let half = stats.valid_count().div_ceil(2) as u64;
            let m = stats.median_code as usize;

            prop_assert!(cumulative(&stats.fine_histogram, m) >= half);
            if m > 0 {
                prop_assert!(cumulative(&stats.fine_histogram, m - 1) < half);
            }
        }

        #[test]
        fn prop_mean_within_extremes(
            samples in prop::collection::vec(0u16..DOMAIN as u16, 1..400)
        ) {
            let frame = RawFrame::new(samples.len() as u32, 1, samples);
            if let Ok(stats) = compute_statistics(&frame, &params()) {
                prop_assert!(stats.min_code as f64 <= stats.mean);
                prop_assert!(stats.mean <= stats.max_code as f64);
            }
        }

        #[test]
        fn prop_calibration_monotonic(
            k in 0.01f64..10.0,
            c in 1.0f64..10000.0,
            d in -3.0f64..3.0,
        ) {
            let table = CalibrationTable::build(CalibrationCurve { k, c, d }, 2048);
            for pair in table.as_slice().windows(2) {
                prop_assert!(pair[0] <= pair[1], "{} > {}", pair[0], pair[1]);
            }
        }
    }
}
