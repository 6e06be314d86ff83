// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use depthstats::DisplayMode;
use depthstats::depth::{
    COARSE_HISTOGRAM_BUCKETS, DEPTH_DOMAIN_SIZE, DEPTH_SENTINEL_CODE, TILT_MAX_DEGREES,
    TILT_MIN_DEGREES,
};

#[test]
fn test_display_modes() {
    // Verbose plus four single-value modes
    assert_eq!(DisplayMode::ALL.len(), 5);
    assert_eq!(
        DisplayMode::ALL.iter().filter(|mode| mode.is_numeric()).count(),
        4
    );
}

#[test]
fn test_display_mode_names() {
    for mode in DisplayMode::ALL {
        let name = mode.display_name();
        assert!(!name.is_empty(), "Mode {:?} has empty display name", mode);
    }
}

#[test]
fn test_sentinel_is_last_code() {
    assert_eq!(DEPTH_SENTINEL_CODE as usize, DEPTH_DOMAIN_SIZE - 1);
}

#[test]
fn test_coarse_buckets_divide_domain() {
    assert_eq!(DEPTH_DOMAIN_SIZE % COARSE_HISTOGRAM_BUCKETS, 0);
}

#[test]
fn test_tilt_range_is_symmetric() {
    assert_eq!(TILT_MIN_DEGREES, -TILT_MAX_DEGREES);
}
