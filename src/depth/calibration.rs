// SPDX-License-Identifier: GPL-3.0-only

//! Raw code to distance lookup table
//!
//! Evaluating the tangent curve per sample at 30 fps is wasteful, so the
//! whole code domain is evaluated once at startup and shared read-only.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::constants::{
    CALIBRATION_DIVISOR_C, CALIBRATION_OFFSET_D, CALIBRATION_SCALE_K, DEPTH_DOMAIN_SIZE,
};

/// Disparity-to-distance curve `distance_m = k * tan(code / c + d)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationCurve {
    /// Output scale (metres)
    pub k: f64,
    /// Code divisor
    pub c: f64,
    /// Phase offset (radians)
    pub d: f64,
}

impl Default for CalibrationCurve {
    fn default() -> Self {
        Self {
            k: CALIBRATION_SCALE_K,
            c: CALIBRATION_DIVISOR_C,
            d: CALIBRATION_OFFSET_D,
        }
    }
}

impl CalibrationCurve {
    /// Evaluate the curve for one raw code
    pub fn evaluate(&self, code: usize) -> f64 {
        self.k * (code as f64 / self.c + self.d).tan()
    }

    /// Check the constants describe an increasing curve
    pub fn validate(&self) -> Result<(), String> {
        if !(self.k.is_finite() && self.c.is_finite() && self.d.is_finite()) {
            return Err(format!("calibration constants must be finite: {:?}", self));
        }
        if self.k <= 0.0 || self.c <= 0.0 {
            return Err(format!(
                "calibration scale and divisor must be positive (k={}, c={})",
                self.k, self.c
            ));
        }
        Ok(())
    }
}

/// Precomputed distance estimate for every raw code
///
/// Entries past the curve's first pole (or any non-finite value) are
/// `f32::INFINITY`, meaning "beyond the calibrated range". The table is
/// therefore non-decreasing over its whole domain.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    distances: Vec<f32>,
    curve: CalibrationCurve,
    /// Last code with a finite distance, if any
    last_calibrated: Option<usize>,
}

impl CalibrationTable {
    /// Build the table for codes `0..domain_size`
    pub fn build(curve: CalibrationCurve, domain_size: usize) -> Self {
        let mut distances = Vec::with_capacity(domain_size);
        let mut previous = f32::NEG_INFINITY;
        let mut saturated = false;
        let mut last_calibrated = None;

        for code in 0..domain_size {
            let value = curve.evaluate(code) as f32;

            // First pole ends the usable range: tan wraps to negative values
            if !saturated && (!value.is_finite() || value < previous) {
                debug!(code, "Calibration curve leaves its monotonic range");
                saturated = true;
            }

            let entry = if saturated { f32::INFINITY } else { value };
            if !saturated {
                last_calibrated = Some(code);
            }
            distances.push(entry);
            previous = entry;
        }

        info!(
            domain_size,
            calibrated_up_to = ?last_calibrated,
            k = curve.k,
            c = curve.c,
            d = curve.d,
            "Calibration table built"
        );

        Self {
            distances,
            curve,
            last_calibrated,
        }
    }

    /// Distance estimate (metres) for a raw code
    ///
    /// Codes outside the table map to `f32::INFINITY`.
    pub fn distance(&self, code: usize) -> f32 {
        self.distances.get(code).copied().unwrap_or(f32::INFINITY)
    }

    /// Whether the code lies inside the calibrated (finite) range
    pub fn is_calibrated(&self, code: usize) -> bool {
        self.distance(code).is_finite()
    }

    /// Last raw code with a finite distance estimate
    pub fn calibrated_range(&self) -> Option<usize> {
        self.last_calibrated
    }

    /// Number of entries (the raw code domain size)
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Curve the table was built from
    pub fn curve(&self) -> &CalibrationCurve {
        &self.curve
    }

    /// All entries, indexed by raw code
    pub fn as_slice(&self) -> &[f32] {
        &self.distances
    }
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self::build(CalibrationCurve::default(), DEPTH_DOMAIN_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_monotonic(table: &CalibrationTable) {
        for pair in table.as_slice().windows(2) {
            assert!(pair[0] <= pair[1], "table decreases: {} > {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_default_table_is_monotonic() {
        let table = CalibrationTable::default();
        assert_eq!(table.len(), DEPTH_DOMAIN_SIZE);
        assert_monotonic(&table);
    }

    #[test]
    fn test_default_table_saturates_past_pole() {
        let table = CalibrationTable::default();

        // pi/2 is crossed near code 1093 with the Kinect constants
        let last = table.calibrated_range().unwrap();
        assert!((1080..1100).contains(&last), "unexpected pole position {}", last);
        assert!(table.is_calibrated(last));
        assert!(!table.is_calibrated(last + 1));
        assert_eq!(table.distance(2046), f32::INFINITY);
    }

    #[test]
    fn test_typical_codes_map_to_plausible_distances() {
        let table = CalibrationTable::default();
        // Near codes sit around half a metre, mid-range around a few metres
        assert!(table.distance(0) > 0.2 && table.distance(0) < 0.5);
        let mid = table.distance(800);
        assert!(mid > 0.6 && mid < 2.0, "code 800 maps to {}", mid);
    }

    #[test]
    fn test_curve_without_pole_is_fully_calibrated() {
        let curve = CalibrationCurve {
            k: 1.0,
            c: 10_000.0,
            d: 0.0,
        };
        let table = CalibrationTable::build(curve, 2048);
        assert_eq!(table.calibrated_range(), Some(2047));
        assert_monotonic(&table);
    }

    #[test]
    fn test_out_of_table_lookup() {
        let table = CalibrationTable::build(CalibrationCurve::default(), 4);
        assert_eq!(table.distance(10), f32::INFINITY);
    }

    #[test]
    fn test_validate_rejects_bad_constants() {
        assert!(CalibrationCurve::default().validate().is_ok());
        let negative = CalibrationCurve {
            k: -1.0,
            ..CalibrationCurve::default()
        };
        assert!(negative.validate().is_err());
        let nan = CalibrationCurve {
            d: f64::NAN,
            ..CalibrationCurve::default()
        };
        assert!(nan.validate().is_err());
    }
}
