// SPDX-License-Identifier: GPL-3.0-only

//! Depth sensor constants - Single source of truth
//!
//! Raw code domain, sentinel, frame geometry and calibration defaults for
//! Kinect-class structured-light sensors in 11-bit depth mode.

/// Number of distinct raw depth codes (11-bit disparity)
pub const DEPTH_DOMAIN_SIZE: usize = 2048;

/// Raw code meaning "no valid depth reading at this pixel"
pub const DEPTH_SENTINEL_CODE: u16 = 2047;

/// Depth frame width in 11-bit mode
pub const KINECT_FRAME_WIDTH: u32 = 640;
/// Depth frame height in 11-bit mode
pub const KINECT_FRAME_HEIGHT: u32 = 480;

/// Buckets in the reduced-resolution display histogram
pub const COARSE_HISTOGRAM_BUCKETS: usize = 32;

/// Width (in characters) of a histogram bar holding every pixel of the frame
pub const HISTOGRAM_BAR_WIDTH: usize = 96;

/// Invalid-pixel percentage above which a frame counts as degraded
pub const DEFAULT_DEGRADATION_THRESHOLD_PERCENT: u32 = 35;

/// Disparity-to-distance curve: `distance_m = K * tan(raw / C + D)`
///
/// Community-fitted constants for the Xbox 360 Kinect (OpenKinect mailing list).
pub const CALIBRATION_SCALE_K: f64 = 0.1236;
/// Divisor applied to the raw code before the tangent
pub const CALIBRATION_DIVISOR_C: f64 = 2842.5;
/// Phase offset added before the tangent
pub const CALIBRATION_OFFSET_D: f64 = 1.1863;

/// Tilt applied at startup by the original tool (degrees, negative = down)
pub const DEFAULT_TILT_DEGREES: i8 = -5;
/// Tilt angle limits (in degrees)
pub const TILT_MIN_DEGREES: i8 = -27;
pub const TILT_MAX_DEGREES: i8 = 27;
