// SPDX-License-Identifier: GPL-3.0-only

//! Depth frame statistics core
//!
//! - [`frame`]: raw frame buffer as delivered by a source
//! - [`calibration`]: raw code to distance lookup table
//! - [`statistics`]: single-pass histogram, extremes, median and mean
//! - [`degradation`]: edge-triggered invalid-pixel threshold state

pub mod calibration;
mod constants;
pub mod degradation;
pub mod frame;
pub mod statistics;

pub use calibration::{CalibrationCurve, CalibrationTable};
pub use constants::*;
pub use degradation::{DegradationEvent, DegradationTracker};
pub use frame::RawFrame;
pub use statistics::{FrameStatistics, StatisticsParams, compute_statistics};
