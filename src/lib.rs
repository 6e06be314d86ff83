// SPDX-License-Identifier: GPL-3.0-only

//! depthstats - live statistics for Kinect-class depth sensors
//!
//! Reads raw 11-bit disparity frames and reports, per frame, the extremes,
//! the invalid-pixel fraction, the mean and median code and a coarse
//! histogram, with codes converted to metres through a calibration table.
//! Frames whose invalid fraction crosses a threshold drive an indicator LED.
//!
//! # Architecture
//!
//! - [`depth`]: statistics core (frame, calibration, statistics, degradation)
//! - [`report`]: formatting of statistics for each display mode
//! - [`backends`]: frame sources (V4L2, freedepth, replay) and capture thread
//! - [`monitor`]: the per-run loop tying engine, tracker, indicator and output
//! - [`indicator`]: sysfs LED or log-only degradation indicator
//! - [`terminal`]: full-screen verbose view
//! - [`config`]: user configuration handling

pub mod backends;
pub mod config;
pub mod constants;
pub mod depth;
pub mod errors;
pub mod indicator;
pub mod monitor;
pub mod report;
pub mod terminal;

// Re-export commonly used types
pub use config::Config;
pub use constants::DisplayMode;
pub use depth::{CalibrationTable, FrameStatistics, RawFrame, StatisticsParams, compute_statistics};
pub use errors::{AppError, AppResult, StatsError};
pub use monitor::{Monitor, PlainSink, ReportSink};
