// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to print for each frame
///
/// Verbose is the full report for a human at a terminal; the other modes
/// print a single number per frame, intended for piping into other tools.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    /// Extremes, invalid percentage, mean, median and a coarse histogram
    #[default]
    Verbose,
    /// Raw median code
    Median,
    /// Calibrated median distance
    MedianScaled,
    /// Raw mean code, rounded
    Mean,
    /// Calibrated mean distance
    MeanScaled,
}

impl DisplayMode {
    /// All modes, for help output and tests
    pub const ALL: [DisplayMode; 5] = [
        DisplayMode::Verbose,
        DisplayMode::Median,
        DisplayMode::MedianScaled,
        DisplayMode::Mean,
        DisplayMode::MeanScaled,
    ];

    /// Get display name for the mode
    pub fn display_name(&self) -> &'static str {
        match self {
            DisplayMode::Verbose => "Verbose",
            DisplayMode::Median => "Median",
            DisplayMode::MedianScaled => "Scaled median",
            DisplayMode::Mean => "Mean",
            DisplayMode::MeanScaled => "Scaled mean",
        }
    }

    /// Whether the mode prints one number per frame
    pub fn is_numeric(&self) -> bool {
        !matches!(self, DisplayMode::Verbose)
    }
}

/// Application identity
pub mod app {
    /// Directory name under the user's config directory
    pub const CONFIG_DIR_NAME: &str = "depthstats";
    /// Config file name
    pub const CONFIG_FILE_NAME: &str = "config.json";
}

/// Frame delivery timing
pub mod timing {
    use super::Duration;

    /// How long the monitor waits for a frame before polling input again
    pub const FRAME_POLL_INTERVAL: Duration = Duration::from_millis(16);

    /// Frames buffered between the capture thread and the monitor
    pub const FRAME_CHANNEL_CAPACITY: usize = 4;

    /// Blink period of the indicator LED in alert state
    pub const INDICATOR_BLINK_MS: u32 = 250;
}
