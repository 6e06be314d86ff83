// SPDX-License-Identifier: GPL-3.0-only

//! Error types for depthstats

use std::fmt;

use crate::backends::SourceError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type for per-frame statistics
pub type StatsResult<T> = Result<T, StatsError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Statistics engine errors (per frame)
    Stats(StatsError),
    /// Frame source errors (device acquisition, replay files)
    Source(SourceError),
    /// Configuration errors
    Config(String),
    /// Terminal or filesystem I/O errors
    Io(String),
    /// Generic error with message
    Other(String),
}

/// Errors produced by the frame statistics engine
///
/// Both variants are local to a single frame: the caller skips that frame
/// and keeps processing the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// The frame cannot be processed (caller bug or corrupted delivery)
    InvalidFrame(FrameDefect),
    /// Every pixel held the sentinel code, so mean and median are undefined
    NoValidSamples {
        /// Number of pixels in the frame (all of them invalid)
        total_pixels: usize,
        /// Over-threshold flag for the frame (true for any threshold below 100)
        over_threshold: bool,
    },
}

/// Reason a frame was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDefect {
    /// Frame has zero width or zero height
    Empty,
    /// Sample count does not match `width * height`
    LengthMismatch { expected: usize, actual: usize },
    /// A non-sentinel sample lies outside `[0, domain_size)`
    SampleOutOfRange {
        index: usize,
        code: u16,
        domain_size: usize,
    },
    /// The statistics parameters do not describe a usable code domain
    UnsupportedParams {
        domain_size: usize,
        sentinel_code: u16,
        degradation_threshold_percent: u32,
    },
}

impl StatsError {
    /// Over-threshold flag carried by the error, if the frame was otherwise valid
    ///
    /// A frame made only of sentinel samples still has a well-defined invalid
    /// fraction, so the degradation tracker must still see it.
    pub fn over_threshold(&self) -> Option<bool> {
        match self {
            StatsError::NoValidSamples { over_threshold, .. } => Some(*over_threshold),
            StatsError::InvalidFrame(_) => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Stats(e) => write!(f, "Statistics error: {}", e),
            AppError::Source(e) => write!(f, "Frame source error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Io(msg) => write!(f, "I/O error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsError::InvalidFrame(defect) => write!(f, "Invalid frame: {}", defect),
            StatsError::NoValidSamples { total_pixels, .. } => {
                write!(f, "No valid samples: all {} pixels out of range", total_pixels)
            }
        }
    }
}

impl fmt::Display for FrameDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameDefect::Empty => write!(f, "frame has no pixels"),
            FrameDefect::LengthMismatch { expected, actual } => {
                write!(f, "expected {} samples, got {}", expected, actual)
            }
            FrameDefect::SampleOutOfRange {
                index,
                code,
                domain_size,
            } => write!(
                f,
                "sample {} at pixel {} is outside the raw code domain 0..{}",
                code, index, domain_size
            ),
            FrameDefect::UnsupportedParams {
                domain_size,
                sentinel_code,
                degradation_threshold_percent,
            } => write!(
                f,
                "unsupported parameters: domain 0..{}, sentinel {}, threshold {}%",
                domain_size, sentinel_code, degradation_threshold_percent
            ),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for StatsError {}

impl From<StatsError> for AppError {
    fn from(err: StatsError) -> Self {
        AppError::Stats(err)
    }
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        AppError::Source(err)
    }
}

impl From<FrameDefect> for StatsError {
    fn from(defect: FrameDefect) -> Self {
        StatsError::InvalidFrame(defect)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_over_threshold_only_for_degenerate_frames() {
        let degenerate = StatsError::NoValidSamples {
            total_pixels: 4,
            over_threshold: true,
        };
        assert_eq!(degenerate.over_threshold(), Some(true));

        let invalid = StatsError::InvalidFrame(FrameDefect::Empty);
        assert_eq!(invalid.over_threshold(), None);
    }

    #[test]
    fn test_display_messages() {
        let err = StatsError::InvalidFrame(FrameDefect::SampleOutOfRange {
            index: 7,
            code: 4000,
            domain_size: 2048,
        });
        assert_eq!(
            err.to_string(),
            "Invalid frame: sample 4000 at pixel 7 is outside the raw code domain 0..2048"
        );

        let app: AppError = err.into();
        assert!(app.to_string().starts_with("Statistics error:"));
    }
}
