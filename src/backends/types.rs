// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for frame sources

use serde::{Deserialize, Serialize};

/// Driver stack used to acquire frames from a depth device
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Kernel driver if present, freedepth otherwise
    #[default]
    Auto,
    /// Linux kernel Kinect driver through V4L2
    V4l2,
    /// freedepth userspace USB driver
    Kinect,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Auto => write!(f, "auto"),
            SourceKind::V4l2 => write!(f, "v4l2"),
            SourceKind::Kinect => write!(f, "kinect"),
        }
    }
}

/// Depth device found during enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthDevice {
    /// Human-readable name
    pub name: String,
    /// Selector accepted by `--device` (device node or freedepth index)
    pub path: String,
    /// Driver stack that exposes the device
    pub kind: SourceKind,
    /// Driver name
    pub driver: String,
    /// Bus location (V4L2 bus_info or USB bus/address)
    pub bus_info: String,
}

/// Frame source errors
///
/// These end the run: a device that cannot deliver frames is not something
/// the monitor can work around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Driver stack is not available on this system
    NotAvailable(String),
    /// Requested device was not found
    DeviceNotFound(String),
    /// Device cannot deliver raw depth codes
    FormatNotSupported(String),
    /// Read or write failure (device or dump file)
    Io(String),
    /// Other errors
    Other(String),
}

/// Result type for frame sources
pub type SourceResult<T> = Result<T, SourceError>;

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::NotAvailable(msg) => write!(f, "Source not available: {}", msg),
            SourceError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            SourceError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            SourceError::Io(msg) => write!(f, "I/O error: {}", msg),
            SourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Io(err.to_string())
    }
}
