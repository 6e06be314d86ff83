// SPDX-License-Identifier: GPL-3.0-only

//! Frame sources
//!
//! Everything that produces raw depth frames sits behind [`FrameSource`]:
//!
//! ```text
//! ┌──────────────┐  ┌──────────────┐  ┌──────────────┐
//! │ V4L2 (Y16 )  │  │  freedepth   │  │ replay dump  │
//! └──────┬───────┘  └──────┬───────┘  └──────┬───────┘
//!        └─────────────────┼─────────────────┘
//!                          ▼
//!               ┌─────────────────────┐
//!               │   capture thread    │  ← CaptureLoopController
//!               └──────────┬──────────┘
//!                          ▼ sync_channel
//!               ┌─────────────────────┐
//!               │       Monitor       │
//!               └─────────────────────┘
//! ```
//!
//! - [`v4l2`]: Linux kernel Kinect driver, depth node in `Y16 ` format
//! - [`kinect`]: freedepth userspace driver (feature `freedepth`)
//! - [`replay`]: recorded raw frame dumps, and the recorder that writes them
//! - [`capture`]: runs a source on its own thread

pub mod capture;
#[cfg(all(target_arch = "x86_64", feature = "freedepth"))]
pub mod kinect;
pub mod replay;
pub mod types;
pub mod v4l2;
pub mod v4l2_controls;

pub use types::*;

use tracing::{debug, info, warn};

use crate::depth::RawFrame;
use crate::indicator::IndicatorState;

/// Blocking producer of raw depth frames
///
/// Sources are opened on the capture thread and never leave it, so they
/// don't need to be `Send`.
pub trait FrameSource {
    /// Short description for logs and the status bar
    fn describe(&self) -> String;

    /// Block until the next frame is available
    ///
    /// Returns `Ok(None)` when the source is exhausted (end of a dump file).
    /// Live devices never end on their own.
    fn next_frame(&mut self) -> SourceResult<Option<RawFrame>>;

    /// Tilt the sensor, if the source has a motor
    fn set_tilt(&mut self, degrees: i8) -> SourceResult<()> {
        debug!(degrees, "Tilt requested on a source without motor");
        Err(SourceError::NotAvailable(format!(
            "{} has no tilt motor",
            self.describe()
        )))
    }

    /// Show a degradation state on the sensor's own LED, if it has one
    fn set_indicator(&mut self, state: IndicatorState) -> SourceResult<()> {
        debug!(?state, "Indicator requested on a source without LED");
        Err(SourceError::NotAvailable(format!(
            "{} has no LED",
            self.describe()
        )))
    }
}

/// What device to open
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSelector {
    /// Driver stack
    pub kind: SourceKind,
    /// Device node (V4L2) or device index (freedepth); first device if unset
    pub device: Option<String>,
    /// Tilt to apply after opening
    pub tilt: Option<i8>,
}

impl DeviceSelector {
    /// Driver stack that [`open_device`] will use
    ///
    /// [`SourceKind::Auto`] prefers the kernel driver; freedepth is only
    /// chosen when no kernel Kinect depth node exists and no device node
    /// was given.
    pub fn resolved_kind(&self) -> SourceKind {
        match self.kind {
            SourceKind::Auto => {
                if self.device.as_deref().is_some_and(|d| d.starts_with('/'))
                    || !v4l2::find_kinect_depth_devices().is_empty()
                {
                    SourceKind::V4l2
                } else {
                    SourceKind::Kinect
                }
            }
            kind => kind,
        }
    }
}

/// Enumerate depth devices across all driver stacks
pub fn list_devices() -> Vec<DepthDevice> {
    let mut devices = v4l2::find_kinect_depth_devices();

    #[cfg(all(target_arch = "x86_64", feature = "freedepth"))]
    devices.extend(kinect::enumerate_devices());

    debug!(count = devices.len(), "Enumerated depth devices");
    devices
}

/// Open a live depth device
///
/// See [`DeviceSelector::resolved_kind`] for how [`SourceKind::Auto`] is
/// resolved. A tilt failure is logged and does not prevent streaming.
pub fn open_device(selector: &DeviceSelector) -> SourceResult<Box<dyn FrameSource>> {
    let mut source = match selector.resolved_kind() {
        SourceKind::Kinect => open_kinect(selector.device.as_deref())?,
        _ => open_v4l2(selector.device.as_deref())?,
    };

    info!(source = %source.describe(), "Opened depth source");

    if let Some(degrees) = selector.tilt {
        if let Err(e) = source.set_tilt(degrees) {
            warn!(degrees, error = %e, "Failed to tilt sensor");
        }
    }

    Ok(source)
}

fn open_v4l2(device: Option<&str>) -> SourceResult<Box<dyn FrameSource>> {
    let path = match device {
        Some(path) => path.to_string(),
        None => v4l2::find_kinect_depth_devices()
            .into_iter()
            .next()
            .map(|d| d.path)
            .ok_or_else(|| {
                SourceError::DeviceNotFound("no kernel Kinect depth device".to_string())
            })?,
    };
    Ok(Box::new(v4l2::V4l2DepthSource::open(&path)?))
}

#[cfg(all(target_arch = "x86_64", feature = "freedepth"))]
fn open_kinect(device: Option<&str>) -> SourceResult<Box<dyn FrameSource>> {
    let index = match device {
        Some(index) => index.parse::<usize>().map_err(|_| {
            SourceError::DeviceNotFound(format!("invalid freedepth device index '{}'", index))
        })?,
        None => 0,
    };
    Ok(Box::new(kinect::KinectSource::open(index)?))
}

#[cfg(not(all(target_arch = "x86_64", feature = "freedepth")))]
fn open_kinect(_device: Option<&str>) -> SourceResult<Box<dyn FrameSource>> {
    Err(SourceError::NotAvailable(
        "built without the freedepth feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Still;

    impl FrameSource for Still {
        fn describe(&self) -> String {
            "still".to_string()
        }

        fn next_frame(&mut self) -> SourceResult<Option<RawFrame>> {
            Ok(None)
        }
    }

    #[test]
    fn test_default_tilt_is_not_available() {
        let err = Still.set_tilt(-5).unwrap_err();
        assert!(matches!(err, SourceError::NotAvailable(_)));
    }

    #[test]
    fn test_default_indicator_is_not_available() {
        let err = Still.set_indicator(IndicatorState::Alert).unwrap_err();
        assert!(matches!(err, SourceError::NotAvailable(_)));
    }

    #[test]
    fn test_explicit_node_resolves_to_v4l2() {
        let selector = DeviceSelector {
            kind: SourceKind::Auto,
            device: Some("/dev/video3".to_string()),
            tilt: None,
        };
        assert_eq!(selector.resolved_kind(), SourceKind::V4l2);

        let selector = DeviceSelector {
            kind: SourceKind::Kinect,
            ..Default::default()
        };
        assert_eq!(selector.resolved_kind(), SourceKind::Kinect);
    }

    #[test]
    fn test_missing_v4l2_node_is_reported() {
        let selector = DeviceSelector {
            kind: SourceKind::V4l2,
            device: Some("/nonexistent/video99".to_string()),
            tilt: None,
        };
        assert!(open_device(&selector).is_err());
    }
}
