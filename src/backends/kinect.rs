// SPDX-License-Identifier: GPL-3.0-only

//! freedepth userspace driver source
//!
//! freedepth talks to the Kinect over USB directly, unbinding the kernel
//! driver while it streams. The driver is rebound when the source is
//! dropped.
//!
//! The sensor's front LED doubles as the degradation indicator: green while
//! frames are healthy, blinking red/yellow while degraded, off when the
//! source is dropped.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use freedepth::{
    DepthFormat, DepthFrame, KinectStreamer, Led, Resolution, VideoFormat, VideoFrame,
};
use tracing::{debug, info, warn};

use super::{DepthDevice, FrameSource, SourceError, SourceKind, SourceResult};
use crate::depth::{RawFrame, TILT_MAX_DEGREES, TILT_MIN_DEGREES};
use crate::indicator::IndicatorState;

/// Longest wait for a depth frame before the device counts as stalled
const FRAME_TIMEOUT: Duration = Duration::from_secs(2);

/// Enumerate Kinects reachable through freedepth
pub fn enumerate_devices() -> Vec<DepthDevice> {
    let devices = match freedepth::enumerate_devices() {
        Ok(d) => d,
        Err(e) => {
            debug!("Failed to enumerate freedepth devices: {}", e);
            return Vec::new();
        }
    };

    devices
        .iter()
        .map(|dev| {
            let serial = dev.id.serial.clone().unwrap_or_else(|| "unknown".to_string());
            debug!(name = %dev.name, index = dev.index, serial = %serial, "Found freedepth device");
            DepthDevice {
                name: format!("{} ({})", dev.name, serial),
                path: dev.index.to_string(),
                kind: SourceKind::Kinect,
                driver: format!("freedepth/{}", dev.id.family),
                bus_info: format!("usb:{}:{}", dev.id.bus, dev.id.address),
            }
        })
        .collect()
}

/// 11-bit depth frames from freedepth
pub struct KinectSource {
    index: usize,
    streamer: KinectStreamer,
    depth_rx: Receiver<DepthFrame>,
    // The video stream must stay open for depth to flow
    _video_rx: Receiver<VideoFrame>,
    sequence: u32,
}

impl KinectSource {
    /// Claim the device and start the depth stream
    pub fn open(index: usize) -> SourceResult<Self> {
        info!(device = index, "Starting freedepth depth stream");

        let mut streamer = KinectStreamer::new(index).map_err(|e| {
            SourceError::DeviceNotFound(format!("freedepth device {}: {}", index, e))
        })?;

        let (video_rx, depth_rx) = streamer
            .start(VideoFormat::Bayer, Resolution::Medium, DepthFormat::Depth11Bit)
            .map_err(|e| SourceError::Other(format!("Failed to start streaming: {}", e)))?;

        Ok(Self {
            index,
            streamer,
            depth_rx,
            _video_rx: video_rx,
            sequence: 0,
        })
    }
}

impl FrameSource for KinectSource {
    fn describe(&self) -> String {
        format!("freedepth device {}", self.index)
    }

    fn next_frame(&mut self) -> SourceResult<Option<RawFrame>> {
        let frame = match self.depth_rx.recv_timeout(FRAME_TIMEOUT) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => {
                return Err(SourceError::Io(format!(
                    "no depth frame within {:?}",
                    FRAME_TIMEOUT
                )));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(SourceError::Io("depth stream closed".to_string()));
            }
        };

        let samples = frame.as_u16().ok_or_else(|| {
            SourceError::FormatNotSupported("depth frame is not 16-bit aligned".to_string())
        })?;

        self.sequence = self.sequence.wrapping_add(1);
        Ok(Some(
            RawFrame::new(frame.width, frame.height, samples.to_vec())
                .with_timing(self.sequence, frame.timestamp as u32),
        ))
    }

    fn set_tilt(&mut self, degrees: i8) -> SourceResult<()> {
        let degrees = degrees.clamp(TILT_MIN_DEGREES, TILT_MAX_DEGREES);
        self.streamer
            .set_tilt(degrees)
            .map_err(|e| SourceError::Other(format!("Failed to set tilt: {}", e)))?;
        info!(device = self.index, degrees, "Sensor tilted");
        Ok(())
    }

    fn set_indicator(&mut self, state: IndicatorState) -> SourceResult<()> {
        let led = led_for(state);
        self.streamer
            .set_led(led)
            .map_err(|e| SourceError::Other(format!("Failed to set LED: {}", e)))?;
        debug!(device = self.index, ?state, "Sensor LED updated");
        Ok(())
    }
}

fn led_for(state: IndicatorState) -> Led {
    match state {
        IndicatorState::Off => Led::Off,
        IndicatorState::Normal => Led::Green,
        IndicatorState::Alert => Led::BlinkRedYellow,
    }
}

impl Drop for KinectSource {
    fn drop(&mut self) {
        info!(device = self.index, "Stopping freedepth depth stream");
        if let Err(e) = self.streamer.set_led(Led::Off) {
            debug!("Failed to switch sensor LED off: {}", e);
        }
        self.streamer.stop();
        if let Err(e) = self.streamer.rebind_driver() {
            warn!("Failed to rebind kernel driver: {}", e);
        }
    }
}
