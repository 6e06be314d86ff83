// SPDX-License-Identifier: GPL-3.0-only

//! Kernel Kinect driver source
//!
//! The kernel driver exposes the depth camera as its own V4L2 node. Raw
//! 11-bit codes come out in `Y16 ` (one little-endian `u16` per pixel); the
//! packed `Y10B` format is not requested because it cannot carry the full
//! 11-bit range.

use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

use tracing::{debug, info, warn};

use super::v4l2_controls::{self, V4l2DeviceInfo};
use super::{DepthDevice, FrameSource, SourceError, SourceKind, SourceResult};
use crate::depth::frame::decode_le_samples;
use crate::depth::{KINECT_FRAME_HEIGHT, KINECT_FRAME_WIDTH, RawFrame};

const DEPTH_FOURCC: &[u8; 4] = b"Y16 ";
const STREAM_BUFFERS: u32 = 4;
const MAX_INTERRUPTED_READS: u32 = 8;

/// Find depth nodes of the kernel Kinect driver
///
/// A Kinect shows up as two nodes sharing a `bus_info`; the depth node is
/// the one offering `Y16 `.
pub fn find_kinect_depth_devices() -> Vec<DepthDevice> {
    let mut paths: Vec<String> = std::fs::read_dir("/dev")
        .into_iter()
        .flatten()
        .flatten()
        .filter(|e| e.file_name().to_str().is_some_and(|n| n.starts_with("video")))
        .map(|e| e.path().to_string_lossy().to_string())
        .collect();
    paths.sort();

    paths
        .into_iter()
        .filter_map(|path| {
            let info = v4l2_controls::query_device_info(&path)?;
            if !info.is_kinect() || !offers_depth_format(&path) {
                return None;
            }
            debug!(path = %path, bus_info = %info.bus_info, "Found kernel Kinect depth node");
            Some(depth_device(path, info))
        })
        .collect()
}

fn offers_depth_format(path: &str) -> bool {
    let Ok(dev) = Device::with_path(path) else {
        return false;
    };
    let fourcc = FourCC::new(DEPTH_FOURCC);
    dev.enum_formats()
        .into_iter()
        .flatten()
        .any(|f| f.fourcc == fourcc)
}

fn depth_device(path: String, info: V4l2DeviceInfo) -> DepthDevice {
    DepthDevice {
        name: format!("{} (depth)", info.card),
        path,
        kind: SourceKind::V4l2,
        driver: info.driver,
        bus_info: info.bus_info,
    }
}

/// Depth frames from a kernel driver node
pub struct V4l2DepthSource {
    path: String,
    width: u32,
    height: u32,
    stream: Stream<'static>,
}

impl V4l2DepthSource {
    /// Open a node and start streaming `Y16 ` at 640x480
    pub fn open(path: &str) -> SourceResult<Self> {
        let dev = Device::with_path(path)
            .map_err(|e| SourceError::DeviceNotFound(format!("{}: {}", path, e)))?;

        let fourcc = FourCC::new(DEPTH_FOURCC);
        let requested = Format::new(KINECT_FRAME_WIDTH, KINECT_FRAME_HEIGHT, fourcc);
        let actual = dev
            .set_format(&requested)
            .map_err(|e| SourceError::FormatNotSupported(format!("{}: {}", path, e)))?;

        if actual.fourcc != fourcc {
            return Err(SourceError::FormatNotSupported(format!(
                "{} delivers {:?} instead of raw depth codes",
                path, actual.fourcc
            )));
        }

        info!(
            path,
            width = actual.width,
            height = actual.height,
            fourcc = ?actual.fourcc,
            "V4L2 depth format configured"
        );

        let stream = Stream::with_buffers(&dev, Type::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| SourceError::Io(format!("Failed to create stream: {}", e)))?;

        Ok(Self {
            path: path.to_string(),
            width: actual.width,
            height: actual.height,
            stream,
        })
    }

    fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 2
    }
}

impl FrameSource for V4l2DepthSource {
    fn describe(&self) -> String {
        format!("v4l2 {} ({}x{})", self.path, self.width, self.height)
    }

    fn next_frame(&mut self) -> SourceResult<Option<RawFrame>> {
        let frame_bytes = self.frame_bytes();
        let mut interrupted = 0;

        loop {
            match self.stream.next() {
                Ok((buf, meta)) => {
                    let timestamp = (meta.timestamp.sec as u32)
                        .wrapping_mul(1_000_000)
                        .wrapping_add(meta.timestamp.usec as u32);
                    let data = &buf[..buf.len().min(frame_bytes)];
                    if data.len() < frame_bytes {
                        debug!(bytes = data.len(), expected = frame_bytes, "Short depth buffer");
                    }

                    let frame = RawFrame::new(self.width, self.height, decode_le_samples(data))
                        .with_timing(meta.sequence, timestamp);
                    return Ok(Some(frame));
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {
                    interrupted += 1;
                    if interrupted >= MAX_INTERRUPTED_READS {
                        return Err(e.into());
                    }
                }
                Err(e) => {
                    warn!(path = %self.path, error = %e, "Failed to capture depth frame");
                    return Err(e.into());
                }
            }
        }
    }

    fn set_tilt(&mut self, degrees: i8) -> SourceResult<()> {
        v4l2_controls::set_tilt(&self.path, degrees).map_err(SourceError::Other)?;
        if let Some(actual) = v4l2_controls::get_tilt(&self.path) {
            info!(path = %self.path, requested = degrees, actual, "Sensor tilted");
        }
        Ok(())
    }
}
