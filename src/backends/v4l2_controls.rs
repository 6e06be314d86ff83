// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 ioctls used by the kernel Kinect source
//!
//! Device identification through `VIDIOC_QUERYCAP` and the tilt motor
//! through the camera-class tilt controls.

use std::fs::File;
use std::os::unix::io::AsRawFd;
use tracing::{debug, warn};

use crate::depth::{TILT_MAX_DEGREES, TILT_MIN_DEGREES};

const V4L2_CTRL_CLASS_CAMERA: u32 = 0x009a0000;
const V4L2_CID_CAMERA_CLASS_BASE: u32 = V4L2_CTRL_CLASS_CAMERA | 0x900;

/// Absolute tilt in degrees
pub const V4L2_CID_TILT_ABSOLUTE: u32 = V4L2_CID_CAMERA_CLASS_BASE + 9;

/// Driver name reported by the kernel Kinect driver
pub const KINECT_DRIVER_NAME: &str = "kinect";

// (dir << 30) | (size << 16) | ('V' << 8) | nr
const VIDIOC_QUERYCAP: libc::c_ulong = 0x80685600;
const VIDIOC_G_CTRL: libc::c_ulong = 0xC008561B;
const VIDIOC_S_CTRL: libc::c_ulong = 0xC008561C;

#[repr(C)]
struct V4l2Capability {
    driver: [u8; 16],
    card: [u8; 32],
    bus_info: [u8; 32],
    version: u32,
    capabilities: u32,
    device_caps: u32,
    reserved: [u32; 3],
}

#[repr(C)]
struct V4l2Control {
    id: u32,
    value: i32,
}

/// Identity of a V4L2 device node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct V4l2DeviceInfo {
    pub driver: String,
    pub card: String,
    pub bus_info: String,
}

impl V4l2DeviceInfo {
    /// Node belongs to the kernel Kinect driver
    pub fn is_kinect(&self) -> bool {
        self.driver == KINECT_DRIVER_NAME
    }
}

fn c_string(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&c| c == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).to_string()
}

/// Query driver, card and bus info
pub fn query_device_info(device_path: &str) -> Option<V4l2DeviceInfo> {
    let file = File::open(device_path).ok()?;
    let fd = file.as_raw_fd();

    let mut caps = V4l2Capability {
        driver: [0; 16],
        card: [0; 32],
        bus_info: [0; 32],
        version: 0,
        capabilities: 0,
        device_caps: 0,
        reserved: [0; 3],
    };

    let result = unsafe { libc::ioctl(fd, VIDIOC_QUERYCAP as _, &mut caps as *mut V4l2Capability) };
    if result < 0 {
        debug!(device_path, "VIDIOC_QUERYCAP failed");
        return None;
    }

    Some(V4l2DeviceInfo {
        driver: c_string(&caps.driver),
        card: c_string(&caps.card),
        bus_info: c_string(&caps.bus_info),
    })
}

/// Current value of a control
pub fn get_control(device_path: &str, control_id: u32) -> Option<i32> {
    let file = File::open(device_path).ok()?;
    let fd = file.as_raw_fd();

    let mut ctrl = V4l2Control {
        id: control_id,
        value: 0,
    };

    let result = unsafe { libc::ioctl(fd, VIDIOC_G_CTRL as _, &mut ctrl as *mut V4l2Control) };
    if result < 0 {
        debug!(device_path, control_id, "Failed to get V4L2 control");
        return None;
    }

    Some(ctrl.value)
}

/// Set a control
pub fn set_control(device_path: &str, control_id: u32, value: i32) -> Result<(), String> {
    let file = File::open(device_path).map_err(|e| format!("Failed to open device: {}", e))?;
    let fd = file.as_raw_fd();

    let mut ctrl = V4l2Control {
        id: control_id,
        value,
    };

    let result = unsafe { libc::ioctl(fd, VIDIOC_S_CTRL as _, &mut ctrl as *mut V4l2Control) };
    if result < 0 {
        let errno = std::io::Error::last_os_error();
        warn!(device_path, control_id, value, ?errno, "Failed to set V4L2 control");
        return Err(format!("Failed to set control: {}", errno));
    }

    if ctrl.value != value {
        debug!(
            device_path,
            control_id,
            requested = value,
            actual = ctrl.value,
            "Driver adjusted control value"
        );
    }

    Ok(())
}

/// Clamp a tilt request to the motor's range
pub fn clamp_tilt(degrees: i8) -> i8 {
    degrees.clamp(TILT_MIN_DEGREES, TILT_MAX_DEGREES)
}

/// Tilt the sensor through the kernel driver
pub fn set_tilt(device_path: &str, degrees: i8) -> Result<(), String> {
    let degrees = clamp_tilt(degrees);
    debug!(device_path, degrees, "Setting tilt via V4L2");
    set_control(device_path, V4L2_CID_TILT_ABSOLUTE, degrees as i32)
}

/// Current tilt reported by the kernel driver
pub fn get_tilt(device_path: &str) -> Option<i8> {
    get_control(device_path, V4L2_CID_TILT_ABSOLUTE).map(|v| clamp_tilt(v.clamp(-128, 127) as i8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_ids() {
        assert_eq!(V4L2_CID_TILT_ABSOLUTE, 0x009a0909);
    }

    #[test]
    fn test_tilt_clamping() {
        assert_eq!(clamp_tilt(30), 27);
        assert_eq!(clamp_tilt(-30), -27);
        assert_eq!(clamp_tilt(-5), -5);
    }

    #[test]
    fn test_c_string_stops_at_nul() {
        let mut raw = [0u8; 16];
        raw[..6].copy_from_slice(b"kinect");
        assert_eq!(c_string(&raw), "kinect");
        assert_eq!(c_string(b"full"), "full");
    }

    #[test]
    fn test_missing_device() {
        assert!(query_device_info("/nonexistent/video0").is_none());
        assert!(set_tilt("/nonexistent/video0", 0).is_err());
    }
}
