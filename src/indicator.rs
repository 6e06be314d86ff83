// SPDX-License-Identifier: GPL-3.0-only

//! Degradation indicator
//!
//! Mirrors the degradation state on an LED: steady on while frames are
//! healthy, blinking while degraded, off at exit.
//!
//! - [`DeviceLed`]: the sensor's own LED, driven by the frame source on the
//!   capture thread (freedepth Kinect)
//! - [`SysfsLed`]: an LED under `/sys/class/leds/<name>`, blinking through
//!   the `timer` trigger
//!
//! Without an LED the transitions are only logged.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::constants::timing::INDICATOR_BLINK_MS;
use crate::depth::DegradationEvent;

/// What the indicator is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndicatorState {
    /// Dark
    #[default]
    Off,
    /// Frames are healthy
    Normal,
    /// Invalid fraction above threshold
    Alert,
}

/// An LED under `/sys/class/leds`
#[derive(Debug, Clone)]
pub struct SysfsLed {
    path: PathBuf,
    max_brightness: u32,
}

impl SysfsLed {
    /// Open an LED directory, checking that it can be driven
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let max_path = path.join("max_brightness");

        let max_brightness = std::fs::read_to_string(&max_path)?
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|&v| v > 0)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("invalid max_brightness in {}", max_path.display()),
                )
            })?;

        std::fs::OpenOptions::new()
            .write(true)
            .open(path.join("brightness"))?;

        info!(path = %path.display(), max_brightness, "Using sysfs LED indicator");
        Ok(Self {
            path,
            max_brightness,
        })
    }

    /// Scan `/sys/class/leds` for a Kinect LED
    pub fn discover() -> Option<Self> {
        let entries = std::fs::read_dir("/sys/class/leds").ok()?;
        let mut candidates: Vec<PathBuf> = entries
            .flatten()
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|n| n.to_ascii_lowercase().contains("kinect"))
            })
            .map(|e| e.path())
            .collect();
        candidates.sort();

        candidates.into_iter().find_map(|path| match Self::open(&path) {
            Ok(led) => Some(led),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Kinect LED found but not usable");
                None
            }
        })
    }

    /// LED directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, attribute: &str, value: &str) -> io::Result<()> {
        std::fs::write(self.path.join(attribute), value)
    }

    fn show(&self, state: IndicatorState) -> io::Result<()> {
        match state {
            IndicatorState::Off => {
                self.write("trigger", "none")?;
                self.write("brightness", "0")
            }
            IndicatorState::Normal => {
                self.write("trigger", "none")?;
                self.write("brightness", &self.max_brightness.to_string())
            }
            IndicatorState::Alert => {
                self.write("trigger", "timer")?;
                // The timer trigger creates these attributes; older kernels may not
                let period = INDICATOR_BLINK_MS.to_string();
                for attribute in ["delay_on", "delay_off"] {
                    if let Err(e) = self.write(attribute, &period) {
                        debug!(attribute, error = %e, "Cannot set blink period");
                    }
                }
                Ok(())
            }
        }
    }
}

/// Handle to an LED owned by the frame source
///
/// The source lives on the capture thread, so states are queued here and
/// applied by the capture loop between frames.
#[derive(Debug, Clone)]
pub struct DeviceLed {
    requests: Sender<IndicatorState>,
}

impl DeviceLed {
    /// Handle plus the receiving end drained by the capture thread
    pub fn channel() -> (Self, Receiver<IndicatorState>) {
        let (requests, rx) = mpsc::channel();
        (Self { requests }, rx)
    }

    fn show(&self, state: IndicatorState) -> Result<(), mpsc::SendError<IndicatorState>> {
        self.requests.send(state)
    }
}

#[derive(Debug, Clone)]
enum Backend {
    Device(DeviceLed),
    Sysfs(SysfsLed),
    Log,
}

/// Applies degradation transitions to an external indicator
#[derive(Debug, Clone)]
pub struct Indicator {
    backend: Backend,
    state: IndicatorState,
}

impl Indicator {
    /// Drive the frame source's own LED
    pub fn device(led: DeviceLed) -> Self {
        Self {
            backend: Backend::Device(led),
            state: IndicatorState::Off,
        }
    }

    /// Drive a sysfs LED
    pub fn sysfs(led: SysfsLed) -> Self {
        Self {
            backend: Backend::Sysfs(led),
            state: IndicatorState::Off,
        }
    }

    /// Log transitions only
    pub fn log() -> Self {
        Self {
            backend: Backend::Log,
            state: IndicatorState::Off,
        }
    }

    /// Current state
    pub fn state(&self) -> IndicatorState {
        self.state
    }

    /// Whether a physical LED is attached
    pub fn has_led(&self) -> bool {
        matches!(self.backend, Backend::Device(_) | Backend::Sysfs(_))
    }

    /// Switch state; LED write failures are logged, never fatal
    pub fn set(&mut self, state: IndicatorState) {
        if state == self.state {
            return;
        }
        match &self.backend {
            Backend::Device(led) => {
                if led.show(state).is_err() {
                    debug!(?state, "Capture thread gone, device LED not updated");
                }
            }
            Backend::Sysfs(led) => {
                if let Err(e) = led.show(state) {
                    warn!(path = %led.path.display(), ?state, error = %e, "Failed to drive LED");
                }
            }
            Backend::Log => debug!(?state, "Indicator state"),
        }
        self.state = state;
    }

    /// Show a degradation transition
    pub fn apply(&mut self, event: DegradationEvent) {
        match event {
            DegradationEvent::EnteredDegraded => {
                warn!("Depth frames degraded: invalid pixels above threshold");
                self.set(IndicatorState::Alert);
            }
            DegradationEvent::ExitedDegraded => {
                info!("Depth frames recovered");
                self.set(IndicatorState::Normal);
            }
        }
    }

    /// Switch off at shutdown
    pub fn off(&mut self) {
        self.set(IndicatorState::Off);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_led(max: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("max_brightness"), max).unwrap();
        std::fs::write(dir.path().join("brightness"), "0").unwrap();
        std::fs::write(dir.path().join("trigger"), "none").unwrap();
        dir
    }

    fn read(dir: &tempfile::TempDir, attribute: &str) -> String {
        std::fs::read_to_string(dir.path().join(attribute)).unwrap()
    }

    #[test]
    fn test_sysfs_transitions() {
        let dir = fake_led("255\n");
        let mut indicator = Indicator::sysfs(SysfsLed::open(dir.path()).unwrap());
        assert!(indicator.has_led());

        indicator.set(IndicatorState::Normal);
        assert_eq!(read(&dir, "brightness"), "255");
        assert_eq!(read(&dir, "trigger"), "none");

        indicator.apply(DegradationEvent::EnteredDegraded);
        assert_eq!(indicator.state(), IndicatorState::Alert);
        assert_eq!(read(&dir, "trigger"), "timer");
        assert_eq!(read(&dir, "delay_on"), INDICATOR_BLINK_MS.to_string());

        indicator.apply(DegradationEvent::ExitedDegraded);
        assert_eq!(read(&dir, "trigger"), "none");
        assert_eq!(read(&dir, "brightness"), "255");

        indicator.off();
        assert_eq!(read(&dir, "brightness"), "0");
        assert_eq!(indicator.state(), IndicatorState::Off);
    }

    #[test]
    fn test_rejects_zero_max_brightness() {
        let dir = fake_led("0");
        assert!(SysfsLed::open(dir.path()).is_err());
    }

    #[test]
    fn test_missing_led_directory() {
        assert!(SysfsLed::open("/nonexistent/leds/kinect").is_err());
    }

    #[test]
    fn test_device_indicator_queues_transitions() {
        let (led, requests) = DeviceLed::channel();
        let mut indicator = Indicator::device(led);
        assert!(indicator.has_led());

        indicator.set(IndicatorState::Normal);
        indicator.set(IndicatorState::Normal);
        indicator.apply(DegradationEvent::EnteredDegraded);
        indicator.apply(DegradationEvent::ExitedDegraded);
        indicator.off();

        // Repeated states are not queued again
        let queued: Vec<_> = requests.try_iter().collect();
        assert_eq!(
            queued,
            vec![
                IndicatorState::Normal,
                IndicatorState::Alert,
                IndicatorState::Normal,
                IndicatorState::Off,
            ]
        );
    }

    #[test]
    fn test_device_indicator_survives_closed_channel() {
        let (led, requests) = DeviceLed::channel();
        drop(requests);
        let mut indicator = Indicator::device(led);
        indicator.set(IndicatorState::Alert);
        assert_eq!(indicator.state(), IndicatorState::Alert);
    }

    #[test]
    fn test_log_indicator_tracks_state() {
        let mut indicator = Indicator::log();
        assert!(!indicator.has_led());
        indicator.apply(DegradationEvent::EnteredDegraded);
        assert_eq!(indicator.state(), IndicatorState::Alert);
        indicator.off();
        assert_eq!(indicator.state(), IndicatorState::Off);
    }
}
