// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! - Live monitoring of a depth device
//! - Replaying a recorded frame dump
//! - Recording raw frames
//! - Listing depth devices

use std::io::{IsTerminal, stdout};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use depthstats::backends::capture::{self, CaptureEvent};
use depthstats::backends::replay::{FrameRecorder, ReplaySource};
use depthstats::backends::{self, DeviceSelector, FrameSource, SourceKind, SourceResult};
use depthstats::constants::timing::FRAME_POLL_INTERVAL;
use depthstats::indicator::{Indicator, SysfsLed};
use depthstats::monitor::{Monitor, PlainSink, RunSummary};
use depthstats::terminal::TerminalSink;
use depthstats::{AppError, AppResult, Config, DisplayMode};
use tracing::{info, warn};

use crate::{DeviceArgs, OutputArgs};

/// Live statistics from a depth device
pub fn monitor(mut config: Config, output: &OutputArgs, device: &DeviceArgs) -> AppResult<()> {
    apply_device_args(&mut config, device);
    let selector = device_selector(&config);
    let label = match &selector.device {
        Some(device) => format!("{} {}", selector.kind, device),
        None => selector.kind.to_string(),
    };

    // freedepth owns the sensor LED; the kernel driver may expose it in sysfs
    let fallback = if selector.resolved_kind() == SourceKind::Kinect {
        FallbackIndicator::Device
    } else if output.led.is_none() && config.led.is_none() {
        SysfsLed::discover().map_or(FallbackIndicator::Log, FallbackIndicator::Sysfs)
    } else {
        FallbackIndicator::Log
    };

    run(config, output, &label, fallback, move || {
        backends::open_device(&selector)
    })
}

/// Statistics over a recorded dump
pub fn replay(
    config: Config,
    file: &Path,
    width: u32,
    height: u32,
    output: &OutputArgs,
) -> AppResult<()> {
    let path = file.to_path_buf();
    let label = file.display().to_string();
    run(config, output, &label, FallbackIndicator::Log, move || {
        Ok(Box::new(ReplaySource::open(&path, width, height)?) as Box<dyn FrameSource>)
    })
}

/// Indicator used when no LED is configured
enum FallbackIndicator {
    /// The source's own LED, driven from the capture thread
    Device,
    /// A discovered sysfs LED
    Sysfs(SysfsLed),
    /// Log transitions only
    Log,
}

fn run<O>(
    mut config: Config,
    output: &OutputArgs,
    label: &str,
    fallback: FallbackIndicator,
    open: O,
) -> AppResult<()>
where
    O: FnOnce() -> SourceResult<Box<dyn FrameSource>> + Send + 'static,
{
    apply_output_args(&mut config, output);
    config.validate()?;

    let configured = match &config.led {
        Some(path) => Some(
            SysfsLed::open(path)
                .map_err(|e| AppError::Config(format!("LED {}: {}", path.display(), e)))?,
        ),
        None => None,
    };

    let table = Arc::new(config.calibration_table());
    let session = capture::spawn(label, open);

    let indicator = match (configured, fallback) {
        (Some(led), _) | (None, FallbackIndicator::Sysfs(led)) => Indicator::sysfs(led),
        (None, FallbackIndicator::Device) => Indicator::device(session.led()),
        (None, FallbackIndicator::Log) => Indicator::log(),
    };

    let mut monitor = Monitor::new(table, config.statistics, config.mode, indicator)
        .with_frame_limit(output.frames);
    install_interrupt_handler(monitor.cancel_flag())?;

    let use_terminal =
        config.mode == DisplayMode::Verbose && !output.plain && stdout().is_terminal();

    let result = if use_terminal {
        let mut sink = TerminalSink::enter()?;
        let result = monitor.run(label, session.events(), &mut sink);
        sink.restore()?;
        result
    } else {
        let mut sink = PlainSink::new(stdout().lock());
        monitor.run(label, session.events(), &mut sink)
    };
    session.stop();

    let summary = result?;
    report_summary(&summary);
    Ok(())
}

/// Capture raw frames into a dump
pub fn record(mut config: Config, file: &Path, frames: u64, device: &DeviceArgs) -> AppResult<()> {
    apply_device_args(&mut config, device);
    let selector = device_selector(&config);
    let mut recorder = FrameRecorder::create(file)?;

    let cancel = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(Arc::clone(&cancel))?;

    let session = capture::spawn("record", move || backends::open_device(&selector));
    let result = record_frames(&session, &mut recorder, frames, &cancel);
    session.stop();
    result?;

    let written = recorder.frames_written();
    recorder.finish()?;
    println!("Recorded {} frames to {}", written, file.display());
    Ok(())
}

fn record_frames(
    session: &capture::CaptureSession,
    recorder: &mut FrameRecorder,
    frames: u64,
    cancel: &AtomicBool,
) -> AppResult<()> {
    while (recorder.frames_written() as u64) < frames && !cancel.load(Ordering::SeqCst) {
        match session.events().recv_timeout(FRAME_POLL_INTERVAL) {
            Ok(CaptureEvent::Frame(frame)) => recorder.write_frame(&frame)?,
            Ok(CaptureEvent::Finished) => break,
            Ok(CaptureEvent::Failed(e)) => return Err(e.into()),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}

/// Print depth devices
pub fn list_devices() {
    let devices = backends::list_devices();

    if devices.is_empty() {
        println!("No depth devices found.");
        return;
    }

    println!("Depth devices:");
    println!();
    for device in &devices {
        println!("  [{}] {}", device.kind, device.name);
        println!("      Device: {}", device.path);
        println!("      Driver: {} ({})", device.driver, device.bus_info);
        println!();
    }
}

fn apply_output_args(config: &mut Config, output: &OutputArgs) {
    if let Some(mode) = output.mode {
        config.mode = mode;
    }
    if let Some(threshold) = output.threshold {
        config.statistics.degradation_threshold_percent = threshold;
    }
    if let Some(led) = &output.led {
        config.led = Some(led.clone());
    }
}

fn apply_device_args(config: &mut Config, device: &DeviceArgs) {
    if let Some(source) = device.source {
        config.source = source;
    }
    if let Some(path) = &device.device {
        config.device = Some(path.clone());
    }
    if device.no_tilt {
        config.tilt = None;
    } else if let Some(tilt) = device.tilt {
        config.tilt = Some(tilt);
    }
}

fn device_selector(config: &Config) -> DeviceSelector {
    DeviceSelector {
        kind: config.source,
        device: config.device.clone(),
        tilt: config.tilt,
    }
}

fn install_interrupt_handler(cancel: Arc<AtomicBool>) -> AppResult<()> {
    ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst))
        .map_err(|e| AppError::Other(format!("Failed to install Ctrl+C handler: {}", e)))
}

fn report_summary(summary: &RunSummary) {
    info!(
        frames = summary.frames_received,
        reported = summary.frames_reported,
        degraded_episodes = summary.degraded_episodes,
        "Run finished"
    );
    if summary.frames_rejected > 0 {
        warn!(rejected = summary.frames_rejected, "Some frames were malformed and skipped");
    }
}
