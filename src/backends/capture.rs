// SPDX-License-Identifier: GPL-3.0-only

//! Capture thread lifecycle
//!
//! A [`FrameSource`] blocks while waiting for the device, so it runs on its
//! own thread and hands frames to the monitor over a bounded channel. Frames
//! arrive in the order the source produced them; none are dropped.
//!
//! Indicator states for the source's own LED travel the other way and are
//! applied between frames, plus once more when the thread exits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use super::{FrameSource, SourceError, SourceResult};
use crate::constants::timing::FRAME_CHANNEL_CAPACITY;
use crate::depth::RawFrame;
use crate::indicator::{DeviceLed, IndicatorState};

/// Action returned by the loop body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Run another iteration
    Continue,
    /// Leave the loop
    Stop,
}

/// Message from the capture thread
#[derive(Debug)]
pub enum CaptureEvent {
    /// Next frame, in source order
    Frame(RawFrame),
    /// Source failed to open or to deliver a frame; no more events follow
    Failed(SourceError),
    /// Source is exhausted; no more events follow
    Finished,
}

/// Loop running on a dedicated thread
///
/// The body is called until it returns [`LoopAction::Stop`] or a stop is
/// requested. Dropping the controller stops and joins the thread.
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureLoopController {
    /// Start a loop whose state is created on the loop thread
    ///
    /// `init_fn` runs once on the new thread; if it fails the thread exits
    /// without calling `loop_fn`. The state never crosses threads.
    pub fn start_with_init<S, E, I, F>(name: &str, init_fn: I, mut loop_fn: F) -> Self
    where
        E: std::fmt::Display,
        I: FnOnce() -> Result<S, E> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name, "Starting capture loop");

        let thread_handle = thread::spawn(move || {
            let mut state = match init_fn() {
                Ok(state) => state,
                Err(e) => {
                    warn!(name = %thread_name, error = %e, "Capture loop initialization failed");
                    return;
                }
            };
            debug!(name = %thread_name, "Capture loop initialized");

            while !thread_stop.load(Ordering::SeqCst) {
                if loop_fn(&mut state) == LoopAction::Stop {
                    debug!(name = %thread_name, "Loop requested stop");
                    break;
                }
            }

            info!(name = %thread_name, "Capture loop thread exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Whether the thread is still alive
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Ask the loop to stop after its current iteration
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting capture loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Request a stop and wait for the thread
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Capture loop thread finished");
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}

/// Running capture: the event receiver plus the thread that feeds it
///
/// Field order matters: the receiver is dropped before the controller joins,
/// which unblocks a capture thread waiting on a full channel.
pub struct CaptureSession {
    events: Receiver<CaptureEvent>,
    led: DeviceLed,
    controller: CaptureLoopController,
}

impl CaptureSession {
    /// Events in arrival order
    pub fn events(&self) -> &Receiver<CaptureEvent> {
        &self.events
    }

    /// Handle to the source's own LED
    pub fn led(&self) -> DeviceLed {
        self.led.clone()
    }

    /// Whether the capture thread is still alive
    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    /// Stop the capture thread and wait for it
    pub fn stop(self) {
        let Self {
            events,
            mut controller,
            ..
        } = self;
        controller.request_stop();
        drop(events);
        controller.join();
    }
}

/// Open a source on a new thread and stream its frames
///
/// `open` runs on the capture thread. Open failures and read failures are
/// delivered as [`CaptureEvent::Failed`]; exhaustion as
/// [`CaptureEvent::Finished`].
pub fn spawn<O>(name: &str, open: O) -> CaptureSession
where
    O: FnOnce() -> SourceResult<Box<dyn FrameSource>> + Send + 'static,
{
    let (tx, events) = mpsc::sync_channel(FRAME_CHANNEL_CAPACITY);
    let init_tx = tx.clone();
    let (led, led_requests) = DeviceLed::channel();

    let controller = CaptureLoopController::start_with_init(
        name,
        move || {
            open()
                .map(|source| Capture {
                    source,
                    led_requests,
                })
                .inspect_err(|e| {
                    let _ = init_tx.send(CaptureEvent::Failed(e.clone()));
                })
        },
        move |capture: &mut Capture| capture.pump(&tx),
    );

    CaptureSession {
        events,
        led,
        controller,
    }
}

/// State owned by the capture thread
struct Capture {
    source: Box<dyn FrameSource>,
    led_requests: Receiver<IndicatorState>,
}

impl Capture {
    /// Apply the latest queued indicator state, if any
    fn apply_led_requests(&mut self) {
        let Some(state) = self.led_requests.try_iter().last() else {
            return;
        };
        if let Err(e) = self.source.set_indicator(state) {
            debug!(source = %self.source.describe(), ?state, error = %e, "LED not updated");
        }
    }

    fn pump(&mut self, tx: &SyncSender<CaptureEvent>) -> LoopAction {
        self.apply_led_requests();
        pump(self.source.as_mut(), tx)
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        // Catches the final state (usually Off) sent while stopping
        self.apply_led_requests();
    }
}

fn pump(source: &mut dyn FrameSource, tx: &SyncSender<CaptureEvent>) -> LoopAction {
    let event = match source.next_frame() {
        Ok(Some(frame)) => CaptureEvent::Frame(frame),
        Ok(None) => {
            debug!(source = %source.describe(), "Source exhausted");
            CaptureEvent::Finished
        }
        Err(e) => {
            warn!(source = %source.describe(), error = %e, "Frame source failed");
            CaptureEvent::Failed(e)
        }
    };

    let last = !matches!(event, CaptureEvent::Frame(_));
    if tx.send(event).is_err() {
        debug!("Frame receiver dropped");
        return LoopAction::Stop;
    }
    if last { LoopAction::Stop } else { LoopAction::Continue }
}
