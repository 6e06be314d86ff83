// SPDX-License-Identifier: GPL-3.0-only

//! Frame-by-frame monitoring loop
//!
//! [`Monitor`] owns everything that lives for a run: the shared calibration
//! table, the engine parameters, the degradation tracker, the indicator and
//! the cancellation flag. Each frame goes through the engine once, in
//! arrival order; the outcome feeds the tracker and the active
//! [`ReportSink`].

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};

use tracing::{debug, info, warn};

use crate::backends::capture::CaptureEvent;
use crate::constants::DisplayMode;
use crate::constants::timing::FRAME_POLL_INTERVAL;
use crate::depth::{
    CalibrationTable, DegradationEvent, DegradationTracker, RawFrame, StatisticsParams,
    compute_statistics,
};
use crate::errors::{AppResult, StatsError};
use crate::indicator::{Indicator, IndicatorState};
use crate::report::{self, Report};

/// Counters for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames delivered by the source
    pub frames_received: u64,
    /// Frames that produced a report
    pub frames_reported: u64,
    /// Frames without a single valid sample
    pub frames_degenerate: u64,
    /// Frames the engine rejected as malformed
    pub frames_rejected: u64,
    /// Times the stream entered the degraded state
    pub degraded_episodes: u64,
}

/// What happened to one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    /// Text to show, if any
    pub report: Option<Report>,
    /// Degradation transition caused by this frame
    pub event: Option<DegradationEvent>,
    /// Engine error, if the frame had no statistics
    pub error: Option<StatsError>,
}

/// Context shown next to each report
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorStatus {
    /// Source description
    pub source: String,
    /// Active output mode
    pub mode: DisplayMode,
    /// Degradation threshold in percent
    pub threshold_percent: u32,
    /// Current degradation state
    pub degraded: bool,
    /// Counters so far
    pub summary: RunSummary,
}

/// Destination for reports
pub trait ReportSink {
    /// Present one report
    fn show(&mut self, report: &Report, status: &MonitorStatus) -> AppResult<()>;

    /// Non-blocking check whether the user asked to quit
    fn poll_quit(&mut self) -> AppResult<bool> {
        Ok(false)
    }
}

/// Writes reports as plain text
///
/// Numeric modes produce exactly one line per reported frame, so the output
/// can be piped; verbose reports are separated by a blank line.
pub struct PlainSink<W: Write> {
    writer: W,
}

impl<W: Write> PlainSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for PlainSink<W> {
    fn show(&mut self, report: &Report, _status: &MonitorStatus) -> AppResult<()> {
        write!(self.writer, "{}", report)?;
        if matches!(report, Report::Verbose(_)) {
            writeln!(self.writer)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Run-loop state
pub struct Monitor {
    table: Arc<CalibrationTable>,
    params: StatisticsParams,
    mode: DisplayMode,
    tracker: DegradationTracker,
    indicator: Indicator,
    cancel: Arc<AtomicBool>,
    frame_limit: Option<u64>,
    summary: RunSummary,
}

impl Monitor {
    pub fn new(
        table: Arc<CalibrationTable>,
        params: StatisticsParams,
        mode: DisplayMode,
        indicator: Indicator,
    ) -> Self {
        Self {
            table,
            params,
            mode,
            tracker: DegradationTracker::new(),
            indicator,
            cancel: Arc::new(AtomicBool::new(false)),
            frame_limit: None,
            summary: RunSummary::default(),
        }
    }

    /// Stop after `limit` frames have been received
    pub fn with_frame_limit(mut self, limit: Option<u64>) -> Self {
        self.frame_limit = limit;
        self
    }

    /// Flag that ends the run when set (signal handler, quit key)
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Counters so far
    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Current degradation state
    pub fn is_degraded(&self) -> bool {
        self.tracker.is_degraded()
    }

    /// Indicator state
    pub fn indicator_state(&self) -> IndicatorState {
        self.indicator.state()
    }

    /// Run one frame through the engine, tracker and formatter
    pub fn process(&mut self, frame: &RawFrame) -> FrameOutcome {
        self.summary.frames_received += 1;

        let (report, over_threshold, error) = match compute_statistics(frame, &self.params) {
            Ok(stats) => {
                debug!(
                    sequence = stats.sequence,
                    median = stats.median_code,
                    mean = stats.mean,
                    invalid = stats.invalid_count,
                    "Frame statistics"
                );
                let report = report::format_statistics(&stats, &self.table, self.mode);
                (Some(report), Some(stats.over_threshold), None)
            }
            Err(e) => {
                match &e {
                    StatsError::NoValidSamples { .. } => {
                        debug!(sequence = frame.sequence, "Frame has no valid samples");
                        self.summary.frames_degenerate += 1;
                    }
                    StatsError::InvalidFrame(defect) => {
                        warn!(sequence = frame.sequence, %defect, "Rejected frame");
                        self.summary.frames_rejected += 1;
                    }
                }
                (report::format_degenerate(&e, self.mode), e.over_threshold(), Some(e))
            }
        };

        let event = over_threshold.and_then(|flag| self.tracker.update(flag));
        if let Some(event) = event {
            if event == DegradationEvent::EnteredDegraded {
                self.summary.degraded_episodes += 1;
            }
            self.indicator.apply(event);
        }
        if report.is_some() {
            self.summary.frames_reported += 1;
        }

        FrameOutcome {
            report,
            event,
            error,
        }
    }

    fn status(&self, source: &str) -> MonitorStatus {
        MonitorStatus {
            source: source.to_string(),
            mode: self.mode,
            threshold_percent: self.params.degradation_threshold_percent,
            degraded: self.tracker.is_degraded(),
            summary: self.summary,
        }
    }

    fn limit_reached(&self) -> bool {
        self.frame_limit
            .is_some_and(|limit| self.summary.frames_received >= limit)
    }

    /// Consume capture events until the source ends, the frame limit is
    /// reached or the run is cancelled
    ///
    /// A source failure ends the run with an error. The indicator shows the
    /// normal state while running and is switched off on every exit path.
    pub fn run(
        &mut self,
        source: &str,
        events: &Receiver<CaptureEvent>,
        sink: &mut dyn ReportSink,
    ) -> AppResult<RunSummary> {
        info!(source, mode = ?self.mode, "Monitoring depth frames");
        self.indicator.set(IndicatorState::Normal);

        let result = self.event_loop(source, events, sink);

        self.indicator.off();
        info!(
            frames = self.summary.frames_received,
            reported = self.summary.frames_reported,
            degenerate = self.summary.frames_degenerate,
            rejected = self.summary.frames_rejected,
            "Monitoring stopped"
        );
        result.map(|()| self.summary)
    }

    fn event_loop(
        &mut self,
        source: &str,
        events: &Receiver<CaptureEvent>,
        sink: &mut dyn ReportSink,
    ) -> AppResult<()> {
        loop {
            if self.cancel.load(Ordering::SeqCst) {
                debug!("Run cancelled");
                return Ok(());
            }
            if self.limit_reached() {
                debug!("Frame limit reached");
                return Ok(());
            }
            if sink.poll_quit()? {
                self.cancel.store(true, Ordering::SeqCst);
                continue;
            }

            match events.recv_timeout(FRAME_POLL_INTERVAL) {
                Ok(CaptureEvent::Frame(frame)) => {
                    if let Some(report) = self.process(&frame).report {
                        sink.show(&report, &self.status(source))?;
                    }
                }
                Ok(CaptureEvent::Finished) => return Ok(()),
                Ok(CaptureEvent::Failed(e)) => return Err(e.into()),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("Capture thread ended");
                    return Ok(());
                }
            }
        }
    }
}
