// SPDX-License-Identifier: GPL-3.0-only

//! Report formatting for frame statistics
//!
//! Turns a [`FrameStatistics`] record into what should be shown for the
//! selected [`DisplayMode`]. Rendering to a terminal is left to the sinks;
//! this module only decides the text and the histogram bar lengths.

use std::fmt;

use crate::constants::DisplayMode;
use crate::depth::{
    COARSE_HISTOGRAM_BUCKETS, CalibrationTable, FrameStatistics, HISTOGRAM_BAR_WIDTH,
};
use crate::errors::StatsError;

/// Formatted output for one frame
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// Multi-line report with histogram
    Verbose(VerboseReport),
    /// Single numeric line
    Value(String),
}

/// Multi-line human readable report
#[derive(Debug, Clone, PartialEq)]
pub struct VerboseReport {
    /// Summary lines (extremes, invalid percentage, mean and median)
    pub summary: Vec<String>,
    /// Coarse histogram rows followed by the out-of-range row
    pub rows: Vec<HistogramRow>,
}

/// One histogram bar
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramRow {
    /// Right-aligned label (calibrated distance of the bucket, or "Out")
    pub label: String,
    /// Bar length in characters
    pub bar_len: usize,
    /// Bucket contains the median code
    pub is_median: bool,
}

impl HistogramRow {
    /// Character used to draw the bar
    pub fn bar_char(&self) -> char {
        if self.is_median { '*' } else { '-' }
    }

    /// Label and bar as one line of text
    pub fn to_line(&self) -> String {
        let bar: String = std::iter::repeat_n(self.bar_char(), self.bar_len).collect();
        format!("{}: {}", self.label, bar)
    }
}

/// Bar length for `count` pixels out of `total_pixels`
pub fn bar_length(count: usize, total_pixels: usize) -> usize {
    if total_pixels == 0 {
        return 0;
    }
    count * HISTOGRAM_BAR_WIDTH / total_pixels
}

fn format_distance(distance: f32) -> String {
    format!("{:>9.4}", distance)
}

fn out_of_range_row(invalid_count: usize, total_pixels: usize) -> HistogramRow {
    HistogramRow {
        label: format!("{:>9}", "Out"),
        bar_len: bar_length(invalid_count, total_pixels),
        is_median: false,
    }
}

/// Format a frame's statistics for the selected mode
pub fn format_statistics(
    stats: &FrameStatistics,
    table: &CalibrationTable,
    mode: DisplayMode,
) -> Report {
    match mode {
        DisplayMode::Verbose => Report::Verbose(verbose_report(stats, table)),
        DisplayMode::Median => Report::Value(stats.median_code.to_string()),
        DisplayMode::MedianScaled => Report::Value(format!(
            "{:.6}",
            table.distance(stats.median_code as usize)
        )),
        DisplayMode::Mean => Report::Value(stats.mean_code().to_string()),
        DisplayMode::MeanScaled => {
            Report::Value(format!("{:.6}", table.distance(stats.mean_code() as usize)))
        }
    }
}

fn verbose_report(stats: &FrameStatistics, table: &CalibrationTable) -> VerboseReport {
    let (min_x, min_y) = stats.min_position();
    let (max_x, max_y) = stats.max_position();
    let domain_size = stats.domain_size();

    let summary = vec![
        format!(
            "Time: {}, min: {} ({}, {}), max: {} ({}, {})",
            stats.timestamp, stats.min_code, min_x, min_y, stats.max_code, max_x, max_y
        ),
        format!(
            "Out of range: {}% mean: {:.6} ({:.4}), median: {} ({:.4})",
            stats.invalid_percent(),
            stats.mean,
            table.distance(stats.mean_code() as usize),
            stats.median_code,
            table.distance(stats.median_code as usize),
        ),
    ];

    let median_bucket = stats.median_bucket();
    let mut rows: Vec<HistogramRow> = stats
        .coarse_histogram
        .iter()
        .enumerate()
        .map(|(bucket, &count)| HistogramRow {
            label: format_distance(
                table.distance(bucket * domain_size / COARSE_HISTOGRAM_BUCKETS),
            ),
            bar_len: bar_length(count as usize, stats.total_pixels),
            is_median: bucket == median_bucket,
        })
        .collect();
    rows.push(out_of_range_row(stats.invalid_count, stats.total_pixels));

    VerboseReport { summary, rows }
}

/// Format a frame whose statistics could not be computed
///
/// Only verbose mode renders anything: a degenerate-frame message with the
/// out-of-range bar. Numeric modes skip the frame rather than print a
/// made-up value, and invalid frames are never rendered.
pub fn format_degenerate(error: &StatsError, mode: DisplayMode) -> Option<Report> {
    let StatsError::NoValidSamples { total_pixels, .. } = error else {
        return None;
    };
    if mode.is_numeric() {
        return None;
    }

    Some(Report::Verbose(VerboseReport {
        summary: vec![
            format!("No valid samples: all {} pixels out of range", total_pixels),
            "Out of range: 100% mean: - median: -".to_string(),
        ],
        rows: vec![out_of_range_row(*total_pixels, *total_pixels)],
    }))
}

impl fmt::Display for VerboseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.summary {
            writeln!(f, "{}", line)?;
        }
        for row in &self.rows {
            writeln!(f, "{}", row.to_line())?;
        }
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Verbose(report) => write!(f, "{}", report),
            Report::Value(value) => writeln!(f, "{}", value),
        }
    }
}
