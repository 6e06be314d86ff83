// SPDX-License-Identifier: GPL-3.0-only

//! Per-frame depth statistics
//!
//! One linear pass over the raw codes builds the fine and coarse histograms,
//! the running sum and the extremes. The median then falls out of a
//! cumulative scan over the fine histogram, so nothing is sorted and the
//! frame is never copied.
//!
//! Sentinel samples only contribute to the invalid count. A frame made
//! entirely of sentinels yields [`StatsError::NoValidSamples`] instead of a
//! fabricated mean or median.

use serde::{Deserialize, Serialize};

use super::constants::{
    COARSE_HISTOGRAM_BUCKETS, DEFAULT_DEGRADATION_THRESHOLD_PERCENT, DEPTH_DOMAIN_SIZE,
    DEPTH_SENTINEL_CODE,
};
use super::frame::{RawFrame, pixel_position};
use crate::errors::{FrameDefect, StatsError, StatsResult};

/// Engine parameters, fixed for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsParams {
    /// Number of distinct raw codes
    pub domain_size: usize,
    /// Code meaning "no valid reading"
    pub sentinel_code: u16,
    /// Frames with a strictly larger invalid percentage are flagged
    pub degradation_threshold_percent: u32,
}

impl Default for StatisticsParams {
    fn default() -> Self {
        Self {
            domain_size: DEPTH_DOMAIN_SIZE,
            sentinel_code: DEPTH_SENTINEL_CODE,
            degradation_threshold_percent: DEFAULT_DEGRADATION_THRESHOLD_PERCENT,
        }
    }
}

impl StatisticsParams {
    /// Check the parameters are usable for histogram indexing
    pub fn validate(&self) -> Result<(), String> {
        if self.domain_size == 0 || self.domain_size > u16::MAX as usize + 1 {
            return Err(format!(
                "domain size must be within 1..=65536, got {}",
                self.domain_size
            ));
        }
        if self.sentinel_code as usize >= self.domain_size {
            return Err(format!(
                "sentinel code {} lies outside the code domain 0..{}",
                self.sentinel_code, self.domain_size
            ));
        }
        if self.degradation_threshold_percent > 100 {
            return Err(format!(
                "degradation threshold must be a percentage, got {}",
                self.degradation_threshold_percent
            ));
        }
        Ok(())
    }

    /// Coarse bucket holding a raw code: `floor(code * buckets / domain)`
    pub fn coarse_bucket(&self, code: usize) -> usize {
        code * COARSE_HISTOGRAM_BUCKETS / self.domain_size
    }

    /// First raw code of a coarse bucket
    pub fn coarse_bucket_start(&self, bucket: usize) -> usize {
        bucket * self.domain_size / COARSE_HISTOGRAM_BUCKETS
    }

    /// Integer-floor percentage comparison, bit-reproducible across platforms
    pub fn is_over_threshold(&self, invalid_count: usize, total_pixels: usize) -> bool {
        if total_pixels == 0 {
            return false;
        }
        (invalid_count as u64 * 100 / total_pixels as u64)
            > self.degradation_threshold_percent as u64
    }
}

/// Statistics for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStatistics {
    /// Smallest valid code
    pub min_code: u16,
    /// Pixel index of the first occurrence of `min_code`
    pub min_index: usize,
    /// Largest valid code
    pub max_code: u16,
    /// Pixel index of the first occurrence of `max_code`
    pub max_index: usize,
    /// Number of sentinel pixels
    pub invalid_count: usize,
    /// Number of pixels in the frame
    pub total_pixels: usize,
    /// Frame width, for converting indices to coordinates
    pub width: u32,
    /// Valid-sample counts per raw code (sentinel bucket stays zero)
    pub fine_histogram: Vec<u32>,
    /// Valid-sample counts per coarse bucket
    pub coarse_histogram: [u32; COARSE_HISTOGRAM_BUCKETS],
    /// Median raw code
    pub median_code: u16,
    /// Mean raw code over valid samples
    pub mean: f64,
    /// Invalid fraction exceeds the degradation threshold
    pub over_threshold: bool,
    /// Sequence number of the source frame
    pub sequence: u32,
    /// Device timestamp of the source frame
    pub timestamp: u32,
}

impl FrameStatistics {
    /// Number of non-sentinel pixels
    pub fn valid_count(&self) -> usize {
        self.total_pixels - self.invalid_count
    }

    /// Mean rounded to the nearest raw code, for display and table lookup
    pub fn mean_code(&self) -> u16 {
        self.mean.round() as u16
    }

    /// Invalid pixels as an integer-floor percentage of the frame
    pub fn invalid_percent(&self) -> u32 {
        (self.invalid_count as u64 * 100 / self.total_pixels as u64) as u32
    }

    /// (x, y) of the minimum
    pub fn min_position(&self) -> (u32, u32) {
        pixel_position(self.min_index, self.width)
    }

    /// (x, y) of the maximum
    pub fn max_position(&self) -> (u32, u32) {
        pixel_position(self.max_index, self.width)
    }

    /// Domain size the fine histogram was built for
    pub fn domain_size(&self) -> usize {
        self.fine_histogram.len()
    }

    /// Coarse bucket that holds the median code
    pub fn median_bucket(&self) -> usize {
        self.median_code as usize * COARSE_HISTOGRAM_BUCKETS / self.domain_size()
    }
}

/// Compute statistics for one frame
///
/// Runs in a single pass over the samples and never mutates the frame.
/// Rejects frames whose sample count does not match their dimensions and
/// frames holding codes outside the domain, as well as parameters whose
/// sentinel or threshold do not fit the domain; a frame without any valid sample
/// is reported as [`StatsError::NoValidSamples`].
pub fn compute_statistics(frame: &RawFrame, params: &StatisticsParams) -> StatsResult<FrameStatistics> {
    if params.validate().is_err() {
        return Err(FrameDefect::UnsupportedParams {
            domain_size: params.domain_size,
            sentinel_code: params.sentinel_code,
            degradation_threshold_percent: params.degradation_threshold_percent,
        }
        .into());
    }

    let total_pixels = frame.pixel_count();
    if total_pixels == 0 {
        return Err(FrameDefect::Empty.into());
    }
    if frame.samples.len() != total_pixels {
        return Err(FrameDefect::LengthMismatch {
            expected: total_pixels,
            actual: frame.samples.len(),
        }
        .into());
    }

    let domain_size = params.domain_size;
    let mut fine_histogram = vec![0u32; domain_size];
    let mut coarse_histogram = [0u32; COARSE_HISTOGRAM_BUCKETS];
    let mut invalid_count = 0usize;
    let mut sum = 0u64;
    let mut min: Option<(u16, usize)> = None;
    let mut max: Option<(u16, usize)> = None;

    for (index, &code) in frame.samples.iter().enumerate() {
        if code == params.sentinel_code {
            invalid_count += 1;
            continue;
        }

        let bucket = code as usize;
        if bucket >= domain_size {
            return Err(FrameDefect::SampleOutOfRange {
                index,
                code,
                domain_size,
            }
            .into());
        }

        fine_histogram[bucket] += 1;
        coarse_histogram[params.coarse_bucket(bucket)] += 1;
        sum += code as u64;

        // Strict comparisons keep the lowest pixel index on ties
        if min.is_none_or(|(m, _)| code < m) {
            min = Some((code, index));
        }
        if max.is_none_or(|(m, _)| code > m) {
            max = Some((code, index));
        }
    }

    let over_threshold = params.is_over_threshold(invalid_count, total_pixels);
    let valid_count = total_pixels - invalid_count;

    let (Some((min_code, min_index)), Some((max_code, max_index))) = (min, max) else {
        return Err(StatsError::NoValidSamples {
            total_pixels,
            over_threshold,
        });
    };

    let median_code = median_from_histogram(&fine_histogram, valid_count);
    let mean = sum as f64 / valid_count as f64;

    Ok(FrameStatistics {
        min_code,
        min_index,
        max_code,
        max_index,
        invalid_count,
        total_pixels,
        width: frame.width,
        fine_histogram,
        coarse_histogram,
        median_code,
        mean,
        over_threshold,
        sequence: frame.sequence,
        timestamp: frame.timestamp,
    })
}

/// Smallest code whose cumulative count reaches `ceil(valid_count / 2)`
///
/// `valid_count` must be non-zero and equal to the histogram total.
fn median_from_histogram(histogram: &[u32], valid_count: usize) -> u16 {
    let half = valid_count.div_ceil(2) as u64;
    let mut cumulative = 0u64;

    for (code, &count) in histogram.iter().enumerate() {
        cumulative += count as u64;
        if cumulative >= half {
            return code as u16;
        }
    }

    // Unreachable while the histogram total equals valid_count
    (histogram.len().saturating_sub(1)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params() -> StatisticsParams {
        StatisticsParams {
            domain_size: 4,
            sentinel_code: 3,
            degradation_threshold_percent: 35,
        }
    }

    #[test]
    fn test_reference_scenario() {
        let frame = RawFrame::new(10, 1, vec![0u16, 0, 1, 1, 1, 2, 3, 3, 0, 1]);
        let stats = compute_statistics(&frame, &small_params()).unwrap();

        assert_eq!(stats.invalid_count, 2);
        assert_eq!(stats.valid_count(), 8);
        assert_eq!(stats.fine_histogram, vec![3, 4, 1, 0]);
        assert_eq!(stats.mean, 0.75);
        assert_eq!(stats.median_code, 1);
        assert_eq!(stats.invalid_percent(), 20);
        assert!(!stats.over_threshold);
    }

    #[test]
    fn test_extremes_keep_first_occurrence() {
        let frame = RawFrame::new(3, 2, vec![5u16, 2, 9, 2, 9, 5]);
        let params = StatisticsParams::default();
        let stats = compute_statistics(&frame, &params).unwrap();

        assert_eq!((stats.min_code, stats.min_index), (2, 1));
        assert_eq!((stats.max_code, stats.max_index), (9, 2));
        assert_eq!(stats.min_position(), (1, 0));
        assert_eq!(stats.max_position(), (2, 0));
    }

    #[test]
    fn test_extremes_skip_sentinels() {
        let frame = RawFrame::new(4, 1, vec![2047u16, 700, 2047, 650]);
        let stats = compute_statistics(&frame, &StatisticsParams::default()).unwrap();

        assert_eq!(stats.max_code, 700);
        assert_eq!(stats.min_code, 650);
        assert_eq!(stats.min_position(), (3, 0));
    }

    #[test]
    fn test_all_sentinel_frame() {
        let frame = RawFrame::new(2, 2, vec![3u16; 4]);
        let err = compute_statistics(&frame, &small_params()).unwrap_err();
        assert_eq!(
            err,
            StatsError::NoValidSamples {
                total_pixels: 4,
                over_threshold: true,
            }
        );
    }

    #[test]
    fn test_rejects_out_of_range_sample() {
        let frame = RawFrame::new(3, 1, vec![0u16, 4, 1]);
        let err = compute_statistics(&frame, &small_params()).unwrap_err();
        assert_eq!(
            err,
            StatsError::InvalidFrame(FrameDefect::SampleOutOfRange {
                index: 1,
                code: 4,
                domain_size: 4,
            })
        );
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let frame = RawFrame::new(2, 2, vec![0u16; 3]);
        let err = compute_statistics(&frame, &small_params()).unwrap_err();
        assert_eq!(
            err,
            StatsError::InvalidFrame(FrameDefect::LengthMismatch {
                expected: 4,
                actual: 3,
            })
        );
    }

    #[test]
    fn test_rejects_empty_frame() {
        let frame = RawFrame::new(0, 480, Vec::<u16>::new());
        assert_eq!(
            compute_statistics(&frame, &small_params()).unwrap_err(),
            StatsError::InvalidFrame(FrameDefect::Empty)
        );
    }

    #[test]
    fn test_rejects_sentinel_outside_domain() {
        // The sentinel would otherwise mask the out-of-domain code 2047
        let params = StatisticsParams {
            sentinel_code: 2047,
            ..small_params()
        };
        let frame = RawFrame::new(3, 1, vec![0u16, 2047, 1]);
        assert_eq!(
            compute_statistics(&frame, &params).unwrap_err(),
            StatsError::InvalidFrame(FrameDefect::UnsupportedParams {
                domain_size: 4,
                sentinel_code: 2047,
                degradation_threshold_percent: 35,
            })
        );
    }

    #[test]
    fn test_threshold_is_strict_integer_percentage() {
        let params = StatisticsParams::default();
        assert!(!params.is_over_threshold(35, 100));
        assert!(params.is_over_threshold(36, 100));
        // 35.9% floors to 35
        assert!(!params.is_over_threshold(359, 1000));
    }

    #[test]
    fn test_coarse_buckets() {
        let params = StatisticsParams::default();
        assert_eq!(params.coarse_bucket(0), 0);
        assert_eq!(params.coarse_bucket(63), 0);
        assert_eq!(params.coarse_bucket(64), 1);
        assert_eq!(params.coarse_bucket(2046), 31);
        assert_eq!(params.coarse_bucket_start(31), 1984);
    }

    #[test]
    fn test_median_single_sample() {
        let frame = RawFrame::new(1, 1, vec![1234u16]);
        let stats = compute_statistics(&frame, &StatisticsParams::default()).unwrap();
        assert_eq!(stats.median_code, 1234);
        assert_eq!(stats.mean_code(), 1234);
        assert_eq!(stats.median_bucket(), 19);
    }

    #[test]
    fn test_median_even_population_takes_lower_code() {
        // Four valid samples: ceil(4/2) = 2 reached at code 10
        let frame = RawFrame::new(4, 1, vec![10u16, 10, 20, 20]);
        let stats = compute_statistics(&frame, &StatisticsParams::default()).unwrap();
        assert_eq!(stats.median_code, 10);
        assert_eq!(stats.mean, 15.0);
    }

    #[test]
    fn test_params_validation() {
        assert!(StatisticsParams::default().validate().is_ok());
        assert!(
            StatisticsParams {
                sentinel_code: 4,
                ..small_params()
            }
            .validate()
            .is_err()
        );
        assert!(
            StatisticsParams {
                degradation_threshold_percent: 101,
                ..small_params()
            }
            .validate()
            .is_err()
        );
    }
}
