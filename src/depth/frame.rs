// SPDX-License-Identifier: GPL-3.0-only

//! Raw depth frame as delivered by a frame source

use std::sync::Arc;

/// One raw depth frame: row-major 11-bit codes, one per pixel
///
/// The sample buffer is shared (`Arc<[u16]>`) so a frame can be handed from
/// the capture thread to the monitor without copying. Frames are never
/// mutated after delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Raw depth codes in row-major order
    pub samples: Arc<[u16]>,
    /// Frame sequence number (source-assigned, monotonically increasing)
    pub sequence: u32,
    /// Device timestamp of the frame (device clock ticks)
    pub timestamp: u32,
}

impl RawFrame {
    /// Create a frame with sequence and timestamp zero
    ///
    /// The sample count is not checked here; the statistics engine rejects
    /// frames whose length does not match `width * height`.
    pub fn new(width: u32, height: u32, samples: impl Into<Arc<[u16]>>) -> Self {
        Self {
            width,
            height,
            samples: samples.into(),
            sequence: 0,
            timestamp: 0,
        }
    }

    /// Attach source timing information
    pub fn with_timing(mut self, sequence: u32, timestamp: u32) -> Self {
        self.sequence = sequence;
        self.timestamp = timestamp;
        self
    }

    /// Number of pixels implied by the frame dimensions
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Convert a pixel index into (x, y) coordinates
    pub fn position(&self, index: usize) -> (u32, u32) {
        pixel_position(index, self.width)
    }
}

/// Convert a row-major pixel index into (x, y) for a frame of `width` columns
pub fn pixel_position(index: usize, width: u32) -> (u32, u32) {
    let width = width.max(1) as usize;
    ((index % width) as u32, (index / width) as u32)
}

/// Decode little-endian 16-bit samples (V4L2 `Y16 ` buffers, raw dumps)
///
/// A trailing odd byte is ignored.
pub fn decode_le_samples(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect()
}

/// Encode samples as little-endian bytes (inverse of [`decode_le_samples`])
pub fn encode_le_samples(samples: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}
