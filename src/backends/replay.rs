// SPDX-License-Identifier: GPL-3.0-only

//! Raw frame dumps
//!
//! A dump is a headerless sequence of frames, each `width * height`
//! little-endian `u16` codes. The frame size is not stored, so readers must
//! be told the dimensions. A file that ends inside a frame is rejected.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use tracing::{debug, info};

use super::{FrameSource, SourceError, SourceResult};
use crate::depth::RawFrame;
use crate::depth::frame::{decode_le_samples, encode_le_samples};

/// Replays frames from a dump
pub struct ReplaySource<R = BufReader<File>> {
    reader: R,
    name: String,
    width: u32,
    height: u32,
    buffer: Vec<u8>,
    sequence: u32,
}

impl ReplaySource {
    /// Open a dump file
    pub fn open(path: impl AsRef<Path>, width: u32, height: u32) -> SourceResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| SourceError::Io(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), width, height, "Opened frame dump");
        Self::from_reader(BufReader::new(file), path.display().to_string(), width, height)
    }
}

impl<R: Read> ReplaySource<R> {
    /// Replay frames from any reader
    pub fn from_reader(
        reader: R,
        name: impl Into<String>,
        width: u32,
        height: u32,
    ) -> SourceResult<Self> {
        let frame_bytes = width as usize * height as usize * 2;
        if frame_bytes == 0 {
            return Err(SourceError::FormatNotSupported(format!(
                "frame size {}x{} has no pixels",
                width, height
            )));
        }

        Ok(Self {
            reader,
            name: name.into(),
            width,
            height,
            buffer: vec![0; frame_bytes],
            sequence: 0,
        })
    }

    /// Frames delivered so far
    pub fn frames_read(&self) -> u32 {
        self.sequence
    }

    /// Fill the frame buffer; returns the number of bytes read before EOF
    fn fill(&mut self) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < self.buffer.len() {
            match self.reader.read(&mut self.buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<R: Read> FrameSource for ReplaySource<R> {
    fn describe(&self) -> String {
        format!("replay {} ({}x{})", self.name, self.width, self.height)
    }

    fn next_frame(&mut self) -> SourceResult<Option<RawFrame>> {
        let filled = self.fill()?;
        if filled == 0 {
            debug!(frames = self.sequence, "End of frame dump");
            return Ok(None);
        }
        if filled < self.buffer.len() {
            return Err(SourceError::Io(format!(
                "trailing partial frame after frame {}: {} of {} bytes",
                self.sequence,
                filled,
                self.buffer.len()
            )));
        }

        // Dumps carry no clock; the frame index stands in for the timestamp
        let frame = RawFrame::new(self.width, self.height, decode_le_samples(&self.buffer))
            .with_timing(self.sequence, self.sequence);
        self.sequence += 1;
        Ok(Some(frame))
    }
}

/// Writes frames to a dump
pub struct FrameRecorder<W: Write = BufWriter<File>> {
    writer: W,
    frames: u32,
}

impl FrameRecorder {
    /// Create (or truncate) a dump file
    pub fn create(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| SourceError::Io(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Recording frames");
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> FrameRecorder<W> {
    /// Record into any writer
    pub fn new(writer: W) -> Self {
        Self { writer, frames: 0 }
    }

    /// Append one frame
    pub fn write_frame(&mut self, frame: &RawFrame) -> SourceResult<()> {
        self.writer.write_all(&encode_le_samples(&frame.samples))?;
        self.frames += 1;
        Ok(())
    }

    /// Frames written so far
    pub fn frames_written(&self) -> u32 {
        self.frames
    }

    /// Flush and return the writer
    pub fn finish(mut self) -> SourceResult<W> {
        self.writer.flush()?;
        debug!(frames = self.frames, "Finished recording");
        Ok(self.writer)
    }
}
