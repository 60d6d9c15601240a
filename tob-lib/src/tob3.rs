//! Framed binary table decoding.
//!
//! After the preamble and header block the stream is zero or more fixed-size
//! frames: a 12-byte header of three little-endian `u32` time fields, a body
//! of packed records, and a 4-byte footer carrying two flag bits and the
//! 16-bit validation stamp in its upper half. Decoding reads frames
//! sequentially and stops at the first short read, stamp mismatch, or raised
//! flag; whatever was decoded up to that point is the result.

use std::io::Read;

use ndarray::Array2;
use tracing::debug;

use crate::header::FrameLayout;
use crate::preamble::FrameConfig;
use crate::Result;

/// Seconds from the Unix epoch to the logger epoch (1990-01-01T00:00:00Z).
pub const LOGGER_EPOCH_DELTA_SECS: f64 = 631_152_000.0;

/// Three little-endian `u32` time fields at the front of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Whole seconds since the logger epoch.
    pub seconds: u32,
    /// Sub-second counter in frame-time units.
    pub subseconds: u32,
    /// Record number of the frame's first record.
    pub record_number: u32,
}

impl FrameHeader {
    /// Frame header length in bytes.
    pub const LEN: usize = 12;

    /// Construct from the provided bytes, or `None` if there are not enough.
    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Self> {
        if dat.len() < Self::LEN {
            return None;
        }
        Some(FrameHeader {
            seconds: u32::from_le_bytes([dat[0], dat[1], dat[2], dat[3]]),
            subseconds: u32::from_le_bytes([dat[4], dat[5], dat[6], dat[7]]),
            record_number: u32::from_le_bytes([dat[8], dat[9], dat[10], dat[11]]),
        })
    }
}

/// One little-endian `u32` at the end of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    /// Empty-frame flag. Fatal for the read loop.
    pub flag_e: bool,
    /// Minor-frame flag. Fatal for the read loop.
    pub flag_m: bool,
    /// Stamp that must match the file's validation constant.
    pub validation: u16,
}

impl Footer {
    /// Frame footer length in bytes.
    pub const LEN: usize = 4;

    const FLAG_E: u32 = 0x0000_2000;
    const FLAG_M: u32 = 0x0000_4000;

    /// Construct from the provided bytes, or `None` if there are not enough.
    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Self> {
        if dat.len() < Self::LEN {
            return None;
        }
        let raw = u32::from_le_bytes([dat[0], dat[1], dat[2], dat[3]]);
        Some(Footer {
            flag_e: raw & Self::FLAG_E != 0,
            flag_m: raw & Self::FLAG_M != 0,
            validation: (raw >> 16) as u16,
        })
    }

    /// An intact footer reproduces the stamp and raises neither flag.
    #[must_use]
    pub fn is_intact(&self, validation: u16) -> bool {
        self.validation == validation && !self.flag_e && !self.flag_m
    }
}

/// One frame, split into its three regions. Transient: decoded or discarded,
/// never retained.
#[derive(Debug, Clone)]
pub struct Frame {
    pub header: FrameHeader,
    /// Packed record bytes between header and footer.
    pub body: Vec<u8>,
    pub footer: Footer,
}

impl Frame {
    /// Split `dat` into header, body, and footer, or `None` if `dat` is too
    /// short to hold both.
    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Self> {
        if dat.len() < FrameHeader::LEN + Footer::LEN {
            return None;
        }
        let header = FrameHeader::decode(dat)?;
        let footer = Footer::decode(&dat[dat.len() - Footer::LEN..])?;
        Some(Frame {
            header,
            body: dat[FrameHeader::LEN..dat.len() - Footer::LEN].to_vec(),
            footer,
        })
    }

    /// POSIX seconds of the frame's first record.
    #[must_use]
    pub fn base_time(&self, config: &FrameConfig) -> f64 {
        f64::from(self.header.seconds)
            + f64::from(self.header.subseconds) * config.frame_time.as_secs_f64()
            + LOGGER_EPOCH_DELTA_SECS
    }
}

/// Iterates intact [`Frame`]s from a byte stream.
///
/// The reader has two states, reading and stopped. A clean end of file, a
/// partial trailing frame, a validation mismatch, or a raised footer flag all
/// move it to stopped; only a genuine I/O error is surfaced, once, before
/// stopping. Stopping with zero frames read is a valid outcome.
pub struct FrameReader<R>
where
    R: Read,
{
    reader: R,
    frame_size: usize,
    validation: u16,
    frames_read: usize,
    done: bool,
}

impl<R> FrameReader<R>
where
    R: Read,
{
    pub fn new(reader: R, config: &FrameConfig) -> Self {
        FrameReader {
            reader,
            frame_size: config.frame_size,
            validation: config.validation,
            frames_read: 0,
            done: false,
        }
    }

    /// Frames produced so far.
    #[must_use]
    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    /// Read until `buf` is full or the stream ends, returning the byte count.
    fn fill(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            match self.reader.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        Ok(total)
    }
}

impl<R> Iterator for FrameReader<R>
where
    R: Read,
{
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = vec![0u8; self.frame_size];
        let n = match self.fill(&mut buf) {
            Ok(n) => n,
            Err(err) => {
                self.done = true;
                return Some(Err(err.into()));
            }
        };
        if n < self.frame_size {
            if n > 0 {
                debug!(
                    read = n,
                    frame_size = self.frame_size,
                    "partial trailing frame dropped"
                );
            }
            self.done = true;
            return None;
        }

        let Some(frame) = Frame::decode(&buf) else {
            // Frame size smaller than header plus footer; layout derivation
            // rejects this before any read.
            self.done = true;
            return None;
        };
        if !frame.footer.is_intact(self.validation) {
            debug!(
                frame = self.frames_read,
                validation = frame.footer.validation,
                expected = self.validation,
                flag_e = frame.footer.flag_e,
                flag_m = frame.footer.flag_m,
                "invalid frame; stopping"
            );
            self.done = true;
            return None;
        }

        self.frames_read += 1;
        Some(Ok(frame))
    }
}

/// Decode every intact frame into a records-by-columns table and its
/// timestamp axis.
///
/// Values accumulate in one flat buffer reshaped once at the end. Zero
/// frames yields an empty `0 x columns` table, not an error.
///
/// # Errors
/// Only I/O failures; corrupt or partial frames silently end the loop.
pub fn decode_frames<R>(
    reader: R,
    layout: &FrameLayout,
    config: &FrameConfig,
) -> Result<(Array2<f64>, Vec<f64>)>
where
    R: Read,
{
    let records_per_frame = layout.records_per_frame;
    let columns = layout.fields.len();
    let interval = config.interval.as_secs_f64();

    let mut values: Vec<f64> = Vec::new();
    let mut timestamps: Vec<f64> = Vec::new();
    let mut frames = 0usize;

    for frame in FrameReader::new(reader, config) {
        let frame = frame?;
        let base = frame.base_time(config);
        for i in 0..records_per_frame {
            timestamps.push(base + i as f64 * interval);
        }

        let mut offset = 0;
        values.reserve(records_per_frame * columns);
        for _ in 0..records_per_frame {
            for field in &layout.fields {
                let end = offset + field.size();
                values.push(field.decode(&frame.body[offset..end]));
                offset = end;
            }
        }
        frames += 1;
    }
    debug!(frames, records = timestamps.len(), "frames decoded");

    let data = Array2::from_shape_vec((frames * records_per_frame, columns), values)
        .expect("row-major value buffer matches decoded frame count");
    Ok((data, timestamps))
}
