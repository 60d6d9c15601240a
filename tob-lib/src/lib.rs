#![doc = include_str!("../README.md")]

mod error;

pub mod fp2;
pub mod frequency;
pub mod header;
pub mod preamble;
pub mod toa5;
pub mod tob3;

pub use error::{Error, Result};
pub use fp2::decode_fp2;
pub use frequency::Interval;
pub use header::{Column, ColumnHeader, FieldType, FrameLayout};
pub use preamble::{FrameConfig, LoggerFormat, Metadata, Preamble};

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use chrono::NaiveDateTime;
use ndarray::{s, Array2};
use tracing::debug;

/// A fully decoded table file: numeric records, their timestamp axis, the
/// column header, and the file metadata. Ownership passes to the caller.
#[derive(Debug, Clone)]
pub struct DecodedTable {
    pub metadata: Metadata,
    pub header: ColumnHeader,
    /// Records by columns, in header order.
    pub data: Array2<f64>,
    /// POSIX seconds, one per record. Non-decreasing for contiguous frames.
    pub timestamps: Vec<f64>,
}

impl DecodedTable {
    #[must_use]
    pub fn num_records(&self) -> usize {
        self.timestamps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Decodes logger table files.
///
/// Holds only caller options; all parsing state is threaded through the
/// decode explicitly, so a `Decoder` is reusable and decoding the same bytes
/// twice yields identical results.
///
/// # Examples
/// ```no_run
/// use tob::Decoder;
///
/// let table = Decoder::new()
///     .with_timezone("UTC")
///     .decode_file("Flux30Min.dat")
///     .unwrap();
/// println!("{} records", table.num_records());
/// ```
#[derive(Debug, Default, Clone)]
pub struct Decoder {
    timezone: Option<String>,
    clip: Option<usize>,
}

impl Decoder {
    #[must_use]
    pub fn new() -> Self {
        Decoder::default()
    }

    /// Attach a timezone label to the output metadata.
    #[must_use]
    pub fn with_timezone(mut self, timezone: &str) -> Self {
        self.timezone = Some(timezone.to_string());
        self
    }

    /// Keep at most the first `rows` records. Useful for small tables that
    /// never fill a frame.
    #[must_use]
    pub fn with_clip(mut self, rows: usize) -> Self {
        self.clip = Some(rows);
        self
    }

    /// Decode a table file from disk. For the text variant the file name
    /// supplies the creation time the preamble lacks.
    ///
    /// # Errors
    /// See [`Decoder::decode`]; additionally any I/O error opening the file.
    pub fn decode_file<P: AsRef<Path>>(&self, path: P) -> Result<DecodedTable> {
        let path = path.as_ref();
        let hint = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(preamble::timestamp_from_name);
        let file = File::open(path)?;
        self.decode_with_hint(BufReader::new(file), hint)
    }

    /// Decode a table file from any byte source, consuming it sequentially
    /// from the start.
    ///
    /// # Errors
    /// [`Error::UnsupportedFormat`] for an unrecognized format tag;
    /// [`Error::Header`], [`Error::FieldType`], [`Error::Frequency`], or
    /// [`Error::FrameSize`] for configuration inconsistencies, all raised
    /// before any frame is read; [`Error::Io`] for read failures. Frame
    /// corruption is not an error: the result simply holds the records
    /// decoded before the first bad frame, possibly none.
    pub fn decode<R: Read>(&self, reader: R) -> Result<DecodedTable> {
        self.decode_with_hint(BufReader::new(reader), None)
    }

    fn decode_with_hint<R: BufRead>(
        &self,
        mut reader: R,
        name_hint: Option<NaiveDateTime>,
    ) -> Result<DecodedTable> {
        let Preamble {
            format,
            mut metadata,
        } = Preamble::read(&mut reader)?;
        metadata.timezone = self.timezone.clone();

        let mut header = ColumnHeader::read(&mut reader, &format)?;
        let (mut data, mut timestamps) = match &format {
            LoggerFormat::FramedBinary(config) => {
                let layout = FrameLayout::new(&header, config.frame_size)?;
                debug!(
                    columns = header.len(),
                    record_size = layout.record_size,
                    records_per_frame = layout.records_per_frame,
                    "decoding frames"
                );
                tob3::decode_frames(&mut reader, &layout, config)?
            }
            LoggerFormat::DelimitedText => {
                if metadata.timestamp.is_none() {
                    metadata.timestamp = name_hint;
                }
                let (data, timestamps) = toa5::read_rows(&mut reader, &header)?;
                header.remove("TIMESTAMP");
                if timestamps.len() > 1 {
                    let elapsed = timestamps[timestamps.len() - 1] - timestamps[0];
                    let average = elapsed / (timestamps.len() - 1) as f64;
                    metadata.frequency = Some(Interval::from_secs_f64(average).to_string());
                }
                (data, timestamps)
            }
        };

        if let Some(clip) = self.clip {
            if clip < timestamps.len() {
                data = data.slice(s![..clip, ..]).to_owned();
                timestamps.truncate(clip);
            }
        }

        Ok(DecodedTable {
            metadata,
            header,
            data,
            timestamps,
        })
    }
}
