//! File preamble parsing.
//!
//! Every table file starts with one or two comma-delimited, quote-wrapped
//! text lines naming the format variant, the logger program, and (for the
//! framed binary variant) the frame geometry. Reading the preamble advances
//! the stream cursor; decoding is sequential-only.

use std::io::BufRead;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, trace};

use crate::frequency::Interval;
use crate::{Error, Result};

/// Table format variant, from the first preamble field.
///
/// Each variant carries only the configuration its decode path needs.
#[derive(Debug, Clone)]
pub enum LoggerFormat {
    /// Framed binary table (`TOB3`).
    FramedBinary(FrameConfig),
    /// Comma-delimited text table (`TOA5`).
    DelimitedText,
}

/// Frame geometry declared on the framed variant's second preamble line.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    pub table: String,
    /// Nominal interval between records.
    pub interval: Interval,
    /// Size of one frame in bytes, header and footer included.
    pub frame_size: usize,
    /// Declared ring capacity in records. Kept for diagnostics only.
    pub intended_table_size: u32,
    /// Stamp every intact frame footer must reproduce.
    pub validation: u16,
    /// Resolution of the sub-second frame time counter.
    pub frame_time: Interval,
}

/// Header facts attached to a decoded table. Immutable once header parsing
/// completes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Metadata {
    pub file_type: String,
    pub program: String,
    pub table: String,
    /// File creation time from the preamble, or recovered from the file name
    /// for the text variant.
    pub timestamp: Option<NaiveDateTime>,
    /// Canonical frequency token, e.g. `30s`.
    pub frequency: Option<String>,
    /// Caller-supplied timezone label.
    pub timezone: Option<String>,
    /// Raw fields of the first preamble line, kept so a text rendition can
    /// reproduce its environment line.
    pub environment: Vec<String>,
}

/// Split one preamble or header line into its unquoted fields.
#[must_use]
pub fn split_fields(line: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(line)
        .trim()
        .replace('"', "")
        .split(',')
        .map(str::to_string)
        .collect()
}

/// Read the next text line and split it into fields.
pub(crate) fn read_fields<R: BufRead>(reader: &mut R) -> Result<Vec<String>> {
    let mut raw = Vec::new();
    reader.read_until(b'\n', &mut raw)?;
    Ok(split_fields(&raw))
}

/// Parsed preamble: the format variant plus the metadata it established.
#[derive(Debug, Clone)]
pub struct Preamble {
    pub format: LoggerFormat,
    pub metadata: Metadata,
}

impl Preamble {
    /// Read the one- or two-line preamble from the head of the stream.
    ///
    /// # Errors
    /// [`Error::UnsupportedFormat`] if the first field is not a recognized
    /// format tag; [`Error::Header`] on a malformed preamble line.
    pub fn read<R: BufRead>(reader: &mut R) -> Result<Preamble> {
        let environment = read_fields(reader)?;
        let tag = environment.first().cloned().unwrap_or_default();
        match tag.as_str() {
            "TOB3" => Self::read_framed(reader, environment),
            "TOA5" => Self::read_delimited(environment),
            _ => Err(Error::UnsupportedFormat(tag)),
        }
    }

    fn read_framed<R: BufRead>(reader: &mut R, environment: Vec<String>) -> Result<Preamble> {
        if environment.len() < 4 {
            return Err(Error::Header(format!(
                "expected at least 4 fields in environment line, got {}",
                environment.len()
            )));
        }
        let created = environment[environment.len() - 1].as_str();
        let timestamp = parse_timestamp(created);
        if timestamp.is_none() {
            trace!(created, "could not parse file creation time");
        }

        let table_line = read_fields(reader)?;
        if table_line.len() < 6 {
            return Err(Error::Header(format!(
                "expected 6 fields in table line, got {}",
                table_line.len()
            )));
        }
        let interval: Interval = table_line[1].parse()?;
        let frame_size: usize = table_line[2]
            .parse()
            .map_err(|_| Error::Header(format!("invalid frame size: {:?}", table_line[2])))?;
        let intended_table_size: u32 = table_line[3].parse().map_err(|_| {
            Error::Header(format!("invalid intended table size: {:?}", table_line[3]))
        })?;
        let validation: u16 = table_line[4]
            .parse()
            .map_err(|_| Error::Header(format!("invalid validation stamp: {:?}", table_line[4])))?;
        let frame_time: Interval = table_line[5].parse()?;

        let config = FrameConfig {
            table: table_line[0].clone(),
            interval,
            frame_size,
            intended_table_size,
            validation,
            frame_time,
        };
        debug!(
            table = %config.table,
            frame_size,
            validation,
            interval = %config.interval,
            frame_time = %config.frame_time,
            "read framed binary preamble"
        );

        let metadata = Metadata {
            file_type: "TOB3".to_string(),
            program: program_name(&environment),
            table: config.table.clone(),
            timestamp,
            frequency: Some(config.interval.to_string()),
            timezone: None,
            environment,
        };
        Ok(Preamble {
            format: LoggerFormat::FramedBinary(config),
            metadata,
        })
    }

    fn read_delimited(environment: Vec<String>) -> Result<Preamble> {
        if environment.len() < 4 {
            return Err(Error::Header(format!(
                "expected at least 4 fields in environment line, got {}",
                environment.len()
            )));
        }
        let metadata = Metadata {
            file_type: "TOA5".to_string(),
            program: program_name(&environment),
            table: environment[environment.len() - 1].clone(),
            timestamp: None,
            frequency: None,
            timezone: None,
            environment,
        };
        Ok(Preamble {
            format: LoggerFormat::DelimitedText,
            metadata,
        })
    }
}

/// Program identifier: third-from-last environment field with any storage
/// prefix (`CPU:`, `CRD:`) stripped.
fn program_name(environment: &[String]) -> String {
    environment[environment.len() - 3]
        .rsplit(':')
        .next()
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    None
}

/// Recover a file creation time from a `YYYY_MM_DD_HHMM` pattern embedded in
/// the file name, the convention used by the vendor's own converter.
#[must_use]
pub fn timestamp_from_name(stem: &str) -> Option<NaiveDateTime> {
    const PATTERN_LEN: usize = 15;
    if stem.len() < PATTERN_LEN {
        return None;
    }
    for i in 0..=stem.len() - PATTERN_LEN {
        if !stem.is_char_boundary(i) || !stem.is_char_boundary(i + PATTERN_LEN) {
            continue;
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(&stem[i..i + PATTERN_LEN], "%Y_%m_%d_%H%M") {
            return Some(dt);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    const TOB3_PREAMBLE: &[u8] = b"\"TOB3\",\"Station\",\"CR1000X\",\"12345\",\"CR1000X.Std.03.02\",\"CPU:biomet.CR1X\",\"54321\",\"2021-06-18 17:00:00\"\r\n\"Flux30Min\",\"30 SEC\",\"76\",\"1000\",\"43981\",\"SecMsec\"\r\n";

    #[test]
    fn framed_preamble() {
        let mut reader = BufReader::new(TOB3_PREAMBLE);
        let preamble = Preamble::read(&mut reader).unwrap();

        let LoggerFormat::FramedBinary(config) = &preamble.format else {
            panic!("expected framed binary format");
        };
        assert_eq!(config.table, "Flux30Min");
        assert_eq!(config.frame_size, 76);
        assert_eq!(config.validation, 43981);
        assert!((config.interval.as_secs_f64() - 30.0).abs() < 1e-12);
        assert!((config.frame_time.as_secs_f64() - 0.001).abs() < 1e-12);

        assert_eq!(preamble.metadata.file_type, "TOB3");
        assert_eq!(preamble.metadata.program, "biomet.CR1X");
        assert_eq!(preamble.metadata.table, "Flux30Min");
        assert_eq!(preamble.metadata.frequency.as_deref(), Some("30s"));
        let created = preamble.metadata.timestamp.unwrap();
        assert_eq!(created.format("%Y-%m-%d %H:%M:%S").to_string(), "2021-06-18 17:00:00");
    }

    #[test]
    fn delimited_preamble() {
        let dat = b"\"TOA5\",\"Station\",\"CR1000X\",\"12345\",\"CR1000X.Std.03.02\",\"CPU:biomet.CR1X\",\"54321\",\"Flux30Min\"\r\nrest";
        let mut reader = BufReader::new(&dat[..]);
        let preamble = Preamble::read(&mut reader).unwrap();

        assert!(matches!(preamble.format, LoggerFormat::DelimitedText));
        assert_eq!(preamble.metadata.table, "Flux30Min");
        assert_eq!(preamble.metadata.program, "biomet.CR1X");
        assert!(preamble.metadata.timestamp.is_none());
    }

    #[test]
    fn unsupported_tag() {
        let dat = b"\"TOB2\",\"Station\",\"CR10X\"\r\n";
        let mut reader = BufReader::new(&dat[..]);
        let zult = Preamble::read(&mut reader);
        assert!(matches!(zult, Err(Error::UnsupportedFormat(tag)) if tag == "TOB2"));
    }

    #[test]
    fn short_table_line_is_header_error() {
        let dat = b"\"TOB3\",\"Station\",\"CR1000X\",\"12345\",\"os\",\"CPU:p.CR1X\",\"1\",\"2021-06-18 17:00:00\"\r\n\"T\",\"30 SEC\"\r\n";
        let mut reader = BufReader::new(&dat[..]);
        assert!(matches!(Preamble::read(&mut reader), Err(Error::Header(_))));
    }

    #[test]
    fn name_timestamp_recovery() {
        let dt = timestamp_from_name("Flux30Min_2021_06_18_1700").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2021-06-18 17:00");
        assert!(timestamp_from_name("Flux30Min").is_none());
    }
}
