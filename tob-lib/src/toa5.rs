//! Delimited text table reading and writing.
//!
//! The text variant carries the same table as the framed binary format, one
//! comma-delimited row per record with an ISO-like timestamp in its
//! `TIMESTAMP` column. Reading turns rows into the numeric table plus the
//! timestamp axis; writing renders a decoded table back out in the vendor
//! converter's layout.

use std::io::{BufRead, Write};

use ndarray::Array2;
use tracing::debug;

use crate::header::ColumnHeader;
use crate::preamble::{parse_timestamp, split_fields};
use crate::{DecodedTable, Error, Result};

/// Read data rows until end of file.
///
/// The `TIMESTAMP` column becomes the POSIX timestamp axis and is excluded
/// from the returned table; every other cell parses as `f64`, with
/// unparseable cells (`"NAN"`, status strings) becoming NaN.
///
/// # Errors
/// [`Error::Header`] if the header lacks a `TIMESTAMP` column or a row's
/// field count disagrees with it; [`Error::Timestamp`] on an unparseable
/// timestamp cell.
pub fn read_rows<R>(reader: &mut R, header: &ColumnHeader) -> Result<(Array2<f64>, Vec<f64>)>
where
    R: BufRead,
{
    let Some(ts_idx) = header.position("TIMESTAMP") else {
        return Err(Error::Header("no TIMESTAMP column".to_string()));
    };
    let columns = header.len() - 1;

    let mut values: Vec<f64> = Vec::new();
    let mut timestamps: Vec<f64> = Vec::new();
    loop {
        let mut raw = Vec::new();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        if raw.iter().all(|b| b.is_ascii_whitespace()) {
            continue;
        }
        let fields = split_fields(&raw);
        if fields.len() != header.len() {
            return Err(Error::Header(format!(
                "row {} has {} fields, expected {}",
                timestamps.len() + 1,
                fields.len(),
                header.len()
            )));
        }

        let Some(dt) = parse_timestamp(&fields[ts_idx]) else {
            return Err(Error::Timestamp(fields[ts_idx].clone()));
        };
        timestamps.push(dt.and_utc().timestamp_micros() as f64 * 1e-6);

        for (idx, field) in fields.iter().enumerate() {
            if idx == ts_idx {
                continue;
            }
            values.push(field.parse::<f64>().unwrap_or(f64::NAN));
        }
    }
    debug!(records = timestamps.len(), "text rows read");

    let data = Array2::from_shape_vec((timestamps.len(), columns), values)
        .expect("row-major value buffer matches row count");
    Ok((data, timestamps))
}

/// Write `table` as delimited text in the vendor converter's layout:
/// environment line, name/unit/operation rows, then one row per record with
/// a quoted timestamp.
///
/// # Errors
/// [`Error::Io`] on write failures, [`Error::Timestamp`] if a timestamp is
/// outside the representable range.
pub fn write_toa5<W>(mut out: W, table: &DecodedTable) -> Result<()>
where
    W: Write,
{
    let mut environment: Vec<String> = if table.metadata.environment.len() < 2 {
        vec!["TOA5".to_string(), table.metadata.program.clone()]
    } else {
        let env = &table.metadata.environment;
        env[..env.len() - 1].to_vec()
    };
    // The source may have been framed binary; the rendition is always text.
    environment[0] = "TOA5".to_string();
    environment.push(table.metadata.table.clone());
    writeln!(out, "{}", quoted(&environment))?;

    let mut names = vec!["TIMESTAMP".to_string()];
    let mut units = vec!["TS".to_string()];
    let mut operations = vec![String::new()];
    for column in &table.header.columns {
        names.push(column.name.clone());
        units.push(column.unit.clone());
        operations.push(column.operation.clone());
    }
    writeln!(out, "{}", quoted(&names))?;
    writeln!(out, "{}", quoted(&units))?;
    writeln!(out, "{}", quoted(&operations))?;

    for (row, seconds) in table.timestamps.iter().enumerate() {
        write!(out, "\"{}\"", format_timestamp(*seconds)?)?;
        for value in table.data.row(row) {
            if value.is_nan() {
                write!(out, ",NAN")?;
            } else {
                write!(out, ",{value}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

fn quoted(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| format!("\"{f}\""))
        .collect::<Vec<_>>()
        .join(",")
}

fn format_timestamp(seconds: f64) -> Result<String> {
    let micros = (seconds * 1e6).round() as i64;
    let Some(dt) = chrono::DateTime::from_timestamp_micros(micros) else {
        return Err(Error::Timestamp(seconds.to_string()));
    };
    if micros % 1_000_000 == 0 {
        Ok(dt.format("%Y-%m-%d %H:%M:%S").to_string())
    } else {
        Ok(dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preamble::LoggerFormat;
    use std::io::BufReader;

    fn text_header() -> ColumnHeader {
        let dat = b"\"TIMESTAMP\",\"RECORD\",\"Temp\"\r\n\"TS\",\"RN\",\"C\"\r\n\"\",\"\",\"Avg\"\r\n";
        let mut reader = BufReader::new(&dat[..]);
        ColumnHeader::read(&mut reader, &LoggerFormat::DelimitedText).unwrap()
    }

    #[test]
    fn rows_to_table() {
        let dat = b"\"2021-06-18 17:00:00\",1,20.5\r\n\"2021-06-18 17:00:30\",2,NAN\r\n";
        let mut reader = BufReader::new(&dat[..]);
        let (data, timestamps) = read_rows(&mut reader, &text_header()).unwrap();

        assert_eq!(data.shape(), [2, 2]);
        assert_eq!(data[[0, 0]], 1.0);
        assert_eq!(data[[0, 1]], 20.5);
        assert!(data[[1, 1]].is_nan());
        assert!((timestamps[1] - timestamps[0] - 30.0).abs() < 1e-6);
    }

    #[test]
    fn bad_timestamp_cell() {
        let dat = b"\"not a time\",1,20.5\r\n";
        let mut reader = BufReader::new(&dat[..]);
        assert!(matches!(
            read_rows(&mut reader, &text_header()),
            Err(Error::Timestamp(_))
        ));
    }

    #[test]
    fn row_arity_mismatch() {
        let dat = b"\"2021-06-18 17:00:00\",1\r\n";
        let mut reader = BufReader::new(&dat[..]);
        assert!(matches!(
            read_rows(&mut reader, &text_header()),
            Err(Error::Header(_))
        ));
    }

    #[test]
    fn timestamp_formats() {
        assert_eq!(
            format_timestamp(1624035600.0).unwrap(),
            "2021-06-18 17:00:00"
        );
        assert_eq!(
            format_timestamp(1624035600.25).unwrap(),
            "2021-06-18 17:00:00.250"
        );
    }
}
