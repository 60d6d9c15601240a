//! Column header block parsing and the derived frame byte layout.

use std::io::BufRead;

use serde::Serialize;

use crate::fp2::decode_fp2;
use crate::preamble::{read_fields, LoggerFormat};
use crate::tob3::{Footer, FrameHeader};
use crate::{Error, Result};

/// Declared per-column storage type for the framed binary variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldType {
    /// 4-byte big-endian IEEE float.
    Ieee4B,
    /// 8-byte big-endian IEEE float.
    Ieee8B,
    /// 2-byte packed float, decoded by [`decode_fp2`].
    Fp2,
}

impl FieldType {
    /// Map a declared type string to its decode tag.
    ///
    /// # Errors
    /// [`Error::FieldType`] for any string outside the fixed enumeration;
    /// the file cannot be decoded.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "IEEE4B" => Ok(FieldType::Ieee4B),
            "IEEE8B" => Ok(FieldType::Ieee8B),
            "FP2" => Ok(FieldType::Fp2),
            _ => Err(Error::FieldType(name.to_string())),
        }
    }

    /// Packed size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            FieldType::Ieee4B => 4,
            FieldType::Ieee8B => 8,
            FieldType::Fp2 => 2,
        }
    }

    /// Decode one packed value. `dat` must hold at least [`Self::size`] bytes.
    pub(crate) fn decode(self, dat: &[u8]) -> f64 {
        match self {
            FieldType::Ieee4B => f64::from(f32::from_be_bytes([dat[0], dat[1], dat[2], dat[3]])),
            FieldType::Ieee8B => f64::from_be_bytes([
                dat[0], dat[1], dat[2], dat[3], dat[4], dat[5], dat[6], dat[7],
            ]),
            FieldType::Fp2 => decode_fp2(u16::from_be_bytes([dat[0], dat[1]])),
        }
    }
}

/// One column descriptor from the header block.
#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub name: String,
    pub unit: String,
    /// Aggregation code from the logger program, e.g. `Avg` or `Smp`.
    pub operation: String,
    /// Declared storage type; absent for the delimited text variant.
    pub data_type: Option<FieldType>,
}

/// Ordered column descriptors. Order defines both the record byte layout and
/// the output column order.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnHeader {
    pub columns: Vec<Column>,
}

impl ColumnHeader {
    /// Read the column-name line plus the unit/operation rows, and for the
    /// framed variant the declared-type row. Every line must match the
    /// column count of the name line.
    ///
    /// # Errors
    /// [`Error::Header`] on a row length mismatch, [`Error::FieldType`] on an
    /// unrecognized declared type.
    pub fn read<R: BufRead>(reader: &mut R, format: &LoggerFormat) -> Result<ColumnHeader> {
        let names = read_fields(reader)?;
        if names.is_empty() || names[0].is_empty() {
            return Err(Error::Header("empty column name line".to_string()));
        }

        let units = Self::read_row(reader, names.len(), "unit")?;
        let operations = Self::read_row(reader, names.len(), "operation")?;
        let types = match format {
            LoggerFormat::FramedBinary(_) => Self::read_row(reader, names.len(), "data type")?
                .iter()
                .map(|name| FieldType::from_name(name).map(Some))
                .collect::<Result<Vec<_>>>()?,
            LoggerFormat::DelimitedText => vec![None; names.len()],
        };

        let columns = names
            .into_iter()
            .zip(units)
            .zip(operations)
            .zip(types)
            .map(|(((name, unit), operation), data_type)| Column {
                name,
                unit,
                operation,
                data_type,
            })
            .collect();
        Ok(ColumnHeader { columns })
    }

    fn read_row<R: BufRead>(reader: &mut R, want: usize, what: &str) -> Result<Vec<String>> {
        let row = read_fields(reader)?;
        if row.len() != want {
            return Err(Error::Header(format!(
                "{what} row has {} fields, expected {want}",
                row.len()
            )));
        }
        Ok(row)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Index of the named column.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Remove the named column, returning it if present.
    pub fn remove(&mut self, name: &str) -> Option<Column> {
        let idx = self.position(name)?;
        Some(self.columns.remove(idx))
    }
}

/// Derived byte layout of one frame body. Never stored in metadata.
#[derive(Debug, Clone)]
pub struct FrameLayout {
    /// Per-column decode tags, in column order.
    pub fields: Vec<FieldType>,
    /// Packed size of one record in bytes.
    pub record_size: usize,
    /// Whole records per frame body.
    pub records_per_frame: usize,
}

impl FrameLayout {
    /// Derive the layout from the header and the declared frame size.
    ///
    /// # Errors
    /// [`Error::Header`] if any column lacks a declared type;
    /// [`Error::FrameSize`] if the body does not split into whole records.
    pub fn new(header: &ColumnHeader, frame_size: usize) -> Result<FrameLayout> {
        let mut fields = Vec::with_capacity(header.len());
        for column in &header.columns {
            let Some(data_type) = column.data_type else {
                return Err(Error::Header(format!(
                    "column {:?} has no declared data type",
                    column.name
                )));
            };
            fields.push(data_type);
        }
        let record_size: usize = fields.iter().map(|f| f.size()).sum();

        let overhead = FrameHeader::LEN + Footer::LEN;
        if record_size == 0 || frame_size <= overhead {
            return Err(Error::FrameSize {
                frame_size,
                record_size,
            });
        }
        let body = frame_size - overhead;
        if body % record_size != 0 || body < record_size {
            return Err(Error::FrameSize {
                frame_size,
                record_size,
            });
        }

        Ok(FrameLayout {
            fields,
            record_size,
            records_per_frame: body / record_size,
        })
    }
}
