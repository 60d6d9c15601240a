use std::io::{stdout, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tob::{DecodedTable, Decoder, Metadata};

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Debug, Serialize)]
struct ColumnInfo {
    name: String,
    unit: String,
    operation: String,
    data_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct Info {
    filename: String,
    metadata: Metadata,
    columns: Vec<ColumnInfo>,
    records: usize,
    first_timestamp: Option<String>,
    last_timestamp: Option<String>,
}

fn format_timestamp(seconds: f64) -> Option<String> {
    let micros = (seconds * 1e6).round() as i64;
    let dt = chrono::DateTime::from_timestamp_micros(micros)?;
    Some(dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
}

fn summarize(fpath: &Path, table: &DecodedTable) -> Info {
    let columns = table
        .header
        .columns
        .iter()
        .map(|column| ColumnInfo {
            name: column.name.clone(),
            unit: column.unit.clone(),
            operation: column.operation.clone(),
            data_type: column.data_type.map(|t| format!("{t:?}")),
        })
        .collect();

    Info {
        filename: fpath.display().to_string(),
        metadata: table.metadata.clone(),
        columns,
        records: table.num_records(),
        first_timestamp: table.timestamps.first().copied().and_then(format_timestamp),
        last_timestamp: table.timestamps.last().copied().and_then(format_timestamp),
    }
}

fn render_text(info: &Info) -> Result<()> {
    let mut out = stdout().lock();
    writeln!(out, "{}", info.filename)?;
    writeln!(out, "  type:      {}", info.metadata.file_type)?;
    writeln!(out, "  program:   {}", info.metadata.program)?;
    writeln!(out, "  table:     {}", info.metadata.table)?;
    if let Some(created) = &info.metadata.timestamp {
        writeln!(out, "  created:   {created}")?;
    }
    if let Some(frequency) = &info.metadata.frequency {
        writeln!(out, "  frequency: {frequency}")?;
    }
    if let Some(timezone) = &info.metadata.timezone {
        writeln!(out, "  timezone:  {timezone}")?;
    }
    writeln!(out, "  records:   {}", info.records)?;
    if let (Some(first), Some(last)) = (&info.first_timestamp, &info.last_timestamp) {
        writeln!(out, "  span:      {first} to {last}")?;
    }
    writeln!(out, "  columns:")?;
    for column in &info.columns {
        writeln!(
            out,
            "    {} [{}] {} {}",
            column.name,
            column.unit,
            column.operation,
            column.data_type.as_deref().unwrap_or("-"),
        )?;
    }
    Ok(())
}

pub fn info(input: &Path, format: &Format, timezone: Option<&str>) -> Result<()> {
    let mut decoder = Decoder::new();
    if let Some(timezone) = timezone {
        decoder = decoder.with_timezone(timezone);
    }
    let table = decoder.decode_file(input).context("decoding input")?;
    let info = summarize(input, &table);

    match format {
        Format::Json => {
            serde_json::to_writer_pretty(stdout(), &info).context("serializing to json")?;
            println!();
        }
        Format::Text => render_text(&info)?,
    }
    Ok(())
}
