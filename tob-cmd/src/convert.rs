use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tob::{toa5, Decoder};
use tracing::info;

/// Output name in the vendor converter's convention: input stem plus the
/// file creation time.
fn output_name(input: &Path, created: Option<&chrono::NaiveDateTime>) -> Result<String> {
    let Some(stem) = input.file_stem().and_then(|stem| stem.to_str()) else {
        bail!("input path has no usable file name");
    };
    Ok(match created {
        Some(created) => format!("{stem}_{}.dat", created.format("%Y_%m_%d_%H%M")),
        None => format!("{stem}_converted.dat"),
    })
}

pub fn convert(
    input: &Path,
    output_dir: &Path,
    timezone: Option<&str>,
    clip: Option<usize>,
) -> Result<()> {
    let mut decoder = Decoder::new();
    if let Some(timezone) = timezone {
        decoder = decoder.with_timezone(timezone);
    }
    if let Some(clip) = clip {
        decoder = decoder.with_clip(clip);
    }
    let table = decoder.decode_file(input).context("decoding input")?;

    let name = output_name(input, table.metadata.timestamp.as_ref())?;
    let path = output_dir.join(name);
    let file = File::create(&path)
        .with_context(|| format!("creating output file {}", path.display()))?;
    toa5::write_toa5(BufWriter::new(file), &table).context("writing delimited text")?;

    info!(
        records = table.num_records(),
        output = %path.display(),
        "converted {}",
        input.display()
    );
    Ok(())
}
