mod convert;
mod info;

use std::io::stderr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a logger table file.
    ///
    /// Decodes the file (TOB3 framed binary or TOA5 delimited text) and
    /// prints its metadata, column header, and record summary.
    Info {
        /// Input table file
        input: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: info::Format,

        /// Timezone label to attach to the metadata.
        #[arg(short, long)]
        timezone: Option<String>,
    },
    /// Convert a table file to delimited text.
    ///
    /// The output file is named after the input stem and the file creation
    /// time, following the vendor converter's convention.
    Convert {
        /// Input table file
        input: PathBuf,

        /// Output directory.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Timezone label to attach to the metadata.
        #[arg(short, long)]
        timezone: Option<String>,

        /// Keep at most this many records.
        #[arg(short, long)]
        clip: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("TOB_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Info {
            input,
            format,
            timezone,
        } => info::info(input, format, timezone.as_deref()),
        Commands::Convert {
            input,
            output,
            timezone,
            clip,
        } => convert::convert(input, output, timezone.as_deref(), *clip),
    }
}
