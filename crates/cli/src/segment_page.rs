//! segment-page - Group the text regions of directory pages into records
//!
//! Reads one JSON file per scanned image, each an array of text blocks
//! `{"x", "y", "w", "h", "text"}` produced by the contour and OCR steps, and
//! writes one JSON line per page with the detected headers and the record
//! boxes below each of them.

mod logging;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use dirscan_core::geometry::TextBlock;
use dirscan_core::layout::{BodyRecord, ExtraSlotPolicy, HeaderRecord, PageConfig, segment_page};
use serde::Serialize;

/// Surplus column handling, mirrored from the library for clap.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExtraSlots {
    /// Drop the leftmost surplus column
    Leftmost,
    /// Drop the rightmost surplus column
    Rightmost,
    /// Drop the column with the fewest boxes
    Fewest,
}

impl From<ExtraSlots> for ExtraSlotPolicy {
    fn from(value: ExtraSlots) -> Self {
        match value {
            ExtraSlots::Leftmost => ExtraSlotPolicy::DropLeftmost,
            ExtraSlots::Rightmost => ExtraSlotPolicy::DropRightmost,
            ExtraSlots::Fewest => ExtraSlotPolicy::DropFewest,
        }
    }
}

/// Segment directory pages into header-bounded record groups.
#[derive(Parser, Debug)]
#[command(name = "segment-page")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// One or more JSON files of text blocks, one file per image
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,

    /// JSON file with layout settings for this publication
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Columns across the whole image (overrides the config file)
    #[arg(short = 'n', long)]
    columns: Option<usize>,

    /// Physical pages per image, 1 or 2 (overrides the config file)
    #[arg(short = 'p', long = "pages-per-image")]
    pages_per_image: Option<usize>,

    /// Minimum header width as a fraction of the widest header
    #[arg(long = "min-header-width")]
    min_header_width: Option<f64>,

    /// What to drop when clustering finds too many columns
    #[arg(long = "extra-slots", value_enum)]
    extra_slots: Option<ExtraSlots>,

    /// Path to file where output is written, or "-" for stdout
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,
}

#[derive(Serialize)]
struct GroupReport<'a> {
    header: HeaderRecord<'a>,
    records: Vec<BodyRecord<'a>>,
}

#[derive(Serialize)]
struct PageReport<'a> {
    file: String,
    page_boundary: Option<f64>,
    groups: Vec<GroupReport<'a>>,
    non_column: Vec<&'a TextBlock>,
}

/// Build the page config from the optional file and command line overrides.
fn build_config(args: &Args) -> Result<PageConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("cannot open config {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => PageConfig::default(),
    };

    if let Some(columns) = args.columns {
        config.expected_columns = columns;
    }
    if let Some(pages) = args.pages_per_image {
        config.columns.pages_per_image = pages;
    }
    if let Some(fraction) = args.min_header_width {
        config.segment.min_header_width_fraction = fraction;
    }
    if let Some(policy) = args.extra_slots {
        config.columns.extra_slot_policy = policy.into();
    }

    config.validate()?;
    Ok(config)
}

fn read_blocks(path: &Path) -> Result<Vec<TextBlock>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("invalid text blocks in {}", path.display()))
}

/// Process a single page file and write its report line.
fn process_file<W: Write>(path: &Path, config: &PageConfig, writer: &mut W) -> Result<()> {
    let blocks = read_blocks(path)?;
    let (layout, groups) = segment_page(&blocks, config)?;

    let report = PageReport {
        file: path.display().to_string(),
        page_boundary: layout.page_boundary,
        groups: groups
            .iter()
            .map(|g| {
                let (header, records) = g.records(&blocks);
                GroupReport { header, records }
            })
            .collect(),
        non_column: layout.non_column.iter().map(|&i| &blocks[i]).collect(),
    };
    serde_json::to_writer(&mut *writer, &report)?;
    writeln!(writer)?;

    tracing::info!(
        file = %path.display(),
        headers = groups.len(),
        "segmented page"
    );
    Ok(())
}

fn run(args: &Args) -> Result<usize> {
    let config = build_config(args)?;

    let mut output: Box<dyn Write> = if args.outfile == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        let file = File::create(&args.outfile)
            .with_context(|| format!("failed to create output file {}", args.outfile))?;
        Box::new(BufWriter::new(file))
    };

    // A bad page should not stop the rest of the batch.
    let mut failed = 0;
    for path in &args.files {
        if let Err(e) = process_file(path, &config, &mut output) {
            tracing::error!(file = %path.display(), "{e:#}");
            failed += 1;
        }
    }

    output.flush()?;
    Ok(failed)
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.debug);

    match run(&args) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            eprintln!("{failed} of {} files could not be segmented", args.files.len());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
