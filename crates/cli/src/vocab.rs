//! vocab - Build and query OCR correction dictionaries
//!
//! Dictionaries are stored as TSV similarity tables: a header row with the
//! link threshold and the total token count, then one row per token with
//! its count and the tokens it is linked to.

mod logging;

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand};
use dirscan_core::similarity::{
    CityMatcher, DEFAULT_CITY_CUTOFF, DEFAULT_TARGET_SIMILARITY, DEFAULT_THRESHOLD, IndexTable,
    SimilarityIndex, validate_threshold,
};

/// Build, tune and query OCR correction dictionaries.
#[derive(Parser, Debug)]
#[command(name = "vocab")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Use debug logging level
    #[arg(short = 'd', long, global = true, action = ArgAction::SetTrue)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a dictionary from the most common words of text files
    Build(BuildArgs),
    /// Correct words against a dictionary
    Query(QueryArgs),
    /// Change the link threshold of a dictionary
    Retune(RetuneArgs),
    /// Check a dictionary and print its size
    Check(CheckArgs),
    /// Match OCR'd city headers against a list of city names
    City(CityArgs),
}

#[derive(ClapArgs, Debug)]
struct BuildArgs {
    /// Text files to take words from
    #[arg(required = true)]
    corpus: Vec<PathBuf>,

    /// Output dictionary
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Add to this dictionary instead of starting empty
    #[arg(long)]
    base: Option<PathBuf>,

    /// Number of words to keep
    #[arg(short = 'n', long, default_value_t = 1000)]
    num: usize,

    /// Skip this many of the most common words (stop words)
    #[arg(short = 's', long, default_value_t = 0)]
    start: usize,

    /// Similarity at which two words are linked (0-100)
    #[arg(short = 't', long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,
}

#[derive(ClapArgs, Debug)]
struct QueryArgs {
    /// Dictionary to query
    #[arg(short = 'D', long)]
    dict: PathBuf,

    /// Words to correct; read one per line from stdin when omitted
    words: Vec<String>,

    /// Stop searching once a match reaches this score
    #[arg(short = 't', long, default_value_t = DEFAULT_TARGET_SIMILARITY)]
    target: f64,

    /// Score every word instead of walking the similarity graph
    #[arg(long, action = ArgAction::SetTrue)]
    exhaustive: bool,
}

#[derive(ClapArgs, Debug)]
struct RetuneArgs {
    /// Dictionary to change
    #[arg(short = 'D', long)]
    dict: PathBuf,

    /// New link threshold (0-100)
    #[arg(short = 't', long)]
    threshold: f64,

    /// Where to write the result (defaults to overwriting the input)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct CheckArgs {
    /// Dictionary to check
    #[arg(short = 'D', long)]
    dict: PathBuf,
}

#[derive(ClapArgs, Debug)]
struct CityArgs {
    /// File with one city name per line
    #[arg(short = 'C', long)]
    cities: PathBuf,

    /// Header lines to match; read from stdin when omitted
    lines: Vec<String>,

    /// Minimum score to accept a city
    #[arg(long, default_value_t = DEFAULT_CITY_CUTOFF)]
    cutoff: f64,
}

fn load_dict(path: &Path) -> Result<SimilarityIndex> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let table = IndexTable::read_tsv(BufReader::new(file))
        .with_context(|| format!("cannot read {}", path.display()))?;
    SimilarityIndex::load(&table).with_context(|| format!("cannot load {}", path.display()))
}

fn save_dict(index: &SimilarityIndex, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    index.save().write_tsv(BufWriter::new(file))?;
    Ok(())
}

/// Command line values, or stdin lines when there are none.
fn inputs(values: &[String]) -> Result<Vec<String>> {
    if !values.is_empty() {
        return Ok(values.to_vec());
    }
    let mut lines = Vec::new();
    for line in io::stdin().lock().lines() {
        let line = line?;
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }
    Ok(lines)
}

fn build(args: &BuildArgs) -> Result<()> {
    let mut index = match &args.base {
        Some(base) => load_dict(base)?,
        None => {
            SimilarityIndex::new(validate_threshold(args.threshold)?)
        }
    };

    let mut text = String::new();
    for path in &args.corpus {
        let body = fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        text.push_str(&body);
        text.push('\n');
    }

    let added = index.add_common_tokens(&text, args.num, args.start);
    save_dict(&index, &args.output)?;
    tracing::info!(
        added,
        tokens = index.len(),
        edges = index.edge_count(),
        "built dictionary"
    );
    Ok(())
}

fn query(args: &QueryArgs) -> Result<()> {
    let index = load_dict(&args.dict)?;
    let mut out = BufWriter::new(io::stdout().lock());
    for word in inputs(&args.words)? {
        let word = word.trim().to_lowercase();
        let found = if args.exhaustive {
            index.query_exhaustive(&word, args.target)
        } else {
            index.query(&word, args.target)
        };
        writeln!(out, "{word}\t{}\t{:.1}", found.value, found.score)?;
    }
    out.flush()?;
    Ok(())
}

fn retune(args: &RetuneArgs) -> Result<()> {
    let mut index = load_dict(&args.dict)?;
    let before = index.edge_count();
    index.set_threshold(args.threshold)?;
    save_dict(&index, args.output.as_deref().unwrap_or(args.dict.as_path()))?;
    tracing::info!(before, after = index.edge_count(), "retuned dictionary");
    Ok(())
}

fn check(args: &CheckArgs) -> Result<()> {
    let index = load_dict(&args.dict)?;
    index.verify_graph()?;
    println!(
        "tokens\t{}\nedges\t{}\nthreshold\t{}\noccurrences\t{}",
        index.len(),
        index.edge_count(),
        index.threshold(),
        index.total_occurrences()
    );
    Ok(())
}

fn city(args: &CityArgs) -> Result<()> {
    let names = fs::read_to_string(&args.cities)
        .with_context(|| format!("cannot read {}", args.cities.display()))?;
    let mut matcher = CityMatcher::new();
    matcher.load_cities(names.lines());

    let mut out = BufWriter::new(io::stdout().lock());
    for line in inputs(&args.lines)? {
        let found = matcher.match_city(&line, args.cutoff).unwrap_or_default();
        writeln!(out, "{}\t{found}", line.trim())?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.debug);

    let result = match &cli.command {
        Command::Build(args) => build(args),
        Command::Query(args) => query(args),
        Command::Retune(args) => retune(args),
        Command::Check(args) => check(args),
        Command::City(args) => city(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
