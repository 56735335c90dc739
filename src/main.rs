use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;

use ndsift::chunk;
use ndsift::filter::{FilterCriterion, FilterSet, MatchMode};
use ndsift::parallel::ndjson::{EngineOptions, filter_file};

#[derive(Parser)]
#[command(
    name = "ndsift",
    about = "Chunked parallel predicate filter for newline-delimited JSON files",
    version
)]
struct Cli {
    /// Line-delimited JSON input file
    input: PathBuf,

    /// Output file for matching lines
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Field criterion "selector:kw1,kw2" — all keywords must hold.
    /// Keywords: substring, !negation, <op>number, =EMPTY, !=EMPTY
    #[arg(short = 'w', long = "where", value_name = "SPEC")]
    where_all: Vec<String>,

    /// Field criterion "selector:kw1,kw2" — any keyword may hold
    #[arg(long = "where-any", value_name = "SPEC")]
    where_any: Vec<String>,

    /// Raw-line criterion "kw1,kw2" — all keywords must hold
    #[arg(short = 'g', long = "grep", value_name = "TERMS")]
    grep_all: Vec<String>,

    /// Raw-line criterion "kw1,kw2" — any keyword may hold
    #[arg(long = "grep-any", value_name = "TERMS")]
    grep_any: Vec<String>,

    /// Combine criteria with OR instead of AND
    #[arg(long)]
    any: bool,

    /// Worker threads (default: all cores)
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Target chunk size in bytes
    #[arg(long = "chunk-size", value_name = "BYTES", default_value_t = chunk::DEFAULT_CHUNK_TARGET)]
    chunk_size: u64,

    /// Suppress the run summary on stderr
    #[arg(short = 'q', long)]
    quiet: bool,
}

/// Split a `selector:keywords` criterion spec at its first `:`.
fn parse_where(spec: &str, term_mode: MatchMode) -> Result<FilterCriterion> {
    let (selector, keywords) = spec.split_once(':').with_context(|| {
        format!("criterion {spec:?} is missing a ':' between selector and keywords")
    })?;
    let selector = selector.trim();
    if selector.is_empty() {
        bail!("criterion {spec:?} has an empty selector");
    }
    Ok(FilterCriterion::new(Some(selector), keywords, term_mode))
}

fn build_filter(cli: &Cli) -> Result<FilterSet> {
    let mut criteria = Vec::new();
    for spec in &cli.where_all {
        criteria.push(parse_where(spec, MatchMode::All)?);
    }
    for spec in &cli.where_any {
        criteria.push(parse_where(spec, MatchMode::Any)?);
    }
    for terms in &cli.grep_all {
        criteria.push(FilterCriterion::new(None, terms, MatchMode::All));
    }
    for terms in &cli.grep_any {
        criteria.push(FilterCriterion::new(None, terms, MatchMode::Any));
    }
    let criteria_mode = if cli.any { MatchMode::Any } else { MatchMode::All };
    Ok(FilterSet::new(criteria, criteria_mode))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = build_filter(&cli)?;

    let opts = EngineOptions {
        threads: cli.threads,
        chunk_target: cli.chunk_size.max(1),
    };
    let summary = filter_file(&cli.input, &cli.output, &filter, &opts)?;

    if !cli.quiet {
        eprintln!(
            "{} matched / {} lines in {:.2}s ({:.0} lines/s, {} chunks, {} parse failures)",
            summary.matched,
            summary.lines,
            summary.elapsed.as_secs_f64(),
            summary.lines_per_sec(),
            summary.chunks,
            summary.parse_errors,
        );
    }
    Ok(())
}
