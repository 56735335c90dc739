//! Parallel NDJSON filtering.
//!
//! Fans line-aligned chunk ranges out across a rayon worker pool. Each
//! worker opens its own handle on the input file, seeks to its range, and
//! evaluates the shared read-only [`FilterSet`] line by line. Finished
//! chunks flow back over a channel in completion order and are appended to
//! the output by the single orchestrator thread — workers share no mutable
//! state, so no lock is needed anywhere.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::chunk::{self, ChunkRange};
use crate::filter::{FilterSet, eval};
use crate::flatten;
use crate::output::MatchWriter;

/// Read buffer per worker. Lines longer than this still work; they just
/// cost extra reads.
const READER_CAPACITY: usize = 256 * 1024;

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Worker pool size; `None` uses the global rayon pool (all cores).
    pub threads: Option<usize>,
    /// Target chunk size in bytes.
    pub chunk_target: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            threads: None,
            chunk_target: chunk::DEFAULT_CHUNK_TARGET,
        }
    }
}

/// Counters accumulated per chunk and merged by the orchestrator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkStats {
    /// Non-blank lines seen.
    pub lines: u64,
    /// Lines that failed JSON parsing (excluded from matches, not fatal).
    pub parse_errors: u64,
}

/// One worker's result: matching lines in file order plus its counters.
struct ChunkOutcome {
    matches: Vec<String>,
    stats: ChunkStats,
}

/// What a finished run looked like. Informational; the functional output is
/// the file itself.
#[derive(Debug)]
pub struct RunSummary {
    pub matched: u64,
    pub lines: u64,
    pub parse_errors: u64,
    pub chunks: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn lines_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { self.lines as f64 / secs } else { 0.0 }
    }
}

/// Filter `input` into `output`, returning the run summary.
///
/// Chunk ranges are planned once up front; the orchestrator then drains the
/// result channel, writing each chunk's matches as it completes. Output is
/// chunk-grouped: line order is preserved within a chunk but chunks may
/// interleave across runs. A worker I/O error aborts the run — the output
/// file is left partial and the error is surfaced, never silently treated
/// as complete.
pub fn filter_file(
    input: &Path,
    output: &Path,
    filter: &FilterSet,
    opts: &EngineOptions,
) -> Result<RunSummary> {
    let started = Instant::now();

    let pool = match opts.threads {
        Some(n) => Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .context("failed to build worker pool")?,
        ),
        None => None,
    };
    let workers = opts.threads.unwrap_or_else(rayon::current_num_threads);

    let ranges = chunk::plan_chunks(input, workers, opts.chunk_target)?;
    let chunks = ranges.len();
    let mut writer = MatchWriter::create(output)?;

    let mut lines = 0u64;
    let mut parse_errors = 0u64;

    let drained: Result<()> = std::thread::scope(|scope| {
        let (tx, rx) = mpsc::channel::<Result<ChunkOutcome>>();
        let ranges = &ranges;
        let pool = pool.as_ref();

        scope.spawn(move || {
            let fan_out = || {
                ranges.par_iter().for_each_with(tx, |tx, range| {
                    // A send failure means the orchestrator already bailed;
                    // nothing left to do with this chunk's result.
                    let _ = tx.send(process_range(input, *range, filter));
                });
            };
            match pool {
                Some(p) => p.install(fan_out),
                None => fan_out(),
            }
        });

        for outcome in rx {
            let outcome = outcome?;
            lines += outcome.stats.lines;
            parse_errors += outcome.stats.parse_errors;
            writer.append(&outcome.matches)?;
        }
        Ok(())
    });
    drained.with_context(|| {
        format!(
            "run aborted after {} matches from {} lines",
            writer.written(),
            lines
        )
    })?;

    let matched = writer.finish()?;
    Ok(RunSummary {
        matched,
        lines,
        parse_errors,
        chunks,
        elapsed: started.elapsed(),
    })
}

/// Evaluate the filter over one chunk range.
///
/// Reads with `read_until` so the tracked offset is byte-accurate; stops
/// once the offset reaches `range.end`, which the chunk planner guarantees
/// is a line start (or EOF).
fn process_range(path: &Path, range: ChunkRange, filter: &FilterSet) -> Result<ChunkOutcome> {
    let file = File::open(path)
        .with_context(|| format!("failed to open input file: {}", path.display()))?;
    let mut reader = BufReader::with_capacity(READER_CAPACITY, file);
    reader
        .seek(SeekFrom::Start(range.start))
        .with_context(|| format!("failed to seek to byte {} in {}", range.start, path.display()))?;

    let mut matches = Vec::new();
    let mut stats = ChunkStats::default();
    let mut offset = range.start;
    let mut buf: Vec<u8> = Vec::with_capacity(4 * 1024);

    while offset < range.end {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("failed to read at byte {} in {}", offset, path.display()))?;
        if n == 0 {
            break;
        }
        offset += n as u64;

        let line = trim_line_ending(&buf);
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        stats.lines += 1;

        let parsed: serde_json::Value = match serde_json::from_slice(line) {
            Ok(v) => v,
            Err(_) => {
                stats.parse_errors += 1;
                continue;
            }
        };

        // A successfully parsed line is valid UTF-8, so this is lossless.
        let raw = String::from_utf8_lossy(line);
        let flat = flatten::flatten(&parsed);
        if eval::evaluate(filter, &raw, &flat) {
            matches.push(raw.into_owned());
        }
    }

    Ok(ChunkOutcome { matches, stats })
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}
