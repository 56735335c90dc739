//! Byte-range planning: partition the input file into line-aligned chunks.
//!
//! Every range other than the first starts immediately after a `\n`, so a
//! worker can seek to its start and read whole lines without coordinating
//! with its neighbors. Ranges are contiguous and cover the file exactly.

use anyhow::{Context, Result};
use memchr::memchr;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Target chunk size. Large enough to amortize per-chunk overhead, small
/// enough to bound a worker's match buffer.
pub const DEFAULT_CHUNK_TARGET: u64 = 64 * 1024 * 1024;

/// One contiguous, line-aligned byte span of the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Plan chunk ranges over `path`.
///
/// The chunk count is `max(min_chunks, ceil(file_size / target_bytes))`:
/// at least one chunk per worker, more when the file is large enough that
/// one chunk per worker would blow past the target size. Naive equal-span
/// boundaries are advanced to the next line start; boundaries that collapse
/// onto the same line start produce empty ranges, which are dropped.
pub fn plan_chunks(path: &Path, min_chunks: usize, target_bytes: u64) -> Result<Vec<ChunkRange>> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open input file: {}", path.display()))?;
    let file_size = file
        .metadata()
        .with_context(|| format!("failed to stat input file: {}", path.display()))?
        .len();
    if file_size == 0 {
        return Ok(Vec::new());
    }

    let min_chunks = min_chunks.max(1) as u64;
    let num_chunks = min_chunks.max(file_size.div_ceil(target_bytes.max(1)));
    let span = (file_size / num_chunks).max(1);

    let mut starts = vec![0u64];
    for i in 1..num_chunks {
        let naive = i * span;
        if naive >= file_size {
            break;
        }
        starts.push(next_line_start(&mut file, naive, file_size)?);
    }

    let mut ranges = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(file_size);
        let range = ChunkRange { start, end };
        if !range.is_empty() {
            ranges.push(range);
        }
    }
    Ok(ranges)
}

/// Find the first line start at or after `naive`.
///
/// Scans from `naive - 1`: if the byte just before the boundary is already a
/// `\n`, the boundary is a line start and stays put; otherwise the boundary
/// sits mid-line and moves past that line's terminator. Returns `file_size`
/// when no further newline exists (the tail line belongs to the previous
/// chunk).
fn next_line_start(file: &mut File, naive: u64, file_size: u64) -> Result<u64> {
    debug_assert!(naive >= 1);
    let mut pos = naive - 1;
    file.seek(SeekFrom::Start(pos))
        .with_context(|| format!("failed to seek to byte {pos}"))?;

    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("failed to read at byte {pos}"))?;
        if n == 0 {
            return Ok(file_size);
        }
        if let Some(idx) = memchr(b'\n', &buf[..n]) {
            return Ok(pos + idx as u64 + 1);
        }
        pos += n as u64;
    }
}
