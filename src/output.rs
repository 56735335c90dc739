//! Match sink: the single writer appending matched lines to the output file.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends matching lines as chunk results arrive, tracking the running
/// match count. Only the orchestrator thread holds a `MatchWriter`; workers
/// never touch the output file.
#[derive(Debug)]
pub struct MatchWriter {
    out: BufWriter<File>,
    path: PathBuf,
    written: u64,
}

impl MatchWriter {
    pub fn create(path: &Path) -> Result<MatchWriter> {
        let file = File::create(path)
            .with_context(|| format!("failed to create output file: {}", path.display()))?;
        Ok(MatchWriter {
            out: BufWriter::with_capacity(128 * 1024, file),
            path: path.to_path_buf(),
            written: 0,
        })
    }

    /// Append one chunk's matches, each followed by a newline. Lines arrive
    /// in file order within the chunk; chunks arrive in completion order.
    pub fn append(&mut self, lines: &[String]) -> Result<()> {
        for line in lines {
            self.out
                .write_all(line.as_bytes())
                .and_then(|()| self.out.write_all(b"\n"))
                .with_context(|| format!("failed to write output file: {}", self.path.display()))?;
        }
        self.written += lines.len() as u64;
        Ok(())
    }

    /// Matches written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and return the final match count.
    pub fn finish(mut self) -> Result<u64> {
        self.out
            .flush()
            .with_context(|| format!("failed to flush output file: {}", self.path.display()))?;
        Ok(self.written)
    }
}
