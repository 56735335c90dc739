//! Chunked parallel predicate filtering for newline-delimited JSON.
//!
//! The pipeline: [`chunk`] plans line-aligned byte ranges over the input
//! file, [`parallel::ndjson`] evaluates a shared [`filter::FilterSet`]
//! against each range on a worker pool (flattening records via [`flatten`]),
//! and [`output`] appends matching raw lines as chunks complete.

pub mod chunk;
pub mod filter;
pub mod flatten;
pub mod output;
pub mod parallel;
