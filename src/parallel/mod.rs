//! Parallel execution of the filter across chunk ranges.

pub mod ndjson;
