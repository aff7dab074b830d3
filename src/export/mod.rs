//! Export module for benchmark results.
//!
//! Writes the tabular view of a result as Parquet or JSON lines.

pub mod parquet_writer;

pub use parquet_writer::{read_parquet, write_json_lines, write_parquet, write_parquet_bytes};
