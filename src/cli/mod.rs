//! Command-line interface for scenario-bench.
//!
//! Provides commands to inspect, show and export saved benchmark results.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli, Commands};
