//! Benchmark execution.
//!
//! # Architecture
//!
//! ```text
//! BenchmarkDatabase x BehaviorMap -> build_configurations -> BenchmarkRunner
//!     -> EpisodeExecutor (one per config) -> ResultRecord -> BenchmarkResult
//! ```
//!
//! The runner:
//! 1. Enumerates every (behavior, scenario) pair into an indexed config
//! 2. Runs each config as one episode on a fresh world
//! 3. Records why the episode stopped and the last evaluation
//! 4. Keeps going when a backend call fails, logging the failure
//!
//! # Example
//!
//! ```ignore
//! use scenario_bench::runner::{BenchmarkRunner, BehaviorMap, RunnerSettings};
//!
//! let settings = RunnerSettings::from_yaml_file("bench.yaml")?;
//! let mut runner = BenchmarkRunner::from_database(&database, &behaviors, settings, &registry)?;
//! let result = runner.run()?;
//!
//! let mut result = result.into_descriptors();
//! result.dump("highway.bench")?;
//! ```

pub mod benchmark_runner;
pub mod config;
pub mod executor;
pub mod matrix;
pub mod result;
pub mod settings;
pub mod summary;
pub mod table;

pub use benchmark_runner::BenchmarkRunner;
pub use config::{find_config, BenchmarkConfig, ConfigDescriptor, IndexedConfig, ScenarioConfig};
pub use executor::{CaughtException, EpisodeExecutor};
pub use matrix::{build_configurations, BehaviorMap};
pub use result::{
    display_value, BenchmarkResult, ResultRecord, BEHAVIOR, SCEN_IDX, SCEN_SET, STEP, TERMINAL,
};
pub use settings::{RunnerSettings, DEFAULT_LOGGER_NAME, DEFAULT_STEP_TIME};
pub use summary::{coerce_numeric, EvaluationSummary, GroupSummary};
pub use table::{column_names, records_to_record_batch};
