//! Error types for scenario-bench operations.
//!
//! Defines the error types for the three concerns the runner separates:
//! - Faults raised by the simulation backend during an episode
//! - Configuration, matrix construction and lookup errors
//! - Persistence and export of benchmark results

use thiserror::Error;

use crate::world::AgentId;

/// Faults raised by the simulation backend.
///
/// These are caught at episode granularity by the runner and turned into
/// result records; they never abort a batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("World construction failed: {0}")]
    WorldConstruction(String),

    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    #[error("World step failed: {0}")]
    Step(String),

    #[error("Scenario defines no evaluation agent")]
    NoEvalAgent,

    #[error("Agent {0} not found in world")]
    AgentNotFound(AgentId),

    #[error("Simulation backend panicked: {0}")]
    Panicked(String),

    #[error("Scenario generation failed: {0}")]
    ScenarioGeneration(String),
}

/// Errors caused by runner configuration or matrix construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Terminal criterion '{0}' has no entry in the evaluation dictionary")]
    MissingTerminalKey(String),

    #[error("Unknown evaluator type '{evaluator_type}' for evaluator '{name}'")]
    UnknownEvaluator { name: String, evaluator_type: String },

    #[error("Duplicate evaluator name '{0}'")]
    DuplicateEvaluator(String),

    #[error("Scenario set '{set}' failed to produce scenarios: {source}")]
    ScenarioGeneration {
        set: String,
        #[source]
        source: SimulationError,
    },

    #[error("No benchmark configs available")]
    NoConfigs,

    #[error("Benchmark config {0} not found")]
    ConfigNotFound(usize),

    #[error("Benchmark config at position {position} has index {found}, configs are not densely indexed")]
    IndexMismatch { position: usize, found: usize },

    #[error("Invalid runner settings: {0}")]
    InvalidSettings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors that can occur while persisting or exporting results.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Unsupported result format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Archive holds a '{found}' payload, expected '{expected}'")]
    WrongKind { expected: String, found: String },

    #[error("Malformed archive header: {0}")]
    MalformedHeader(String),

    #[error("No records to export")]
    NoRecords,

    #[error("Tabular view error: {0}")]
    Table(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
