//! scenario-bench: scenario-based benchmark execution for behavior models.
//!
//! Builds the cross product of behaviors and scenario sets, runs each
//! configuration as one simulated episode, and collects one flat record per
//! episode into a persistable, tabular result.

pub mod cli;
pub mod database;
pub mod error;
pub mod evaluation;
pub mod export;
pub mod params;
pub mod runner;
pub mod storage;
pub mod world;

// Re-export commonly used types
pub use database::{BenchmarkDatabase, ScenarioGenerator, ScenarioSet};
pub use error::{ConfigError, PersistenceError, SimulationError};
pub use evaluation::{EvaluatorFactory, EvaluatorRegistry, TerminalConditions, TerminalCriterion};
pub use params::ParameterServer;
pub use runner::{
    BehaviorMap, BenchmarkConfig, BenchmarkResult, BenchmarkRunner, ConfigDescriptor,
    RunnerSettings,
};
pub use world::{AgentId, EvaluationMap, Scenario, Viewer, World};
