//! Benchmark results: per-episode records plus the configs that produced them.

use std::collections::BTreeMap;
use std::path::Path;

use arrow::record_batch::RecordBatch;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::error::{ConfigError, PersistenceError};
use crate::storage::{read_archive, write_archive};

use super::config::{find_config, BenchmarkConfig, ConfigDescriptor, IndexedConfig};
use super::summary::EvaluationSummary;
use super::table::records_to_record_batch;

/// Scenario set name of the episode.
pub const SCEN_SET: &str = "scen_set";
/// Scenario index of the episode inside its set.
pub const SCEN_IDX: &str = "scen_idx";
/// Number of completed steps.
pub const STEP: &str = "step";
/// Behavior name of the episode.
pub const BEHAVIOR: &str = "behavior";
/// Why the episode stopped.
pub const TERMINAL: &str = "Terminal";

/// Archive kind used for persisted results.
const RESULT_KIND: &str = "benchmark_result";

/// Flat record produced by one episode.
pub type ResultRecord = BTreeMap<String, Value>;

/// Records of a benchmark run together with its configuration list.
///
/// The tabular view is built on first access and cached. It is never
/// persisted; a loaded result rebuilds it on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult<C = ConfigDescriptor> {
    run_id: Uuid,
    result_dict: Vec<ResultRecord>,
    benchmark_configs: Option<Vec<C>>,
    #[serde(skip)]
    table: Option<RecordBatch>,
}

impl<C> BenchmarkResult<C> {
    /// Wraps records and, optionally, the configs they were produced from.
    pub fn new(result_dict: Vec<ResultRecord>, benchmark_configs: Option<Vec<C>>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            result_dict,
            benchmark_configs,
            table: None,
        }
    }

    /// Wraps records without configs.
    pub fn from_records(result_dict: Vec<ResultRecord>) -> Self {
        Self::new(result_dict, None)
    }

    /// Identifier assigned when the result was created.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Per-episode records in execution order.
    pub fn get_result_dict(&self) -> &[ResultRecord] {
        &self.result_dict
    }

    /// Configs of the run, if attached.
    pub fn get_benchmark_configs(&self) -> Option<&[C]> {
        self.benchmark_configs.as_deref()
    }

    /// Returns the tabular view of the records, building it on first access.
    ///
    /// Keys missing from a record become nulls in its row.
    pub fn get_data_frame(&mut self) -> Result<&RecordBatch, PersistenceError> {
        let table = match self.table.take() {
            Some(table) => table,
            None => records_to_record_batch(&self.result_dict)?,
        };
        Ok(self.table.insert(table))
    }

    /// Returns true if the tabular view is currently cached.
    pub fn has_cached_table(&self) -> bool {
        self.table.is_some()
    }

    /// Grouped means of `criteria` per (scenario set, behavior).
    pub fn summarize(&self, criteria: &[String]) -> EvaluationSummary {
        EvaluationSummary::from_records(&self.result_dict, criteria)
    }
}

impl<C: IndexedConfig> BenchmarkResult<C> {
    /// Returns the config with index `config_idx`.
    ///
    /// Configs are sorted by index on first lookup if they are out of order.
    pub fn get_benchmark_config(&mut self, config_idx: usize) -> Result<&C, ConfigError> {
        let configs = self.benchmark_configs.as_mut().ok_or(ConfigError::NoConfigs)?;
        find_config(configs, config_idx)
    }
}

impl<S, B> BenchmarkResult<BenchmarkConfig<S, B>> {
    /// Replaces full configs by their descriptors.
    ///
    /// Use this to persist results whose scenario or behavior types cannot be
    /// serialized.
    pub fn into_descriptors(self) -> BenchmarkResult<ConfigDescriptor> {
        BenchmarkResult {
            run_id: self.run_id,
            result_dict: self.result_dict,
            benchmark_configs: self
                .benchmark_configs
                .map(|configs| configs.iter().map(BenchmarkConfig::descriptor).collect()),
            table: self.table,
        }
    }
}

impl<C: Serialize> BenchmarkResult<C> {
    /// Saves the result to `path`, dropping the cached tabular view first.
    pub fn dump(&mut self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let path = path.as_ref();
        self.table = None;
        write_archive(path, RESULT_KIND, &*self)?;
        let shown = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        info!("Saved BenchmarkResult to {}", shown.display());
        Ok(())
    }
}

impl<C: DeserializeOwned> BenchmarkResult<C> {
    /// Loads a result saved with [`dump`](Self::dump).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        read_archive(path.as_ref(), RESULT_KIND)
    }
}

/// Renders a record field the way it appears in logs and tables.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
