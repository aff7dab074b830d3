//! Benchmark database: named groups of scenarios.
//!
//! A [`BenchmarkDatabase`] is an ordered list of scenario generators, each
//! labelled with the name of its scenario set. Generators hand out scenarios
//! lazily together with their index inside the set.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PersistenceError, SimulationError};
use crate::storage::{read_archive, write_archive};

/// Archive kind used for persisted scenario sets.
const SCENARIO_SET_KIND: &str = "scenario_set";

/// Lazy sequence of `(scenario, scenario_idx)` pairs.
pub type ScenarioIter<'a, S> = Box<dyn Iterator<Item = Result<(S, usize), SimulationError>> + 'a>;

/// Source of scenarios for one scenario set.
pub trait ScenarioGenerator {
    type Scenario;

    /// Yields the scenarios of this set in order.
    fn scenarios(&self) -> ScenarioIter<'_, Self::Scenario>;

    /// Number of scenarios, if known up front.
    fn num_scenarios(&self) -> Option<usize> {
        None
    }
}

/// Ordered in-memory scenario set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSet<S> {
    scenarios: Vec<S>,
}

impl<S> ScenarioSet<S> {
    pub fn new(scenarios: Vec<S>) -> Self {
        Self { scenarios }
    }

    /// Returns the scenario at `idx`.
    pub fn get_scenario(&self, idx: usize) -> Option<&S> {
        self.scenarios.get(idx)
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

impl<S: Serialize> ScenarioSet<S> {
    /// Saves the scenario set to `path`.
    pub fn dump(&self, path: &Path) -> Result<(), PersistenceError> {
        write_archive(path, SCENARIO_SET_KIND, self)?;
        info!("Saved {} scenarios to {}", self.len(), path.display());
        Ok(())
    }
}

impl<S: DeserializeOwned> ScenarioSet<S> {
    /// Loads a scenario set saved with [`dump`](Self::dump).
    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        read_archive(path, SCENARIO_SET_KIND)
    }
}

impl<S> FromIterator<S> for ScenarioSet<S> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<S: Clone> ScenarioGenerator for ScenarioSet<S> {
    type Scenario = S;

    fn scenarios(&self) -> ScenarioIter<'_, S> {
        Box::new(
            self.scenarios
                .iter()
                .enumerate()
                .map(|(idx, scenario)| Ok((scenario.clone(), idx))),
        )
    }

    fn num_scenarios(&self) -> Option<usize> {
        Some(self.scenarios.len())
    }
}

/// One scenario generator and the name of the set it produces.
pub struct ScenarioSetEntry<S> {
    pub generator: Box<dyn ScenarioGenerator<Scenario = S>>,
    pub name: String,
}

/// Ordered collection of named scenario generators.
pub struct BenchmarkDatabase<S> {
    entries: Vec<ScenarioSetEntry<S>>,
}

impl<S> BenchmarkDatabase<S> {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a scenario generator under `name`.
    pub fn push(&mut self, generator: impl ScenarioGenerator<Scenario = S> + 'static, name: impl Into<String>) {
        self.entries.push(ScenarioSetEntry {
            generator: Box::new(generator),
            name: name.into(),
        });
    }

    /// Builder-style variant of [`push`](Self::push).
    pub fn with_set(mut self, generator: impl ScenarioGenerator<Scenario = S> + 'static, name: impl Into<String>) -> Self {
        self.push(generator, name);
        self
    }

    /// Keeps only the scenario sets whose name matches `predicate`.
    pub fn retain_sets(&mut self, mut predicate: impl FnMut(&str) -> bool) {
        self.entries.retain(|entry| predicate(&entry.name));
    }

    /// Names of the scenario sets, in database order.
    pub fn scenario_set_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScenarioSetEntry<S>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S> Default for BenchmarkDatabase<S> {
    fn default() -> Self {
        Self::new()
    }
}
