//! Benchmark configurations: one (behavior, scenario) pairing each.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::world::{BehaviorOf, Scenario};

/// A single entry of the benchmark matrix.
///
/// `config_idx` is assigned once by the matrix builder and is the only stable
/// handle to a configuration. Configs are cloned before execution, so the
/// executor may mutate behavior and scenario freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig<S, B> {
    pub config_idx: usize,
    pub behavior: B,
    pub behavior_name: String,
    pub scenario: S,
    pub scenario_idx: usize,
    pub scenario_set_name: String,
}

/// Config type used by a runner over scenarios of type `S`.
pub type ScenarioConfig<S> = BenchmarkConfig<S, BehaviorOf<S>>;

impl<S, B> BenchmarkConfig<S, B> {
    pub fn new(
        config_idx: usize,
        behavior: B,
        behavior_name: impl Into<String>,
        scenario: S,
        scenario_idx: usize,
        scenario_set_name: impl Into<String>,
    ) -> Self {
        Self {
            config_idx,
            behavior,
            behavior_name: behavior_name.into(),
            scenario,
            scenario_idx,
            scenario_set_name: scenario_set_name.into(),
        }
    }

    /// Identity of this config without the behavior and scenario payloads.
    pub fn descriptor(&self) -> ConfigDescriptor {
        ConfigDescriptor {
            config_idx: self.config_idx,
            behavior_name: self.behavior_name.clone(),
            scenario_idx: self.scenario_idx,
            scenario_set_name: self.scenario_set_name.clone(),
        }
    }
}

impl<S: Scenario, B> BenchmarkConfig<S, B> {
    /// Primary evaluation agent of the scenario.
    pub fn primary_agent_id(&self) -> Option<crate::world::AgentId> {
        self.scenario.eval_agent_ids().first().copied()
    }
}

/// Serializable identity of a benchmark config.
///
/// A persisted [`BenchmarkConfig`] deserializes into a descriptor as well,
/// since the behavior and scenario fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigDescriptor {
    pub config_idx: usize,
    pub behavior_name: String,
    pub scenario_idx: usize,
    pub scenario_set_name: String,
}

/// Anything that carries a matrix index.
pub trait IndexedConfig {
    fn config_idx(&self) -> usize;
}

impl<S, B> IndexedConfig for BenchmarkConfig<S, B> {
    fn config_idx(&self) -> usize {
        self.config_idx
    }
}

impl IndexedConfig for ConfigDescriptor {
    fn config_idx(&self) -> usize {
        self.config_idx
    }
}

/// Looks up the config with index `config_idx`.
///
/// Sorts `configs` by index first if they are out of order. Since indices are
/// dense, the config sits at position `config_idx` after sorting; anything
/// else means the list was not produced by the matrix builder.
pub fn find_config<C: IndexedConfig>(configs: &mut [C], config_idx: usize) -> Result<&C, ConfigError> {
    let sorted = configs
        .windows(2)
        .all(|w| w[0].config_idx() <= w[1].config_idx());
    if !sorted {
        configs.sort_by_key(|c| c.config_idx());
    }

    let config = configs
        .get(config_idx)
        .ok_or(ConfigError::ConfigNotFound(config_idx))?;
    if config.config_idx() != config_idx {
        return Err(ConfigError::IndexMismatch {
            position: config_idx,
            found: config.config_idx(),
        });
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(idx: usize) -> ConfigDescriptor {
        ConfigDescriptor {
            config_idx: idx,
            behavior_name: "idm".to_string(),
            scenario_idx: idx,
            scenario_set_name: "highway".to_string(),
        }
    }

    #[test]
    fn test_find_config_sorts_out_of_order_list() {
        let mut configs = vec![descriptor(2), descriptor(0), descriptor(1)];
        for idx in 0..3 {
            assert_eq!(find_config(&mut configs, idx).unwrap().config_idx, idx);
        }
        let order: Vec<_> = configs.iter().map(|c| c.config_idx).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_find_config_out_of_range() {
        let mut configs = vec![descriptor(0)];
        assert!(matches!(
            find_config(&mut configs, 4),
            Err(ConfigError::ConfigNotFound(4))
        ));
    }

    #[test]
    fn test_find_config_detects_gaps() {
        let mut configs = vec![descriptor(0), descriptor(2)];
        assert!(matches!(
            find_config(&mut configs, 1),
            Err(ConfigError::IndexMismatch { position: 1, found: 2 })
        ));
    }

    #[test]
    fn test_descriptor_from_persisted_config() {
        let config = BenchmarkConfig::new(3, vec![1.5, 2.0], "const_vel", "scenario-a".to_string(), 1, "merging");
        let json = serde_json::to_value(&config).unwrap();
        let descriptor: ConfigDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(descriptor, config.descriptor());
    }
}
