//! Configuration matrix builder.
//!
//! Expands `behaviors × scenario sets` into an ordered list of
//! [`BenchmarkConfig`]s:
//!
//! ```text
//! for behavior in behaviors            (insertion order)
//!   for (generator, set) in database   (database order)
//!     for (scenario, idx) in generator (generator order, capped per set)
//!       -> BenchmarkConfig { config_idx: position, .. }
//! ```

use tracing::debug;

use crate::database::BenchmarkDatabase;
use crate::error::ConfigError;

use super::config::BenchmarkConfig;

/// Insertion-ordered mapping from behavior name to behavior object.
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorMap<B> {
    entries: Vec<(String, B)>,
}

impl<B> BehaviorMap<B> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts a behavior. An existing entry with the same name is replaced in place.
    pub fn insert(&mut self, name: impl Into<String>, behavior: B) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = behavior,
            None => self.entries.push((name, behavior)),
        }
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, behavior: B) -> Self {
        self.insert(name, behavior);
        self
    }

    pub fn get(&self, name: &str) -> Option<&B> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, behavior)| behavior)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &B)> {
        self.entries.iter().map(|(n, b)| (n.as_str(), b))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<B> Default for BehaviorMap<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B, N: Into<String>> FromIterator<(N, B)> for BehaviorMap<B> {
    fn from_iter<I: IntoIterator<Item = (N, B)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, behavior) in iter {
            map.insert(name, behavior);
        }
        map
    }
}

/// Builds the ordered configuration matrix.
///
/// `num_scenarios` caps each generator separately: a generator stops being
/// consumed once it yields a scenario index at or above the cap, and
/// enumeration continues with the next set.
pub fn build_configurations<S, B: Clone>(
    database: &BenchmarkDatabase<S>,
    behaviors: &BehaviorMap<B>,
    num_scenarios: Option<usize>,
) -> Result<Vec<BenchmarkConfig<S, B>>, ConfigError> {
    let known_per_behavior: usize = database
        .iter()
        .filter_map(|entry| entry.generator.num_scenarios())
        .map(|len| num_scenarios.map_or(len, |cap| len.min(cap)))
        .sum();
    let mut configs = Vec::with_capacity(known_per_behavior * behaviors.len());

    for (behavior_name, behavior) in behaviors.iter() {
        for entry in database.iter() {
            for item in entry.generator.scenarios() {
                let (scenario, scenario_idx) = item.map_err(|source| ConfigError::ScenarioGeneration {
                    set: entry.name.clone(),
                    source,
                })?;
                if num_scenarios.is_some_and(|cap| scenario_idx >= cap) {
                    break;
                }
                configs.push(BenchmarkConfig::new(
                    configs.len(),
                    behavior.clone(),
                    behavior_name,
                    scenario,
                    scenario_idx,
                    entry.name.as_str(),
                ));
            }
        }
    }

    debug!(
        "Built {} benchmark configs from {} behaviors and {} scenario sets",
        configs.len(),
        behaviors.len(),
        database.len()
    );
    Ok(configs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ScenarioGenerator, ScenarioIter, ScenarioSet};
    use crate::error::SimulationError;

    fn database() -> BenchmarkDatabase<String> {
        BenchmarkDatabase::new()
            .with_set(
                ScenarioSet::new(vec!["h0".to_string(), "h1".to_string(), "h2".to_string()]),
                "highway",
            )
            .with_set(
                ScenarioSet::new(vec!["m0".to_string(), "m1".to_string()]),
                "merging",
            )
    }

    #[test]
    fn test_cross_product_size_and_order() {
        let behaviors = BehaviorMap::new().with("idm", 1u8).with("const_vel", 2u8);
        let configs = build_configurations(&database(), &behaviors, None).unwrap();

        assert_eq!(configs.len(), 2 * 5);
        for (position, config) in configs.iter().enumerate() {
            assert_eq!(config.config_idx, position);
        }

        let order: Vec<_> = configs
            .iter()
            .map(|c| (c.behavior_name.as_str(), c.scenario_set_name.as_str(), c.scenario_idx))
            .collect();
        assert_eq!(
            order[..5],
            [
                ("idm", "highway", 0),
                ("idm", "highway", 1),
                ("idm", "highway", 2),
                ("idm", "merging", 0),
                ("idm", "merging", 1),
            ]
        );
        assert_eq!(order[5], ("const_vel", "highway", 0));
        assert_eq!(configs[9].scenario, "m1");
    }

    #[test]
    fn test_cap_is_per_generator() {
        let behaviors = BehaviorMap::new().with("idm", ());
        let configs = build_configurations(&database(), &behaviors, Some(2)).unwrap();

        let picked: Vec<_> = configs.iter().map(|c| c.scenario.as_str()).collect();
        assert_eq!(picked, vec!["h0", "h1", "m0", "m1"]);
    }

    #[test]
    fn test_empty_behavior_map() {
        let behaviors: BehaviorMap<()> = BehaviorMap::new();
        assert!(build_configurations(&database(), &behaviors, None)
            .unwrap()
            .is_empty());
    }

    struct FailingGenerator;

    impl ScenarioGenerator for FailingGenerator {
        type Scenario = String;

        fn scenarios(&self) -> ScenarioIter<'_, String> {
            Box::new(
                vec![
                    Ok(("ok".to_string(), 0)),
                    Err(SimulationError::ScenarioGeneration("corrupt track file".into())),
                ]
                .into_iter(),
            )
        }
    }

    #[test]
    fn test_generator_error_propagates() {
        let db = BenchmarkDatabase::new().with_set(FailingGenerator, "recorded");
        let behaviors = BehaviorMap::new().with("idm", ());
        let err = build_configurations(&db, &behaviors, None).unwrap_err();
        assert!(matches!(err, ConfigError::ScenarioGeneration { ref set, .. } if set == "recorded"));
    }

    #[test]
    fn test_behavior_map_replaces_in_place() {
        let map = BehaviorMap::new().with("a", 1).with("b", 2).with("a", 3);
        let entries: Vec<_> = map.iter().map(|(n, b)| (n, *b)).collect();
        assert_eq!(entries, vec![("a", 3), ("b", 2)]);
    }
}
