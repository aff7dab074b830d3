//! Evaluator registry.
//!
//! Evaluators come in two shapes: ones bound to the primary evaluation agent
//! and agent-independent ones. The registry maps an evaluator type name to a
//! factory of the matching shape, so the runner can decide how to construct an
//! evaluator by asking the factory instead of trying one constructor and
//! falling back to the other.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::world::AgentId;

/// Constructor for one evaluator type.
pub enum EvaluatorFactory<E> {
    /// Evaluator constructed with the primary evaluation agent id.
    PerAgent(Arc<dyn Fn(AgentId) -> E + Send + Sync>),
    /// Evaluator constructed without arguments.
    Global(Arc<dyn Fn() -> E + Send + Sync>),
}

impl<E> EvaluatorFactory<E> {
    /// Factory for evaluators observing a single agent.
    pub fn per_agent(ctor: impl Fn(AgentId) -> E + Send + Sync + 'static) -> Self {
        Self::PerAgent(Arc::new(ctor))
    }

    /// Factory for agent-independent evaluators.
    pub fn global(ctor: impl Fn() -> E + Send + Sync + 'static) -> Self {
        Self::Global(Arc::new(ctor))
    }

    /// Returns true if the evaluator takes the primary agent id.
    pub fn accepts_agent_id(&self) -> bool {
        matches!(self, Self::PerAgent(_))
    }

    /// Builds an evaluator instance for an episode.
    pub fn build(&self, primary_agent_id: AgentId) -> E {
        match self {
            Self::PerAgent(ctor) => ctor(primary_agent_id),
            Self::Global(ctor) => ctor(),
        }
    }
}

impl<E> Clone for EvaluatorFactory<E> {
    fn clone(&self) -> Self {
        match self {
            Self::PerAgent(ctor) => Self::PerAgent(Arc::clone(ctor)),
            Self::Global(ctor) => Self::Global(Arc::clone(ctor)),
        }
    }
}

impl<E> fmt::Debug for EvaluatorFactory<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerAgent(_) => write!(f, "EvaluatorFactory::PerAgent"),
            Self::Global(_) => write!(f, "EvaluatorFactory::Global"),
        }
    }
}

/// One configured evaluator: the name its readings are reported under and
/// the registered type used to build it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatorSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub evaluator_type: String,
}

impl EvaluatorSpec {
    pub fn new(name: impl Into<String>, evaluator_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            evaluator_type: evaluator_type.into(),
        }
    }
}

/// An evaluator spec resolved against a registry.
#[derive(Debug, Clone)]
pub struct RegisteredEvaluator<E> {
    pub name: String,
    pub factory: EvaluatorFactory<E>,
}

/// Maps evaluator type names to factories.
pub struct EvaluatorRegistry<E> {
    factories: HashMap<String, EvaluatorFactory<E>>,
}

impl<E> EvaluatorRegistry<E> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers a factory under `evaluator_type`, replacing any previous one.
    pub fn register(&mut self, evaluator_type: impl Into<String>, factory: EvaluatorFactory<E>) {
        self.factories.insert(evaluator_type.into(), factory);
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with(mut self, evaluator_type: impl Into<String>, factory: EvaluatorFactory<E>) -> Self {
        self.register(evaluator_type, factory);
        self
    }

    /// Looks up the factory for a type name.
    pub fn get(&self, evaluator_type: &str) -> Option<&EvaluatorFactory<E>> {
        self.factories.get(evaluator_type)
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Resolves configured evaluators, preserving their order.
    ///
    /// Fails on unknown types and on duplicate evaluator names.
    pub fn resolve(&self, specs: &[EvaluatorSpec]) -> Result<Vec<RegisteredEvaluator<E>>, ConfigError> {
        let mut resolved: Vec<RegisteredEvaluator<E>> = Vec::with_capacity(specs.len());
        for spec in specs {
            if resolved.iter().any(|r| r.name == spec.name) {
                return Err(ConfigError::DuplicateEvaluator(spec.name.clone()));
            }
            let factory = self
                .get(&spec.evaluator_type)
                .ok_or_else(|| ConfigError::UnknownEvaluator {
                    name: spec.name.clone(),
                    evaluator_type: spec.evaluator_type.clone(),
                })?;
            resolved.push(RegisteredEvaluator {
                name: spec.name.clone(),
                factory: factory.clone(),
            });
        }
        Ok(resolved)
    }
}

impl<E> Default for EvaluatorRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestEvaluator {
        Collision(AgentId),
        StepCount,
    }

    fn registry() -> EvaluatorRegistry<TestEvaluator> {
        EvaluatorRegistry::new()
            .with(
                "EvaluatorCollisionEgoAgent",
                EvaluatorFactory::per_agent(TestEvaluator::Collision),
            )
            .with(
                "EvaluatorStepCount",
                EvaluatorFactory::global(|| TestEvaluator::StepCount),
            )
    }

    #[test]
    fn test_capability_probe_selects_constructor() {
        let registry = registry();
        let collision = registry.get("EvaluatorCollisionEgoAgent").unwrap();
        let steps = registry.get("EvaluatorStepCount").unwrap();

        assert!(collision.accepts_agent_id());
        assert!(!steps.accepts_agent_id());
        assert_eq!(collision.build(7), TestEvaluator::Collision(7));
        assert_eq!(steps.build(7), TestEvaluator::StepCount);
    }

    #[test]
    fn test_resolve_preserves_order() {
        let specs = vec![
            EvaluatorSpec::new("step_count", "EvaluatorStepCount"),
            EvaluatorSpec::new("collision", "EvaluatorCollisionEgoAgent"),
        ];
        let resolved = registry().resolve(&specs).unwrap();
        let names: Vec<_> = resolved.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["step_count", "collision"]);
    }

    #[test]
    fn test_resolve_unknown_type() {
        let specs = vec![EvaluatorSpec::new("rss", "EvaluatorRss")];
        let err = registry().resolve(&specs).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEvaluator { ref evaluator_type, .. } if evaluator_type == "EvaluatorRss"));
    }

    #[test]
    fn test_resolve_duplicate_name() {
        let specs = vec![
            EvaluatorSpec::new("collision", "EvaluatorCollisionEgoAgent"),
            EvaluatorSpec::new("collision", "EvaluatorStepCount"),
        ];
        assert!(matches!(
            registry().resolve(&specs),
            Err(ConfigError::DuplicateEvaluator(_))
        ));
    }

    #[test]
    fn test_spec_yaml_uses_type_key() {
        let spec: EvaluatorSpec =
            serde_yaml::from_str("name: collision\ntype: EvaluatorCollisionEgoAgent\n").unwrap();
        assert_eq!(spec, EvaluatorSpec::new("collision", "EvaluatorCollisionEgoAgent"));
    }
}
