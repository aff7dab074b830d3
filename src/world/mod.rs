//! Collaborator contracts consumed by the benchmark runner.
//!
//! The simulation itself (world stepping, maps, agent dynamics, safety
//! evaluators, rendering) lives outside this crate. The runner only talks to
//! it through the narrow traits defined here:
//!
//! ```text
//! Scenario ──get_world_state()──▶ World ──step()/evaluate()──▶ EvaluationMap
//!                                   ▲
//!                    behavior slot + named evaluators installed per episode
//! ```

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::SimulationError;

/// Identifier of an agent inside a world.
pub type AgentId = u64;

/// Per-evaluator readings of the current world state, keyed by evaluator name.
pub type EvaluationMap = BTreeMap<String, Value>;

/// Behavior model type accepted by the world of scenario `S`.
pub type BehaviorOf<S> = <<S as Scenario>::World as World>::Behavior;

/// Evaluator type accepted by the world of scenario `S`.
pub type EvaluatorOf<S> = <<S as Scenario>::World as World>::Evaluator;

/// A simulated world instance, owned by a single episode.
pub trait World {
    /// Policy object that can be installed into an agent.
    type Behavior;
    /// Evaluator object that can be attached to the world.
    type Evaluator;

    /// Advances simulated time by `delta_time` seconds.
    fn step(&mut self, delta_time: f64) -> Result<(), SimulationError>;

    /// Computes the current readings of all attached evaluators.
    fn evaluate(&mut self) -> Result<EvaluationMap, SimulationError>;

    /// Mutable behavior slot of the agent with the given id.
    fn behavior_model_mut(&mut self, agent_id: AgentId) -> Option<&mut Self::Behavior>;

    /// Attaches an evaluator under `name`, replacing any previous one.
    fn add_evaluator(&mut self, name: &str, evaluator: Self::Evaluator);
}

/// A scenario able to produce a fresh world for each episode.
///
/// Concrete scenario sources (recorded tracks, generated scenarios) are
/// variants behind this trait.
pub trait Scenario {
    type World: World;

    /// Builds a fresh world state for this scenario.
    fn get_world_state(&self) -> Result<Self::World, SimulationError>;

    /// Ids of the agents under evaluation. The first one is the primary agent.
    fn eval_agent_ids(&self) -> &[AgentId];

    /// Parameter payload stored with the scenario.
    fn json_params(&self) -> &Value;
}

/// Live renderer used when re-running a single configuration interactively.
pub trait Viewer<W> {
    fn draw_world(&mut self, world: &W, eval_agent_ids: &[AgentId], scenario_idx: usize);

    fn show(&mut self);

    fn clear(&mut self);
}
