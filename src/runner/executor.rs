//! Episode executor - runs one benchmark config to completion.

use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{ConfigError, SimulationError};
use crate::evaluation::{RegisteredEvaluator, TerminalConditions, TerminalReason};
use crate::params::ParameterServer;
use crate::world::{AgentId, EvaluationMap, EvaluatorOf, Scenario, Viewer, World};

use super::config::{BenchmarkConfig, ConfigDescriptor, ScenarioConfig};
use super::result::{ResultRecord, BEHAVIOR, SCEN_IDX, SCEN_SET, STEP, TERMINAL};

/// A backend failure caught during an episode.
#[derive(Debug, Clone, PartialEq)]
pub struct CaughtException {
    pub config_idx: usize,
    pub error: SimulationError,
}

/// Runs single episodes on behalf of a runner.
///
/// The executor borrows the runner's evaluator list, terminal rules and
/// exception log for as long as it lives.
pub struct EpisodeExecutor<'a, S: Scenario> {
    evaluators: &'a [RegisteredEvaluator<EvaluatorOf<S>>],
    terminal_conditions: &'a TerminalConditions,
    exceptions: &'a mut Vec<CaughtException>,
    default_step_time: f64,
    max_steps: Option<usize>,
}

impl<'a, S: Scenario> EpisodeExecutor<'a, S> {
    pub fn new(
        evaluators: &'a [RegisteredEvaluator<EvaluatorOf<S>>],
        terminal_conditions: &'a TerminalConditions,
        exceptions: &'a mut Vec<CaughtException>,
    ) -> Self {
        Self {
            evaluators,
            terminal_conditions,
            exceptions,
            default_step_time: super::settings::DEFAULT_STEP_TIME,
            max_steps: None,
        }
    }

    /// Sets the step duration used when the scenario does not define one.
    pub fn with_default_step_time(mut self, step_time: f64) -> Self {
        self.default_step_time = step_time;
        self
    }

    /// Sets the step ceiling.
    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Runs `config` until a terminal condition fires, a backend call fails
    /// or the step ceiling is reached.
    ///
    /// Backend failures end up in the record and the exception log. Only a
    /// terminal rule naming a missing evaluation key is returned as an error.
    pub fn execute(
        &mut self,
        config: ScenarioConfig<S>,
        mut viewer: Option<&mut dyn Viewer<S::World>>,
    ) -> Result<ResultRecord, ConfigError> {
        let descriptor = config.descriptor();
        let primary_agent_id = config.primary_agent_id();
        let BenchmarkConfig {
            behavior, scenario, ..
        } = config;
        let step_time = self.step_time(&descriptor, scenario.json_params());

        let mut world = match guarded(|| scenario.get_world_state()) {
            Ok(world) => world,
            Err(e) => {
                error!(
                    "For config-idx {}, exception thrown in scenario.get_world_state: {}",
                    descriptor.config_idx, e
                );
                self.append_exception(descriptor.config_idx, e);
                return Ok(episode_record(
                    &descriptor,
                    0,
                    EvaluationMap::new(),
                    &TerminalReason::ExceptionRaised,
                ));
            }
        };

        let primary_agent_id = match install_behavior(&mut world, primary_agent_id, behavior) {
            Ok(agent_id) => agent_id,
            Err(e) => {
                error!(
                    "For config-idx {}, could not install behavior \"{}\": {}",
                    descriptor.config_idx, descriptor.behavior_name, e
                );
                self.append_exception(descriptor.config_idx, e);
                return Ok(episode_record(
                    &descriptor,
                    0,
                    EvaluationMap::new(),
                    &TerminalReason::ExceptionRaised,
                ));
            }
        };
        self.reset_evaluators(&mut world, primary_agent_id);

        let mut step = 0usize;
        let mut evaluation = EvaluationMap::new();
        let reason = loop {
            match guarded(|| world.evaluate()) {
                Ok(latest) => evaluation = latest,
                Err(e) => {
                    error!(
                        "For config-idx {}, exception thrown in world.evaluate: {}",
                        descriptor.config_idx, e
                    );
                    self.append_exception(descriptor.config_idx, e);
                    evaluation.clear();
                    break TerminalReason::ExceptionRaised;
                }
            }
            let check = self.terminal_conditions.check(&evaluation)?;

            if let Some(viewer) = viewer.as_deref_mut() {
                viewer.draw_world(&world, scenario.eval_agent_ids(), descriptor.scenario_idx);
                viewer.show();
                if let Ok(pause) = Duration::try_from_secs_f64(step_time) {
                    thread::sleep(pause);
                }
                viewer.clear();
            }

            if let Err(e) = guarded(|| world.step(step_time)) {
                error!(
                    "For config-idx {}, exception thrown in world.step: {}",
                    descriptor.config_idx, e
                );
                self.append_exception(descriptor.config_idx, e);
                break TerminalReason::ExceptionRaised;
            }
            step += 1;

            if check.terminal {
                break TerminalReason::Criteria(check.reasons);
            }
            if self.max_steps.is_some_and(|max| step >= max) {
                warn!(
                    "For config-idx {}, no terminal condition after {} steps",
                    descriptor.config_idx, step
                );
                break TerminalReason::MaxStepsExceeded;
            }
        };

        debug!(
            "Config-idx {} finished after {} steps: {}",
            descriptor.config_idx, step, reason
        );
        Ok(episode_record(&descriptor, step, evaluation, &reason))
    }

    /// Step duration from the scenario's `Simulation.StepTime`.
    ///
    /// Values that are not a positive, representable duration are replaced
    /// by the default.
    fn step_time(&self, descriptor: &ConfigDescriptor, scenario_params: &Value) -> f64 {
        let mut params = ParameterServer::from_json(scenario_params);
        let step_time = params.get_f64(
            &["Simulation", "StepTime"],
            "Duration of one simulation step in seconds",
            self.default_step_time,
        );
        if step_time > 0.0 && Duration::try_from_secs_f64(step_time).is_ok() {
            return step_time;
        }
        warn!(
            "For config-idx {}, invalid Simulation.StepTime {}, using {}",
            descriptor.config_idx, step_time, self.default_step_time
        );
        self.default_step_time
    }

    fn reset_evaluators(&self, world: &mut S::World, primary_agent_id: AgentId) {
        for evaluator in self.evaluators {
            debug!(
                "Attaching evaluator {} ({})",
                evaluator.name,
                if evaluator.factory.accepts_agent_id() {
                    "per agent"
                } else {
                    "global"
                }
            );
            world.add_evaluator(&evaluator.name, evaluator.factory.build(primary_agent_id));
        }
    }

    fn append_exception(&mut self, config_idx: usize, error: SimulationError) {
        self.exceptions.push(CaughtException { config_idx, error });
    }
}

/// Installs `behavior` into the primary evaluation agent and returns its id.
fn install_behavior<W: World>(
    world: &mut W,
    primary_agent_id: Option<AgentId>,
    behavior: W::Behavior,
) -> Result<AgentId, SimulationError> {
    let agent_id = primary_agent_id.ok_or(SimulationError::NoEvalAgent)?;
    let slot = world
        .behavior_model_mut(agent_id)
        .ok_or(SimulationError::AgentNotFound(agent_id))?;
    *slot = behavior;
    Ok(agent_id)
}

/// Runs a backend call, turning a panic into a [`SimulationError`].
fn guarded<T>(call: impl FnOnce() -> Result<T, SimulationError>) -> Result<T, SimulationError> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            Err(SimulationError::Panicked(message))
        }
    }
}

/// Flat record for a finished episode.
///
/// Evaluation keys overwrite the identity keys they collide with; the
/// terminal reason is written last.
fn episode_record(
    config: &ConfigDescriptor,
    step: usize,
    evaluation: EvaluationMap,
    reason: &TerminalReason,
) -> ResultRecord {
    let mut record = ResultRecord::new();
    record.insert(SCEN_SET.to_string(), Value::from(config.scenario_set_name.clone()));
    record.insert(SCEN_IDX.to_string(), Value::from(config.scenario_idx));
    record.insert(STEP.to_string(), Value::from(step));
    record.insert(BEHAVIOR.to_string(), Value::from(config.behavior_name.clone()));
    record.extend(evaluation);
    record.insert(TERMINAL.to_string(), reason.to_value());
    record
}
