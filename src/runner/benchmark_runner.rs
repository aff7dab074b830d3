//! Batch runner over the benchmark matrix.

use tracing::{info, info_span, Span};

use crate::database::BenchmarkDatabase;
use crate::error::ConfigError;
use crate::evaluation::{EvaluatorRegistry, RegisteredEvaluator};
use crate::world::{BehaviorOf, EvaluatorOf, Scenario, Viewer};

use super::config::{find_config, ScenarioConfig};
use super::executor::{CaughtException, EpisodeExecutor};
use super::matrix::{build_configurations, BehaviorMap};
use super::result::{BenchmarkResult, ResultRecord};
use super::settings::RunnerSettings;
use super::summary::EvaluationSummary;

const SUMMARY_RULE: &str =
    "---------------------------------------------------------------------";

/// Runs every (behavior, scenario) configuration and collects one record per
/// episode.
///
/// Backend failures inside an episode are logged, kept in
/// [`exceptions_caught`](Self::exceptions_caught) and never abort the batch.
pub struct BenchmarkRunner<S: Scenario> {
    benchmark_configs: Vec<ScenarioConfig<S>>,
    evaluators: Vec<RegisteredEvaluator<EvaluatorOf<S>>>,
    settings: RunnerSettings,
    exceptions_caught: Vec<CaughtException>,
    span: Span,
}

impl<S> BenchmarkRunner<S>
where
    S: Scenario + Clone,
    BehaviorOf<S>: Clone,
{
    /// Creates a runner over prebuilt configurations.
    pub fn new(
        benchmark_configs: Vec<ScenarioConfig<S>>,
        settings: RunnerSettings,
        registry: &EvaluatorRegistry<EvaluatorOf<S>>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        let evaluators = registry.resolve(&settings.evaluators)?;
        let span = info_span!("benchmark_runner", logger = %settings.logger_name);
        Ok(Self {
            benchmark_configs,
            evaluators,
            settings,
            exceptions_caught: Vec::new(),
            span,
        })
    }

    /// Builds the configuration matrix from a database and a behavior map,
    /// then creates the runner.
    pub fn from_database(
        database: &BenchmarkDatabase<S>,
        behaviors: &BehaviorMap<BehaviorOf<S>>,
        settings: RunnerSettings,
        registry: &EvaluatorRegistry<EvaluatorOf<S>>,
    ) -> Result<Self, ConfigError> {
        let configs = build_configurations(database, behaviors, settings.num_scenarios)?;
        info!(
            "Created {} benchmark configs from {} scenario sets and {} behaviors",
            configs.len(),
            database.len(),
            behaviors.len()
        );
        Self::new(configs, settings, registry)
    }

    /// Replaces the span entered while episodes run.
    pub fn with_log_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Runs all configurations in order.
    ///
    /// Fails only on configuration errors, such as a terminal rule naming an
    /// evaluator that is missing from the evaluation. Such an error aborts the
    /// batch and the records of the configs already run are discarded; the
    /// backend faults caught up to that point remain in
    /// [`exceptions_caught`](Self::exceptions_caught).
    pub fn run(&mut self) -> Result<BenchmarkResult<ScenarioConfig<S>>, ConfigError> {
        let span = self.span.clone();
        let _entered = span.enter();

        let total = self.benchmark_configs.len();
        let mut results: Vec<ResultRecord> = Vec::with_capacity(total);
        for idx in 0..total {
            let config = self.benchmark_configs[idx].clone();
            info!(
                "Running config idx {}/{}: Scenario {} of set \"{}\" for behavior \"{}\"",
                idx,
                total.saturating_sub(1),
                config.scenario_idx,
                config.scenario_set_name,
                config.behavior_name
            );
            let record = self.execute(config, None)?;
            results.push(record);

            if let Some(every) = self.settings.log_eval_avg_every {
                if (idx + 1) % every == 0 {
                    self.log_eval_average(&results);
                }
            }
        }

        if !self.exceptions_caught.is_empty() {
            info!(
                "Finished {} configs, {} raised exceptions",
                total,
                self.exceptions_caught.len()
            );
        }
        Ok(BenchmarkResult::new(
            results,
            Some(self.benchmark_configs.clone()),
        ))
    }

    /// Re-runs the configuration with index `config_idx`, optionally drawing
    /// every step with `viewer`.
    pub fn run_benchmark_config(
        &mut self,
        config_idx: usize,
        viewer: Option<&mut dyn Viewer<S::World>>,
    ) -> Result<ResultRecord, ConfigError> {
        let span = self.span.clone();
        let _entered = span.enter();

        let config = find_config(&mut self.benchmark_configs, config_idx)?.clone();
        info!(
            "Running config idx {}: Scenario {} of set \"{}\" for behavior \"{}\"",
            config_idx, config.scenario_idx, config.scenario_set_name, config.behavior_name
        );
        self.execute(config, viewer)
    }

    /// Backend failures collected so far. Never cleared by the runner.
    pub fn exceptions_caught(&self) -> &[CaughtException] {
        &self.exceptions_caught
    }

    /// Configurations in matrix order.
    pub fn benchmark_configs(&self) -> &[ScenarioConfig<S>] {
        &self.benchmark_configs
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    fn execute(
        &mut self,
        config: ScenarioConfig<S>,
        viewer: Option<&mut dyn Viewer<S::World>>,
    ) -> Result<ResultRecord, ConfigError> {
        EpisodeExecutor::new(
            &self.evaluators,
            &self.settings.terminal_when,
            &mut self.exceptions_caught,
        )
        .with_default_step_time(self.settings.default_step_time)
        .with_max_steps(self.settings.max_steps)
        .execute(config, viewer)
    }

    fn log_eval_average(&self, results: &[ResultRecord]) {
        let summary = EvaluationSummary::from_records(results, &self.settings.evaluation_criteria());
        info!(
            "\n------------------- Current Evaluation Results ---------------------- \n Num. Results:{}\n{}{}",
            results.len(),
            summary,
            SUMMARY_RULE
        );
    }
}
