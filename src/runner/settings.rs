//! Runner settings.
//!
//! Settings can be written by hand in YAML:
//!
//! ```yaml
//! evaluators:
//!   - name: collision
//!     type: EvaluatorCollisionEgoAgent
//!   - name: step_count
//!     type: EvaluatorStepCount
//! terminal_when:
//!   - evaluator: collision
//!     when: is_true
//!   - evaluator: step_count
//!     when: greater_than
//!     threshold: 30
//! num_scenarios: 20
//! log_eval_avg_every: 10
//! max_steps: 500
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::evaluation::{EvaluatorSpec, TerminalConditions, TerminalCriterion};

/// Default simulation step duration in seconds.
pub const DEFAULT_STEP_TIME: f64 = 0.2;

/// Default name of the runner's log span.
pub const DEFAULT_LOGGER_NAME: &str = "BenchmarkRunner";

/// Configuration of a [`BenchmarkRunner`](super::BenchmarkRunner).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Evaluators attached to every episode, in order.
    pub evaluators: Vec<EvaluatorSpec>,
    /// Rules deciding when an episode stops.
    pub terminal_when: TerminalConditions,
    /// Per-scenario-set cap on the number of scenarios.
    pub num_scenarios: Option<usize>,
    /// Log a running summary every N finished episodes.
    pub log_eval_avg_every: Option<usize>,
    /// Stop an episode after this many steps.
    pub max_steps: Option<usize>,
    /// Step duration used when the scenario does not define one.
    pub default_step_time: f64,
    /// Name attached to the runner's log span.
    pub logger_name: String,
}

impl RunnerSettings {
    /// Creates settings with defaults: no evaluators, no terminal rules.
    pub fn new() -> Self {
        Self {
            evaluators: Vec::new(),
            terminal_when: TerminalConditions::new(),
            num_scenarios: None,
            log_eval_avg_every: None,
            max_steps: None,
            default_step_time: DEFAULT_STEP_TIME,
            logger_name: DEFAULT_LOGGER_NAME.to_string(),
        }
    }

    /// Parses settings from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    /// Checks values that would make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.default_step_time.is_finite() && self.default_step_time > 0.0) {
            return Err(ConfigError::InvalidSettings(format!(
                "default_step_time must be positive, got {}",
                self.default_step_time
            )));
        }
        if self.log_eval_avg_every == Some(0) {
            return Err(ConfigError::InvalidSettings(
                "log_eval_avg_every must be at least 1".to_string(),
            ));
        }
        if self.max_steps == Some(0) {
            return Err(ConfigError::InvalidSettings(
                "max_steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Adds an evaluator.
    pub fn with_evaluator(mut self, name: impl Into<String>, evaluator_type: impl Into<String>) -> Self {
        self.evaluators.push(EvaluatorSpec::new(name, evaluator_type));
        self
    }

    /// Adds a terminal rule.
    pub fn with_terminal(mut self, evaluator: impl Into<String>, criterion: TerminalCriterion) -> Self {
        self.terminal_when.push(evaluator, criterion);
        self
    }

    /// Caps the number of scenarios taken from each scenario set.
    pub fn with_num_scenarios(mut self, num_scenarios: usize) -> Self {
        self.num_scenarios = Some(num_scenarios);
        self
    }

    /// Enables the running summary log.
    pub fn with_log_eval_avg_every(mut self, every: usize) -> Self {
        self.log_eval_avg_every = Some(every);
        self
    }

    /// Sets the step ceiling.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Sets the fallback step duration.
    pub fn with_default_step_time(mut self, step_time: f64) -> Self {
        self.default_step_time = step_time;
        self
    }

    /// Sets the name of the runner's log span.
    pub fn with_logger_name(mut self, name: impl Into<String>) -> Self {
        self.logger_name = name.into();
        self
    }

    /// Names reported in the running summary: every evaluator plus `step`.
    pub fn evaluation_criteria(&self) -> Vec<String> {
        self.evaluators
            .iter()
            .map(|e| e.name.clone())
            .chain(std::iter::once(super::result::STEP.to_string()))
            .collect()
    }
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = RunnerSettings::new();
        assert_eq!(settings.default_step_time, 0.2);
        assert_eq!(settings.logger_name, "BenchmarkRunner");
        assert!(settings.max_steps.is_none());
        assert!(settings.terminal_when.is_empty());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
evaluators:
  - name: collision
    type: EvaluatorCollisionEgoAgent
  - name: step_count
    type: EvaluatorStepCount
terminal_when:
  - evaluator: collision
    when: is_true
  - evaluator: step_count
    when: greater_than
    threshold: 30
num_scenarios: 20
log_eval_avg_every: 10
"#;
        let settings = RunnerSettings::from_yaml_str(yaml).unwrap();
        assert_eq!(settings.evaluators.len(), 2);
        assert_eq!(settings.terminal_when.rules().len(), 2);
        assert_eq!(settings.num_scenarios, Some(20));
        assert_eq!(settings.log_eval_avg_every, Some(10));
        assert_eq!(settings.default_step_time, DEFAULT_STEP_TIME);
        assert_eq!(
            settings.evaluation_criteria(),
            vec!["collision", "step_count", "step"]
        );
    }

    #[test]
    fn test_from_yaml_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        fs::write(temp.path(), "max_steps: 100\nlogger_name: highway-bench\n").unwrap();
        let settings = RunnerSettings::from_yaml_file(temp.path()).unwrap();
        assert_eq!(settings.max_steps, Some(100));
        assert_eq!(settings.logger_name, "highway-bench");
    }

    #[test]
    fn test_rejects_zero_period() {
        let err = RunnerSettings::from_yaml_str("log_eval_avg_every: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSettings(_)));
    }

    #[test]
    fn test_rejects_non_positive_step_time() {
        let settings = RunnerSettings::new().with_default_step_time(0.0);
        assert!(settings.validate().is_err());
    }
}
