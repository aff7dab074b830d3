//! Terminal-condition evaluation.
//!
//! Each rule names an evaluator and a predicate over that evaluator's latest
//! reading. An episode stops as soon as at least one rule fires; every rule
//! that fired in that step is reported.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::world::EvaluationMap;

/// Record marker for episodes stopped by a backend failure.
pub const EXCEPTION_RAISED: &str = "exception_raised";

/// Record marker for episodes stopped by the step ceiling.
pub const MAX_STEPS_EXCEEDED: &str = "max_steps_exceeded";

/// Predicate applied to one evaluator reading.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "when", rename_all = "snake_case")]
pub enum TerminalCriterion {
    /// Fires when the reading is truthy (true, non-zero, non-empty).
    IsTrue,
    /// Fires when the reading is not truthy.
    IsFalse,
    /// Fires when the numeric reading is strictly above `threshold`.
    GreaterThan { threshold: f64 },
    /// Fires when the numeric reading is at or above `threshold`.
    AtLeast { threshold: f64 },
    /// Fires when the numeric reading is strictly below `threshold`.
    LessThan { threshold: f64 },
    /// Fires when the reading equals `value`.
    Equals { value: Value },
    /// Arbitrary predicate; only available programmatically.
    #[serde(skip)]
    Custom(Arc<dyn Fn(&Value) -> bool + Send + Sync>),
}

impl TerminalCriterion {
    /// Wraps an arbitrary predicate.
    pub fn custom(predicate: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(predicate))
    }

    /// Returns true if the criterion fires for `value`.
    pub fn is_met(&self, value: &Value) -> bool {
        match self {
            Self::IsTrue => is_truthy(value),
            Self::IsFalse => !is_truthy(value),
            Self::GreaterThan { threshold } => as_number(value).is_some_and(|v| v > *threshold),
            Self::AtLeast { threshold } => as_number(value).is_some_and(|v| v >= *threshold),
            Self::LessThan { threshold } => as_number(value).is_some_and(|v| v < *threshold),
            Self::Equals { value: expected } => value == expected,
            Self::Custom(predicate) => predicate(value),
        }
    }
}

impl fmt::Debug for TerminalCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IsTrue => write!(f, "IsTrue"),
            Self::IsFalse => write!(f, "IsFalse"),
            Self::GreaterThan { threshold } => write!(f, "GreaterThan({})", threshold),
            Self::AtLeast { threshold } => write!(f, "AtLeast({})", threshold),
            Self::LessThan { threshold } => write!(f, "LessThan({})", threshold),
            Self::Equals { value } => write!(f, "Equals({})", value),
            Self::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Truthiness of an evaluator reading.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// A criterion bound to the evaluator whose reading it inspects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalRule {
    pub evaluator: String,
    #[serde(flatten)]
    pub criterion: TerminalCriterion,
}

/// Outcome of checking terminal rules against one evaluation map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TerminalCheck {
    pub terminal: bool,
    pub reasons: Vec<String>,
}

/// Ordered set of terminal rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerminalConditions {
    rules: Vec<TerminalRule>,
}

impl TerminalConditions {
    /// Creates an empty rule set; it never fires.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule for `evaluator`.
    pub fn with(mut self, evaluator: impl Into<String>, criterion: TerminalCriterion) -> Self {
        self.push(evaluator, criterion);
        self
    }

    /// Adds a rule for `evaluator`.
    pub fn push(&mut self, evaluator: impl Into<String>, criterion: TerminalCriterion) {
        self.rules.push(TerminalRule {
            evaluator: evaluator.into(),
            criterion,
        });
    }

    pub fn rules(&self) -> &[TerminalRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Checks every rule against `evaluation`.
    ///
    /// A rule whose evaluator has no entry in `evaluation` is a configuration
    /// error and fails the check.
    pub fn check(&self, evaluation: &EvaluationMap) -> Result<TerminalCheck, ConfigError> {
        let mut reasons = Vec::new();
        for rule in &self.rules {
            let value = evaluation
                .get(&rule.evaluator)
                .ok_or_else(|| ConfigError::MissingTerminalKey(rule.evaluator.clone()))?;
            if rule.criterion.is_met(value) {
                reasons.push(rule.evaluator.clone());
            }
        }
        Ok(TerminalCheck {
            terminal: !reasons.is_empty(),
            reasons,
        })
    }
}

/// Why an episode stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalReason {
    /// Evaluator names whose terminal rules fired.
    Criteria(Vec<String>),
    /// A backend call failed.
    ExceptionRaised,
    /// The configured step ceiling was reached.
    MaxStepsExceeded,
}

impl TerminalReason {
    /// Value written to the `Terminal` field of a result record.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Criteria(names) => Value::from(names.clone()),
            Self::ExceptionRaised => Value::from(EXCEPTION_RAISED),
            Self::MaxStepsExceeded => Value::from(MAX_STEPS_EXCEEDED),
        }
    }
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Criteria(names) => write!(f, "{}", names.join(",")),
            Self::ExceptionRaised => write!(f, "{}", EXCEPTION_RAISED),
            Self::MaxStepsExceeded => write!(f, "{}", MAX_STEPS_EXCEEDED),
        }
    }
}
