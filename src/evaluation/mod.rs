//! Evaluator construction and terminal-condition checks.
//!
//! - [`registry`]: evaluator type names mapped to per-agent or global factories
//! - [`terminal`]: rules that decide when an episode stops, and why

pub mod registry;
pub mod terminal;

pub use registry::{EvaluatorFactory, EvaluatorRegistry, EvaluatorSpec, RegisteredEvaluator};
pub use terminal::{
    is_truthy, TerminalCheck, TerminalConditions, TerminalCriterion, TerminalReason, TerminalRule,
    EXCEPTION_RAISED, MAX_STEPS_EXCEEDED,
};
