//! Run policy
//!
//! Detection never depends on where the analyzer runs. The run context only
//! decides what the findings mean for the caller: in `ci` an error-severity
//! issue fails the build, in `hook` and `manual` everything is advisory.

use crate::error::AnalyzerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Invocation mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunContext {
    /// Pre-commit hook: fast and never blocking
    #[default]
    Hook,
    /// Interactive developer loop
    Manual,
    /// Continuous integration gate
    Ci,
}

impl FromStr for RunContext {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hook" => Ok(RunContext::Hook),
            "manual" => Ok(RunContext::Manual),
            "ci" => Ok(RunContext::Ci),
            other => Err(AnalyzerError::Config(format!(
                "unknown run context '{}', expected hook, manual or ci",
                other
            ))),
        }
    }
}

impl fmt::Display for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunContext::Hook => f.write_str("hook"),
            RunContext::Manual => f.write_str("manual"),
            RunContext::Ci => f.write_str("ci"),
        }
    }
}

/// Pass/fail signal handed back to the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeed,
    Fail,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Succeed => 0,
            Outcome::Fail => 1,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Fail)
    }
}

pub struct RunPolicy;

impl RunPolicy {
    /// `Fail` only for `(Ci, true)`
    pub fn decide(context: RunContext, has_errors: bool) -> Outcome {
        match (context, has_errors) {
            (RunContext::Ci, true) => Outcome::Fail,
            _ => Outcome::Succeed,
        }
    }

    /// Outcome when `analyze()` itself returned an error.
    ///
    /// A document that cannot be read fails a CI build; hooks and manual
    /// runs report it and carry on.
    pub fn on_fault(context: RunContext) -> Outcome {
        match context {
            RunContext::Ci => Outcome::Fail,
            RunContext::Hook | RunContext::Manual => Outcome::Succeed,
        }
    }
}
