//! Step records and terminal workflow outcomes.
//!
//! Every invocation of the engine ends in exactly one `Outcome`. Halting
//! outcomes carry the `HaltCause` that produced them and the records of the
//! steps that completed before the halt.

use serde::{Deserialize, Serialize};

use crate::JsonMap;

/// Audit entry for a step that reached a non-aborting classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// The step's action (`type`).
    pub step: String,
    /// The capability that handled it.
    pub agent: String,
    /// The raw result mapping returned by the capability.
    pub result: JsonMap,
}

/// Why a workflow run halted before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltCause {
    /// The capability returned `status: error` with a rejection reason.
    AgentRejected,
    /// The capability returned `status: error` for any other reason.
    AgentError,
    /// The capability returned `status: failed`.
    ValidationFailed,
    /// The review gate rejected the step's output.
    ReviewRejected,
    /// A capability or the reviewer raised an error or panicked.
    CollaboratorException,
}

impl HaltCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            HaltCause::AgentRejected => "agent_rejected",
            HaltCause::AgentError => "agent_error",
            HaltCause::ValidationFailed => "validation_failed",
            HaltCause::ReviewRejected => "review_rejected",
            HaltCause::CollaboratorException => "collaborator_exception",
        }
    }
}

impl std::fmt::Display for HaltCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal value of one workflow invocation.
///
/// Serializes with a `status` tag:
/// `{"status": "completed", "results": [...]}`,
/// `{"status": "review_failed", "step": ..., "feedback": [...], ...}`,
/// `{"status": "error", "step": ..., "details": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Every step proceeded.
    Completed { results: Vec<StepRecord> },

    /// A step or its review was rejected.
    ReviewFailed {
        step: String,
        feedback: Vec<serde_json::Value>,
        cause: HaltCause,
        partial_results: Vec<StepRecord>,
    },

    /// A step failed or a collaborator raised.
    Error {
        step: String,
        details: String,
        cause: HaltCause,
        partial_results: Vec<StepRecord>,
    },
}

impl Outcome {
    /// Short status label matching the serialized tag.
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Completed { .. } => "completed",
            Outcome::ReviewFailed { .. } => "review_failed",
            Outcome::Error { .. } => "error",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed { .. })
    }

    /// Records accumulated up to termination.
    pub fn records(&self) -> &[StepRecord] {
        match self {
            Outcome::Completed { results } => results,
            Outcome::ReviewFailed {
                partial_results, ..
            }
            | Outcome::Error {
                partial_results, ..
            } => partial_results,
        }
    }

    /// The step that halted the run, if any.
    pub fn halted_step(&self) -> Option<&str> {
        match self {
            Outcome::Completed { .. } => None,
            Outcome::ReviewFailed { step, .. } | Outcome::Error { step, .. } => Some(step),
        }
    }

    pub fn cause(&self) -> Option<HaltCause> {
        match self {
            Outcome::Completed { .. } => None,
            Outcome::ReviewFailed { cause, .. } | Outcome::Error { cause, .. } => Some(*cause),
        }
    }
}
