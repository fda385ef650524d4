//! Lifecycle events for the workflow event bus.
//!
//! `WorkflowEvent` is broadcast by the engine as a run progresses. All
//! variants are Clone + Send + Sync for use with tokio broadcast channels.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::outcome::HaltCause;

/// Events emitted during a workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// A run has started.
    RunStarted {
        run_id: Uuid,
        workflow_name: String,
        total_steps: usize,
    },

    /// A step is about to be dispatched.
    StepStarted {
        run_id: Uuid,
        /// Zero-based position in the workflow.
        index: usize,
        step_type: String,
        agent: String,
    },

    /// A step's result was classified as proceeding.
    StepCompleted {
        run_id: Uuid,
        index: usize,
        step_type: String,
        duration_ms: u64,
    },

    /// A step halted the run.
    StepHalted {
        run_id: Uuid,
        index: usize,
        step_type: String,
        cause: HaltCause,
    },

    /// The review gate is dispatching to the reviewer.
    ReviewStarted {
        run_id: Uuid,
        step_type: String,
        review_type: String,
    },

    /// The reviewer returned a verdict.
    ReviewCompleted {
        run_id: Uuid,
        step_type: String,
        approved: bool,
    },

    /// The run reached a terminal outcome.
    RunFinished {
        run_id: Uuid,
        workflow_name: String,
        /// Outcome status label ("completed", "review_failed", "error").
        status: String,
        steps_completed: usize,
        duration_ms: u64,
    },
}

impl WorkflowEvent {
    /// The run this event belongs to.
    pub fn run_id(&self) -> Uuid {
        match self {
            WorkflowEvent::RunStarted { run_id, .. }
            | WorkflowEvent::StepStarted { run_id, .. }
            | WorkflowEvent::StepCompleted { run_id, .. }
            | WorkflowEvent::StepHalted { run_id, .. }
            | WorkflowEvent::ReviewStarted { run_id, .. }
            | WorkflowEvent::ReviewCompleted { run_id, .. }
            | WorkflowEvent::RunFinished { run_id, .. } => *run_id,
        }
    }
}
