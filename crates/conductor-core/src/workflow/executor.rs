//! Workflow engine: strictly sequential step execution with a review gate.
//!
//! # Execution flow
//!
//! 1. Resolve the workflow by name (or take a definition directly).
//! 2. Pre-validate every referenced capability, plus the reviewer when any
//!    step requires review. Misses are fatal and nothing runs.
//! 3. For each step in order: derive the input from state, attach any
//!    augmentation, dispatch, classify.
//! 4. A proceeding step is recorded, its result merged into state, and its
//!    output reviewed when `require_review` is set.
//! 5. The first halt ends the run with the records accumulated so far.
//!
//! Every runtime failure is folded into the returned `Outcome`; only the
//! pre-loop checks surface as `EngineError`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use conductor_types::JsonMap;
use conductor_types::config::EngineConfig;
use conductor_types::error::CapabilityError;
use conductor_types::event::WorkflowEvent;
use conductor_types::outcome::{HaltCause, Outcome, StepRecord};
use conductor_types::workflow::{StepDefinition, WorkflowDefinition};
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::capability::CapabilityRegistry;
use crate::event::bus::EventBus;
use crate::fs::FileSystem;

use super::augment::{self, Augmentation};
use super::classify::{Classification, classify};
use super::definition::WorkflowCatalog;
use super::review::{ReviewGate, ReviewVerdict};
use super::state::ExecutionState;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Fatal errors raised before any step runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("unknown workflow: '{0}'")]
    UnknownWorkflow(String),

    #[error("workflow '{workflow}' references unknown capability '{capability}'")]
    UnknownCapability {
        workflow: String,
        capability: String,
    },
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

/// Sequential workflow engine.
///
/// Generic over `F: FileSystem` for the file reads done during augmentation
/// and review. The engine is `Send + Sync`; wrap it in an `Arc` to run
/// independent invocations concurrently.
pub struct WorkflowEngine<F: FileSystem> {
    registry: Arc<CapabilityRegistry>,
    fs: Arc<F>,
    catalog: WorkflowCatalog,
    config: EngineConfig,
    event_bus: EventBus,
}

impl<F: FileSystem> WorkflowEngine<F> {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        fs: Arc<F>,
        catalog: WorkflowCatalog,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            fs,
            catalog,
            config,
            event_bus: EventBus::default(),
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn catalog(&self) -> &WorkflowCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Check that every capability `def` needs is registered.
    pub fn validate(&self, def: &WorkflowDefinition) -> Result<(), EngineError> {
        let missing = |capability: &str| EngineError::UnknownCapability {
            workflow: def.name.clone(),
            capability: capability.to_string(),
        };
        for step in &def.steps {
            let agent = step.agent_or(&self.config.default_agent);
            if !self.registry.contains(agent) {
                return Err(missing(agent));
            }
        }
        if def.requires_review() && !self.registry.contains(&self.config.reviewer) {
            return Err(missing(&self.config.reviewer));
        }
        Ok(())
    }

    /// Validate every workflow in the catalog, returning all failures.
    pub fn validate_catalog(&self) -> Vec<EngineError> {
        self.catalog
            .iter()
            .filter_map(|def| self.validate(def).err())
            .collect()
    }

    /// Run the catalog workflow `name` against `context`.
    pub async fn execute(&self, name: &str, context: JsonMap) -> Result<Outcome, EngineError> {
        let def = self
            .catalog
            .get(name)
            .ok_or_else(|| EngineError::UnknownWorkflow(name.to_string()))?;
        self.execute_definition(def, context).await
    }

    /// Run `def` against `context`.
    pub async fn execute_definition(
        &self,
        def: &WorkflowDefinition,
        context: JsonMap,
    ) -> Result<Outcome, EngineError> {
        self.validate(def)?;

        let run_id = Uuid::now_v7();
        let span = tracing::info_span!("workflow_run", run_id = %run_id, workflow = %def.name);
        Ok(self.run(run_id, def, context).instrument(span).await)
    }

    async fn run(&self, run_id: Uuid, def: &WorkflowDefinition, context: JsonMap) -> Outcome {
        let started = Instant::now();
        self.event_bus.publish(WorkflowEvent::RunStarted {
            run_id,
            workflow_name: def.name.clone(),
            total_steps: def.steps.len(),
        });
        tracing::info!(steps = def.steps.len(), "workflow run started");

        let mut state = ExecutionState::from_context(context);
        let mut records: Vec<StepRecord> = Vec::with_capacity(def.steps.len());

        for (index, step) in def.steps.iter().enumerate() {
            let agent = step.agent_or(&self.config.default_agent);
            let step_started = Instant::now();
            self.event_bus.publish(WorkflowEvent::StepStarted {
                run_id,
                index,
                step_type: step.step_type.clone(),
                agent: agent.to_string(),
            });
            tracing::info!(index, step = %step.step_type, agent, "step started");

            let mut input = state.step_input(step);
            if let Some(kind) = self.augmentation_for(&step.step_type) {
                augment::apply(self.fs.as_ref(), kind, &state, &mut input).await;
            }

            let result = match self.dispatch(agent, input).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(index, step = %step.step_type, error = %e, "capability raised");
                    let outcome = Outcome::Error {
                        step: step.step_type.clone(),
                        details: e.to_string(),
                        cause: HaltCause::CollaboratorException,
                        partial_results: records,
                    };
                    return self.halt(run_id, def, index, started, outcome);
                }
            };

            match classify(&result) {
                Classification::Proceed => {}
                Classification::Reject { feedback, cause } => {
                    tracing::info!(index, step = %step.step_type, %cause, "step rejected");
                    let outcome = Outcome::ReviewFailed {
                        step: step.step_type.clone(),
                        feedback,
                        cause,
                        partial_results: records,
                    };
                    return self.halt(run_id, def, index, started, outcome);
                }
                Classification::Fail { details, cause } => {
                    tracing::warn!(index, step = %step.step_type, %cause, details = %details, "step failed");
                    let outcome = Outcome::Error {
                        step: step.step_type.clone(),
                        details,
                        cause,
                        partial_results: records,
                    };
                    return self.halt(run_id, def, index, started, outcome);
                }
            }

            records.push(StepRecord {
                step: step.step_type.clone(),
                agent: agent.to_string(),
                result: result.clone(),
            });
            let next = state.merged(step, &result);
            self.event_bus.publish(WorkflowEvent::StepCompleted {
                run_id,
                index,
                step_type: step.step_type.clone(),
                duration_ms: millis(step_started.elapsed()),
            });
            tracing::debug!(index, step = %step.step_type, "step completed");

            if step.require_review {
                match self.review(run_id, step, &result).await {
                    Ok(ReviewVerdict::Approved { feedback }) => {
                        tracing::info!(
                            index,
                            step = %step.step_type,
                            suggestions = feedback.len(),
                            "review approved"
                        );
                    }
                    Ok(ReviewVerdict::Rejected { feedback }) => {
                        tracing::info!(
                            index,
                            step = %step.step_type,
                            issues = feedback.len(),
                            "review rejected"
                        );
                        let outcome = Outcome::ReviewFailed {
                            step: step.step_type.clone(),
                            feedback,
                            cause: HaltCause::ReviewRejected,
                            partial_results: records,
                        };
                        return self.halt(run_id, def, index, started, outcome);
                    }
                    Err(e) => {
                        tracing::warn!(index, step = %step.step_type, error = %e, "reviewer raised");
                        let outcome = Outcome::Error {
                            step: step.step_type.clone(),
                            details: e.to_string(),
                            cause: HaltCause::CollaboratorException,
                            partial_results: records,
                        };
                        return self.halt(run_id, def, index, started, outcome);
                    }
                }
            }

            state = next;
        }

        self.finish(run_id, def, started, Outcome::Completed { results: records })
    }

    fn augmentation_for(&self, step_type: &str) -> Option<Augmentation> {
        let listed = |actions: &[String]| actions.iter().any(|a| a == step_type);
        if listed(&self.config.code_review_actions) {
            Some(Augmentation::CodeReview)
        } else if listed(&self.config.fix_verification_actions) {
            Some(Augmentation::FixVerification)
        } else {
            None
        }
    }

    async fn dispatch(&self, agent: &str, input: JsonMap) -> Result<JsonMap, CapabilityError> {
        let capability = self
            .registry
            .resolve(agent)
            .map_err(|e| CapabilityError::Failed(e.to_string()))?;
        capability.process_catching(input).await
    }

    async fn review(
        &self,
        run_id: Uuid,
        step: &StepDefinition,
        result: &JsonMap,
    ) -> Result<ReviewVerdict, CapabilityError> {
        let gate = ReviewGate {
            registry: &self.registry,
            fs: self.fs.as_ref(),
            reviewer: &self.config.reviewer,
            default_review_type: &self.config.default_review_type,
        };
        self.event_bus.publish(WorkflowEvent::ReviewStarted {
            run_id,
            step_type: step.step_type.clone(),
            review_type: gate.review_type(step).to_string(),
        });
        let verdict = gate.review(step, result).await;
        if let Ok(v) = &verdict {
            self.event_bus.publish(WorkflowEvent::ReviewCompleted {
                run_id,
                step_type: step.step_type.clone(),
                approved: v.is_approved(),
            });
        }
        verdict
    }

    fn halt(
        &self,
        run_id: Uuid,
        def: &WorkflowDefinition,
        index: usize,
        started: Instant,
        outcome: Outcome,
    ) -> Outcome {
        if let (Some(step), Some(cause)) = (outcome.halted_step(), outcome.cause()) {
            self.event_bus.publish(WorkflowEvent::StepHalted {
                run_id,
                index,
                step_type: step.to_string(),
                cause,
            });
        }
        self.finish(run_id, def, started, outcome)
    }

    fn finish(
        &self,
        run_id: Uuid,
        def: &WorkflowDefinition,
        started: Instant,
        outcome: Outcome,
    ) -> Outcome {
        let duration_ms = millis(started.elapsed());
        let steps_completed = outcome.records().len();
        self.event_bus.publish(WorkflowEvent::RunFinished {
            run_id,
            workflow_name: def.name.clone(),
            status: outcome.status().to_string(),
            steps_completed,
            duration_ms,
        });
        tracing::info!(
            status = outcome.status(),
            steps_completed,
            duration_ms,
            "workflow run finished"
        );
        outcome
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
