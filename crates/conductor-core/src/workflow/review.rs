//! Review gate: re-invokes the reviewer capability on a step's output.
//!
//! The review input carries the contents of every file the step reported
//! (`files`, `created`, `updated`, deduplicated in that order) under `code`,
//! with the step's `review_params` merged on top.

use conductor_types::JsonMap;
use conductor_types::error::CapabilityError;
use conductor_types::workflow::StepDefinition;
use serde_json::Value;

use crate::capability::CapabilityRegistry;
use crate::fs::FileSystem;

use super::augment::read_contents;
use super::classify::feedback_list;
use super::state::path_list;

/// Reviewer verdict on one step.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewVerdict {
    /// Carries the reviewer's `suggestions`.
    Approved { feedback: Vec<Value> },
    /// Carries the reviewer's `issues`.
    Rejected { feedback: Vec<Value> },
}

impl ReviewVerdict {
    pub fn is_approved(&self) -> bool {
        matches!(self, ReviewVerdict::Approved { .. })
    }
}

/// Borrowed collaborators for one review.
pub struct ReviewGate<'a, F: FileSystem> {
    pub registry: &'a CapabilityRegistry,
    pub fs: &'a F,
    /// Reviewer capability name.
    pub reviewer: &'a str,
    /// Review action used when the step has no `review_type`.
    pub default_review_type: &'a str,
}

impl<F: FileSystem> ReviewGate<'_, F> {
    /// The review action for `step`.
    pub fn review_type<'s>(&'s self, step: &'s StepDefinition) -> &'s str {
        step.review_type.as_deref().unwrap_or(self.default_review_type)
    }

    /// Build the reviewer input for `step`'s `result`.
    pub async fn build_input(&self, step: &StepDefinition, result: &JsonMap) -> JsonMap {
        let mut paths: Vec<String> = Vec::new();
        for key in ["files", "created", "updated"] {
            if let Some(value) = result.get(key) {
                for path in path_list(value) {
                    if !paths.contains(&path) {
                        paths.push(path);
                    }
                }
            }
        }

        let contents = read_contents(self.fs, &paths).await;
        let mut input = JsonMap::new();
        input.insert(
            "action".to_string(),
            Value::String(self.review_type(step).to_string()),
        );
        input.insert("code".to_string(), contents.into_code_value());
        for (key, value) in &step.review_params {
            input.insert(key.clone(), value.clone());
        }
        input
    }

    /// Dispatch the review and interpret the verdict.
    ///
    /// `status == "failed"` rejects; any other status approves. Errors and
    /// panics from the reviewer are returned to the caller.
    pub async fn review(
        &self,
        step: &StepDefinition,
        result: &JsonMap,
    ) -> Result<ReviewVerdict, CapabilityError> {
        let reviewer = self
            .registry
            .resolve(self.reviewer)
            .map_err(|e| CapabilityError::Failed(e.to_string()))?;
        let input = self.build_input(step, result).await;
        let response = reviewer.process_catching(input).await?;

        match response.get("status").and_then(Value::as_str) {
            Some("failed") => Ok(ReviewVerdict::Rejected {
                feedback: feedback_list(response.get("issues")),
            }),
            status => {
                if status == Some("error") {
                    tracing::warn!(
                        step = %step.step_type,
                        error = ?response.get("error"),
                        "reviewer answered with an error status; treating as approval"
                    );
                }
                Ok(ReviewVerdict::Approved {
                    feedback: feedback_list(response.get("suggestions")),
                })
            }
        }
    }
}
