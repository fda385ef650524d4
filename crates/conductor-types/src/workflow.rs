//! Workflow definition types.
//!
//! A workflow is a named, ordered list of steps. Each step names the action
//! it requests (`type`), the capability that performs it (`agent`), literal
//! parameters, the result keys to propagate into execution state, and an
//! optional review gate. Definitions are immutable once loaded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::JsonMap;

// ---------------------------------------------------------------------------
// Step Definition
// ---------------------------------------------------------------------------

/// A single step in a workflow.
///
/// ```yaml
/// - type: create_component
///   agent: developer
///   params:
///     domain: frontend
///   outputs: [component_id]
///   require_review: true
///   review_type: review_code
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// The action requested from the capability (e.g. "create_component").
    #[serde(rename = "type")]
    pub step_type: String,
    /// Capability name. `None` means the configured default agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// Literal values merged into the step input.
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub params: JsonMap,
    /// Result keys to copy into execution state, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
    /// Whether the step's output must pass the review gate.
    #[serde(default, skip_serializing_if = "is_false")]
    pub require_review: bool,
    /// Action sent to the reviewer (defaults to the configured review type).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_type: Option<String>,
    /// Extra keys merged on top of the review input.
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub review_params: JsonMap,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl StepDefinition {
    /// Create a step requesting `step_type` from the default agent.
    pub fn new(step_type: impl Into<String>) -> Self {
        Self {
            step_type: step_type.into(),
            agent: None,
            params: JsonMap::new(),
            outputs: Vec::new(),
            require_review: false,
            review_type: None,
            review_params: JsonMap::new(),
        }
    }

    /// Bind the step to a named capability.
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Add a literal parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Declare the result keys propagated into state.
    pub fn with_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    /// Require the review gate, optionally with a specific review action.
    pub fn with_review(mut self, review_type: Option<&str>) -> Self {
        self.require_review = true;
        self.review_type = review_type.map(String::from);
        self
    }

    /// Add a key merged on top of the review input.
    pub fn with_review_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.review_params.insert(key.into(), value);
        self
    }

    /// The capability name, falling back to `default` when unset.
    pub fn agent_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.agent.as_deref().unwrap_or(default)
    }
}

// ---------------------------------------------------------------------------
// Workflow Definition
// ---------------------------------------------------------------------------

/// A named, ordered sequence of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Workflow name, used to invoke it.
    pub name: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Steps in execution order.
    pub steps: Vec<StepDefinition>,
}

impl WorkflowDefinition {
    pub fn new(name: impl Into<String>, steps: Vec<StepDefinition>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps,
        }
    }

    /// Whether any step requires the review gate.
    pub fn requires_review(&self) -> bool {
        self.steps.iter().any(|s| s.require_review)
    }
}

/// A workflow inside a catalog file, where the name is the map key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<StepDefinition>,
}

/// On-disk shape of a workflow YAML file.
///
/// Either a catalog mapping names to bodies:
/// ```yaml
/// workflows:
///   create_feature:
///     steps: [...]
/// ```
/// or a single named definition (`name`, `steps`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkflowFile {
    Catalog {
        workflows: BTreeMap<String, WorkflowBody>,
    },
    Single(WorkflowDefinition),
}

impl WorkflowFile {
    /// Flatten the file into named definitions.
    pub fn into_definitions(self) -> Vec<WorkflowDefinition> {
        match self {
            WorkflowFile::Catalog { workflows } => workflows
                .into_iter()
                .map(|(name, body)| WorkflowDefinition {
                    name,
                    description: body.description,
                    steps: body.steps,
                })
                .collect(),
            WorkflowFile::Single(def) => vec![def],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_defaults_when_fields_absent() {
        let step: StepDefinition = serde_json::from_value(json!({ "type": "fix_issue" })).unwrap();
        assert_eq!(step.step_type, "fix_issue");
        assert!(step.agent.is_none());
        assert!(step.params.is_empty());
        assert!(step.outputs.is_empty());
        assert!(!step.require_review);
        assert!(step.review_type.is_none());
        assert_eq!(step.agent_or("developer"), "developer");
    }

    #[test]
    fn test_step_serialization_omits_defaults() {
        let step = StepDefinition::new("review_code").with_agent("reviewer");
        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(value, json!({ "type": "review_code", "agent": "reviewer" }));
    }

    #[test]
    fn test_builder_sets_review_fields() {
        let step = StepDefinition::new("create_component")
            .with_param("domain", json!("frontend"))
            .with_outputs(["component"])
            .with_review(Some("domain_validation"))
            .with_review_param("strict", json!(true));
        assert!(step.require_review);
        assert_eq!(step.review_type.as_deref(), Some("domain_validation"));
        assert_eq!(step.params["domain"], "frontend");
        assert_eq!(step.outputs, vec!["component"]);
        assert_eq!(step.review_params["strict"], true);
    }

    #[test]
    fn test_catalog_file_parses_from_yaml() {
        let yaml = r#"
workflows:
  create_feature:
    steps:
      - type: create_component
        agent: developer
        params:
          domain: frontend
        require_review: true
      - type: review_code
        agent: reviewer
        review_type: domain_validation
  fix_issue:
    description: Patch and verify
    steps:
      - type: fix_issue
      - type: verify_fix
        agent: reviewer
"#;
        let file: WorkflowFile = serde_yaml_ng::from_str(yaml).unwrap();
        let defs = file.into_definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "create_feature");
        assert!(defs[0].requires_review());
        assert_eq!(defs[1].name, "fix_issue");
        assert_eq!(defs[1].description.as_deref(), Some("Patch and verify"));
        assert!(!defs[1].requires_review());
    }

    #[test]
    fn test_single_file_parses_from_yaml() {
        let yaml = r#"
name: scaffold
steps:
  - type: create_component
    outputs: [domain]
"#;
        let file: WorkflowFile = serde_yaml_ng::from_str(yaml).unwrap();
        let defs = file.into_definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "scaffold");
        assert_eq!(defs[0].steps[0].outputs, vec!["domain"]);
    }
}
