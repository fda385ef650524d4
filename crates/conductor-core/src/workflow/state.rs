//! Execution state threaded between workflow steps.
//!
//! `ExecutionState` is owned by one run. It starts as a copy of the initial
//! context and is replaced after every step by [`ExecutionState::merged`];
//! capabilities never see it directly, only the input derived by
//! [`ExecutionState::step_input`].

use conductor_types::JsonMap;
use conductor_types::workflow::StepDefinition;
use serde_json::Value;

/// Result keys copied into state under a different name.
const RESERVED_OVERLAYS: [(&str, &str); 3] = [
    ("files", "files"),
    ("created", "created_files"),
    ("updated", "updated_files"),
];

/// Immutable key-value state of one workflow run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionState {
    values: JsonMap,
}

impl ExecutionState {
    /// Start from a copy of the caller's initial context.
    pub fn from_context(context: JsonMap) -> Self {
        Self { values: context }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Input for dispatching `step`: params, overlaid by state, then `action`.
    pub fn step_input(&self, step: &StepDefinition) -> JsonMap {
        let mut input = step.params.clone();
        for (key, value) in &self.values {
            input.insert(key.clone(), value.clone());
        }
        input.insert("action".to_string(), Value::String(step.step_type.clone()));
        input
    }

    /// State after `step` produced `result`.
    ///
    /// Overlays, later wins: each declared output present in `result`, then
    /// `files`, `created` (as `created_files`), `updated` (as `updated_files`).
    /// Values replace prior ones wholesale; nothing is deep-merged.
    pub fn merged(&self, step: &StepDefinition, result: &JsonMap) -> Self {
        let mut values = self.values.clone();
        for key in &step.outputs {
            if let Some(value) = result.get(key) {
                values.insert(key.clone(), value.clone());
            }
        }
        for (from, to) in RESERVED_OVERLAYS {
            if let Some(value) = result.get(from) {
                values.insert(to.to_string(), value.clone());
            }
        }
        Self { values }
    }

    /// File paths listed under `key`.
    pub fn paths(&self, key: &str) -> Vec<String> {
        self.values.get(key).map(path_list).unwrap_or_default()
    }
}

/// Extract file paths from a JSON list.
///
/// Entries are either path strings or objects with a string `path` field;
/// anything else is ignored.
pub fn path_list(value: &Value) -> Vec<String> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(path) => Some(path.clone()),
            Value::Object(obj) => obj.get("path").and_then(Value::as_str).map(String::from),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::map;
    use serde_json::json;

    #[test]
    fn step_input_state_wins_over_params_and_action_wins_over_all() {
        let state = ExecutionState::from_context(map(json!({
            "domain": "backend",
            "action": "spoofed",
        })));
        let step = StepDefinition::new("create_component")
            .with_param("domain", json!("frontend"))
            .with_param("strict", json!(true));

        let input = state.step_input(&step);
        assert_eq!(input["domain"], "backend");
        assert_eq!(input["strict"], true);
        assert_eq!(input["action"], "create_component");
    }

    #[test]
    fn merged_copies_declared_outputs_only_when_present() {
        let state = ExecutionState::from_context(map(json!({ "keep": 1 })));
        let step = StepDefinition::new("s").with_outputs(["domain", "missing"]);
        let result = map(json!({ "domain": "frontend", "noise": true }));

        let next = state.merged(&step, &result);
        assert_eq!(next.get("domain"), Some(&json!("frontend")));
        assert_eq!(next.get("keep"), Some(&json!(1)));
        assert!(next.get("missing").is_none());
        assert!(next.get("noise").is_none());
    }

    #[test]
    fn merged_maps_reserved_keys() {
        let state = ExecutionState::default();
        let result = map(json!({
            "files": ["a.tsx"],
            "created": ["b.tsx"],
            "updated": ["c.tsx"],
        }));
        let next = state.merged(&StepDefinition::new("s"), &result);
        assert_eq!(next.get("files"), Some(&json!(["a.tsx"])));
        assert_eq!(next.get("created_files"), Some(&json!(["b.tsx"])));
        assert_eq!(next.get("updated_files"), Some(&json!(["c.tsx"])));
        assert!(next.get("created").is_none());
    }

    #[test]
    fn merged_reserved_overlay_beats_declared_output() {
        let state = ExecutionState::default();
        let step = StepDefinition::new("s").with_outputs(["created_files"]);
        let result = map(json!({ "created_files": ["x"], "created": ["y"] }));
        let next = state.merged(&step, &result);
        assert_eq!(next.get("created_files"), Some(&json!(["y"])));
    }

    #[test]
    fn merged_replaces_without_deep_merge_and_leaves_original() {
        let state = ExecutionState::from_context(map(json!({
            "issue": { "id": 1, "update_tests": true },
        })));
        let step = StepDefinition::new("s").with_outputs(["issue"]);
        let next = state.merged(&step, &map(json!({ "issue": { "id": 2 } })));

        assert_eq!(next.get("issue"), Some(&json!({ "id": 2 })));
        assert_eq!(
            state.get("issue"),
            Some(&json!({ "id": 1, "update_tests": true }))
        );
    }

    #[test]
    fn path_list_accepts_strings_and_objects() {
        let value = json!(["a.tsx", { "path": "b.py", "content": "" }, 3, { "name": "x" }]);
        assert_eq!(path_list(&value), vec!["a.tsx", "b.py"]);
        assert!(path_list(&json!("a.tsx")).is_empty());
    }
}
