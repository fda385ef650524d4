//! Built-in `reviewer` capability.
//!
//! Checks files against the configured domains and review rules. Answers
//! `status: failed` with `issues` when anything is wrong, otherwise
//! `status: success` with `suggestions` and per-file `domain_validations`.
//!
//! Issue shape: `{type, file?, message}` where `type` is one of
//! `domain_boundary`, `file_path`, `file_size`, `function_length`,
//! `naming_convention`, `test_coverage`, `file_error`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use conductor_types::JsonMap;
use conductor_types::config::{ConductorConfig, DomainRules, ReviewerConfig, domain_owning};
use conductor_types::error::CapabilityError;
use serde_json::{Value, json};

use crate::fs::FileSystem;
use crate::workflow::state::path_list;

use super::Capability;
use super::domain::{check_domain_conventions, error_result, object_field, test_path_for};

pub struct ReviewerCapability<F: FileSystem> {
    fs: Arc<F>,
    tree_focus: BTreeMap<String, DomainRules>,
    settings: ReviewerConfig,
}

/// Accumulated findings for one review.
#[derive(Default)]
struct Findings {
    issues: Vec<Value>,
    suggestions: Vec<Value>,
    domain_validations: JsonMap,
}

impl Findings {
    fn issue(&mut self, kind: &str, file: Option<&str>, message: String) {
        let mut issue = JsonMap::new();
        issue.insert("type".to_string(), json!(kind));
        if let Some(file) = file {
            issue.insert("file".to_string(), json!(file));
        }
        issue.insert("message".to_string(), json!(message));
        self.issues.push(Value::Object(issue));
    }

    fn into_result(self) -> JsonMap {
        let mut result = JsonMap::new();
        if self.issues.is_empty() {
            result.insert("status".to_string(), json!("success"));
            result.insert("suggestions".to_string(), Value::Array(self.suggestions));
            result.insert(
                "domain_validations".to_string(),
                Value::Object(self.domain_validations),
            );
        } else {
            result.insert("status".to_string(), json!("failed"));
            result.insert("issues".to_string(), Value::Array(self.issues));
            result.insert("suggestions".to_string(), Value::Array(self.suggestions));
        }
        result
    }
}

impl<F: FileSystem> ReviewerCapability<F> {
    pub fn new(fs: Arc<F>, config: &ConductorConfig) -> Self {
        Self {
            fs,
            tree_focus: config.tree_focus.clone(),
            settings: config.agents.reviewer.clone(),
        }
    }

    /// Checks shared by both actions for one file with known content.
    ///
    /// Returns `false` when the file lies outside every domain.
    fn check_file(&self, findings: &mut Findings, path: &str, content: &str, size: u64) -> bool {
        let rules = &self.settings.review_rules;
        let Some((domain, domain_rules)) = domain_owning(&self.tree_focus, path) else {
            findings.issue(
                "domain_boundary",
                Some(path),
                "File does not belong to any defined domain".to_string(),
            );
            return false;
        };

        let extension = Path::new(path)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        if !domain_rules.extensions.is_empty() && !domain_rules.extensions.contains(&extension) {
            findings.issue(
                "file_path",
                Some(path),
                format!(
                    "File extension must be one of {:?} in {domain}",
                    domain_rules.extensions
                ),
            );
        }

        if size > rules.max_file_size {
            findings.issue(
                "file_size",
                Some(path),
                format!(
                    "File size ({size} bytes) exceeds maximum allowed ({} bytes)",
                    rules.max_file_size
                ),
            );
        }

        let check = check_domain_conventions(domain, path, content);
        for message in &check.issues {
            findings.issue("naming_convention", Some(path), message.clone());
        }
        findings
            .suggestions
            .extend(check.suggestions.iter().map(|s| json!(s)));
        findings
            .domain_validations
            .insert(path.to_string(), check.to_value());
        true
    }

    fn check_functions(&self, findings: &mut Findings, path: &str, file: &Value) {
        let max = self.settings.review_rules.max_function_length;
        let Some(functions) = file.get("functions").and_then(Value::as_array) else {
            return;
        };
        for function in functions {
            let body = function.get("body").and_then(Value::as_str).unwrap_or_default();
            if body.split('\n').count() > max {
                let name = function.get("name").and_then(Value::as_str).unwrap_or("<anonymous>");
                findings.issue(
                    "function_length",
                    Some(path),
                    format!("Function {name} exceeds maximum length of {max} lines"),
                );
            }
        }
    }

    /// Share of testable source files whose test file is also under review.
    fn coverage(paths: &[String]) -> f64 {
        let testable: Vec<String> = paths.iter().filter_map(|p| test_path_for(p)).collect();
        if testable.is_empty() {
            return 100.0;
        }
        let covered = testable
            .iter()
            .filter(|test| paths.contains(test))
            .count();
        covered as f64 * 100.0 / testable.len() as f64
    }

    fn check_coverage(&self, findings: &mut Findings, paths: &[String]) {
        let threshold = self.settings.review_rules.coverage_threshold;
        let coverage = Self::coverage(paths);
        if coverage < threshold {
            findings.issue(
                "test_coverage",
                None,
                format!("Test coverage ({coverage:.0}%) is below threshold ({threshold:.0}%)"),
            );
        }
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    async fn review_code(&self, code: &JsonMap) -> JsonMap {
        let mut findings = Findings::default();
        let files: Vec<Value> = code
            .get("files")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut paths = Vec::new();
        for file in &files {
            let path = file.get("path").and_then(Value::as_str).unwrap_or_default();
            let content = file.get("content").and_then(Value::as_str).unwrap_or_default();
            paths.push(path.to_string());

            let size = match self.fs.file_size(Path::new(path)).await {
                Ok(size) => size,
                Err(_) => content.len() as u64,
            };
            if self.check_file(&mut findings, path, content, size) {
                self.check_functions(&mut findings, path, file);
            }
        }

        if self.settings.review_rules.required_tests && !paths.is_empty() {
            self.check_coverage(&mut findings, &paths);
        }

        tracing::debug!(
            files = paths.len(),
            issues = findings.issues.len(),
            "code reviewed"
        );
        findings.into_result()
    }

    async fn verify_fix(&self, fix: &JsonMap) -> JsonMap {
        let mut findings = Findings::default();
        let paths = fix.get("files").map(path_list).unwrap_or_default();

        for path in &paths {
            let content = match self.fs.read_file(Path::new(path)).await {
                Ok(content) => content,
                Err(e) => {
                    findings.issue(
                        "file_error",
                        Some(path),
                        format!("Failed to read file: {e}"),
                    );
                    continue;
                }
            };
            self.check_file(&mut findings, path, &content, content.len() as u64);
        }

        let update_tests = fix
            .get("update_tests")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if update_tests && self.settings.review_rules.required_tests {
            self.check_coverage(&mut findings, &paths);
        }

        tracing::debug!(
            files = paths.len(),
            issues = findings.issues.len(),
            "fix verified"
        );
        findings.into_result()
    }
}

impl<F: FileSystem> Capability for ReviewerCapability<F> {
    fn name(&self) -> &str {
        "reviewer"
    }

    async fn process(&self, input: JsonMap) -> Result<JsonMap, CapabilityError> {
        let action = input.get("action").and_then(Value::as_str).unwrap_or_default();
        if !self.settings.allowed_actions.iter().any(|a| a == action) {
            return Ok(error_result(format!("Action not allowed: {action}"), None, None));
        }

        match action {
            "review_code" => Ok(self.review_code(object_field(&input, "code")?).await),
            "verify_fix" => Ok(self.verify_fix(object_field(&input, "fix")?).await),
            other => Ok(error_result(format!("Unknown action: {other}"), None, None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryFileSystem, map};

    fn reviewer(fs: MemoryFileSystem) -> ReviewerCapability<MemoryFileSystem> {
        ReviewerCapability::new(Arc::new(fs), &ConductorConfig::default())
    }

    fn review_input(files: Value) -> JsonMap {
        map(json!({ "action": "review_code", "code": { "files": files } }))
    }

    fn issue_types(result: &JsonMap) -> Vec<String> {
        result["issues"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["type"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn clean_component_with_test_passes() {
        let result = reviewer(MemoryFileSystem::new())
            .process(review_input(json!([
                { "path": "src/Button.tsx", "content": "export const Button = () => null;" },
                { "path": "src/Button.test.tsx", "content": "describe('Button', () => {})" },
            ])))
            .await
            .unwrap();

        assert_eq!(result["status"], "success");
        assert_eq!(result["suggestions"], json!([]));
        assert_eq!(result["domain_validations"]["src/Button.tsx"]["status"], "valid");
    }

    #[tokio::test]
    async fn missing_test_fails_coverage() {
        let result = reviewer(MemoryFileSystem::new())
            .process(review_input(json!([
                { "path": "src/Button.tsx", "content": "" },
            ])))
            .await
            .unwrap();

        assert_eq!(result["status"], "failed");
        assert_eq!(issue_types(&result), vec!["test_coverage"]);
    }

    #[tokio::test]
    async fn out_of_domain_file_is_a_boundary_issue() {
        let result = reviewer(MemoryFileSystem::new())
            .process(review_input(json!([
                { "path": "docs/guide.md", "content": "" },
            ])))
            .await
            .unwrap();

        assert_eq!(issue_types(&result), vec!["domain_boundary"]);
    }

    #[tokio::test]
    async fn naming_size_extension_and_function_length_are_checked() {
        let mut config = ConductorConfig::default();
        config.agents.reviewer.review_rules.max_file_size = 10;
        config.agents.reviewer.review_rules.max_function_length = 2;
        config.agents.reviewer.review_rules.required_tests = false;
        let fs = MemoryFileSystem::new().with_file("src/button.tsx", "0123456789abcdef");
        let reviewer = ReviewerCapability::new(Arc::new(fs), &config);

        let result = reviewer
            .process(review_input(json!([
                {
                    "path": "src/button.tsx",
                    "content": "var x = 1;",
                    "functions": [{ "name": "render", "body": "a\nb\nc" }],
                },
                { "path": "src/logo.svg", "content": "" },
            ])))
            .await
            .unwrap();

        assert_eq!(result["status"], "failed");
        assert_eq!(
            issue_types(&result),
            vec!["file_size", "naming_convention", "function_length", "file_path"]
        );
        assert_eq!(result["suggestions"], json!(["Use const or let instead of var"]));
    }

    #[tokio::test]
    async fn verify_fix_reads_files_and_reports_unreadable() {
        let fs = MemoryFileSystem::new()
            .with_file("api/users.py", "def get():\n    return 1\n")
            .with_file("api/test_users.py", "import unittest\n");
        let result = reviewer(fs)
            .process(map(json!({
                "action": "verify_fix",
                "fix": {
                    "files": ["api/users.py", "api/test_users.py", "api/gone.py"],
                    "update_tests": true,
                },
            })))
            .await
            .unwrap();

        assert_eq!(result["status"], "failed");
        assert_eq!(issue_types(&result), vec!["file_error", "test_coverage"]);
        assert_eq!(result["issues"][0]["file"], "api/gone.py");
    }

    #[tokio::test]
    async fn verify_fix_without_test_update_skips_coverage() {
        let fs = MemoryFileSystem::new().with_file("api/users.py", "print('hi')\n");
        let result = reviewer(fs)
            .process(map(json!({
                "action": "verify_fix",
                "fix": { "files": ["api/users.py"], "update_tests": false },
            })))
            .await
            .unwrap();

        assert_eq!(result["status"], "success");
        assert_eq!(
            result["suggestions"],
            json!(["Consider using logging instead of print statements"])
        );
    }

    #[tokio::test]
    async fn disallowed_action_is_an_error_status() {
        let result = reviewer(MemoryFileSystem::new())
            .process(map(json!({ "action": "deploy" })))
            .await
            .unwrap();
        assert_eq!(result["status"], "error");
        assert_eq!(result["error"], "Action not allowed: deploy");
    }

    #[test]
    fn coverage_counts_testable_sources() {
        let paths = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(ReviewerCapability::<MemoryFileSystem>::coverage(&paths(&["src/a.css"])), 100.0);
        assert_eq!(
            ReviewerCapability::<MemoryFileSystem>::coverage(&paths(&["src/A.tsx", "src/B.tsx", "src/A.test.tsx"])),
            50.0
        );
    }
}
