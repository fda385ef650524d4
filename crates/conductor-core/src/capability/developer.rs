//! Built-in `developer` capability.
//!
//! Creates and updates source files inside the configured domains, enforcing
//! each domain's directories and component naming convention, and generates
//! skeleton tests next to new files.
//!
//! Actions: `create_component`, `update_component`, `implement_feature`,
//! `fix_issue`. Rule violations are answered with `status: error` and a
//! structured `reason` (`domain_boundary`, `naming_convention`, `file_path`).

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use conductor_types::JsonMap;
use conductor_types::config::{ConductorConfig, DeveloperConfig, DomainRules, domain_owning};
use conductor_types::error::CapabilityError;
use serde_json::{Value, json};

use crate::fs::FileSystem;

use super::Capability;
use super::domain::{
    FileSpec, error_result, file_specs, is_error, object_field, test_content_for, test_path_for,
};

pub struct DeveloperCapability<F: FileSystem> {
    fs: Arc<F>,
    tree_focus: BTreeMap<String, DomainRules>,
    settings: DeveloperConfig,
}

impl<F: FileSystem> DeveloperCapability<F> {
    pub fn new(fs: Arc<F>, config: &ConductorConfig) -> Self {
        Self {
            fs,
            tree_focus: config.tree_focus.clone(),
            settings: config.agents.developer.clone(),
        }
    }

    /// Explicit `domain` when it is configured, else the first domain owning
    /// one of the component's file paths.
    fn resolve_domain(&self, component: &JsonMap) -> Option<(&str, &DomainRules)> {
        if let Some(domain) = component.get("domain").and_then(Value::as_str) {
            if let Some((name, rules)) = self.tree_focus.get_key_value(domain) {
                return Some((name.as_str(), rules));
            }
        }
        file_specs(component)
            .iter()
            .find_map(|spec| domain_owning(&self.tree_focus, &spec.path))
    }

    fn require_tests(&self, domain: &str) -> bool {
        self.settings
            .domain_rules
            .get(domain)
            .is_none_or(|rules| rules.require_tests)
    }

    async fn write(&self, path: &str, content: &str) -> Result<(), String> {
        self.fs
            .write_file(Path::new(path), content)
            .await
            .map_err(|e| e.to_string())
    }

    /// Write a skeleton test for every source in `sources` that has one.
    /// Returns the test paths, or the first failing path and its error.
    async fn write_tests(&self, sources: &[String]) -> Result<Vec<String>, (String, String)> {
        let mut written = Vec::new();
        for source in sources {
            let Some(test_path) = test_path_for(source) else {
                continue;
            };
            self.write(&test_path, &test_content_for(source))
                .await
                .map_err(|e| (test_path.clone(), e))?;
            written.push(test_path);
        }
        Ok(written)
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    async fn create_component(&self, component: &JsonMap) -> Result<JsonMap, CapabilityError> {
        let Some((domain, rules)) = self.resolve_domain(component) else {
            return Ok(error_result(
                "Component domain not recognized",
                Some("domain_boundary"),
                Some("Component must belong to a domain defined in tree_focus".to_string()),
            ));
        };

        let name = component
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| CapabilityError::InvalidInput("component has no 'name'".to_string()))?;
        if let Some(convention) = rules.naming_conventions.component_convention() {
            if !convention.matches(name) {
                return Ok(error_result(
                    "Invalid naming convention",
                    Some("naming_convention"),
                    Some(format!("Component name must follow {convention} in {domain}")),
                ));
            }
        }

        let specs = file_specs(component);
        if let Some(stray) = specs.iter().find(|spec| !rules.owns(&spec.path)) {
            return Ok(error_result(
                "Invalid file path",
                Some("file_path"),
                Some(format!(
                    "{} must be in one of {:?}",
                    stray.path, rules.directories
                )),
            ));
        }

        let mut created: Vec<String> = Vec::new();
        for FileSpec { path, content } in &specs {
            if let Err(e) = self.write(path, content).await {
                return Ok(error_result(format!("Failed to create file {path}"), None, Some(e)));
            }
            created.push(path.clone());
        }

        if self.require_tests(domain) {
            let tests = self.write_tests(&created).await;
            match tests {
                Ok(paths) => created.extend(paths),
                Err((path, e)) => {
                    return Ok(error_result(
                        format!("Failed to create test file {path}"),
                        None,
                        Some(e),
                    ));
                }
            }
        }

        tracing::info!(component = name, domain, files = created.len(), "component created");
        Ok(json_map(json!({ "status": "success", "files": created, "domain": domain })))
    }

    async fn update_component(&self, component: &JsonMap) -> Result<JsonMap, CapabilityError> {
        let root = component.get("path").and_then(Value::as_str).unwrap_or_default();
        if root.is_empty() || !self.fs.exists(Path::new(root)).await {
            return Ok(error_result(
                "Component does not exist",
                None,
                Some(format!("'{root}' was not found")),
            ));
        }
        let Some((domain, _)) = self.resolve_domain(component) else {
            return Ok(error_result(
                "Component domain not recognized",
                Some("domain_boundary"),
                None,
            ));
        };

        let mut updated: Vec<String> = Vec::new();
        for FileSpec { path, content } in file_specs(component) {
            if !self.fs.exists(Path::new(&path)).await {
                tracing::debug!(path = %path, "skipping update of missing file");
                continue;
            }
            if let Err(e) = self.write(&path, &content).await {
                return Ok(error_result(format!("Failed to update file {path}"), None, Some(e)));
            }
            if let Some(test_path) = test_path_for(&path) {
                if self.fs.exists(Path::new(&test_path)).await {
                    if let Err(e) = self.write(&test_path, &test_content_for(&path)).await {
                        return Ok(error_result(
                            format!("Failed to update test file {test_path}"),
                            None,
                            Some(e),
                        ));
                    }
                    updated.push(path);
                    updated.push(test_path);
                    continue;
                }
            }
            updated.push(path);
        }

        Ok(json_map(json!({ "status": "updated", "files": updated, "domain": domain })))
    }

    async fn implement_feature(&self, feature: &JsonMap) -> Result<JsonMap, CapabilityError> {
        let domain = feature.get("domain").and_then(Value::as_str).unwrap_or_default();
        if !self.tree_focus.contains_key(domain) {
            return Ok(error_result(
                "Invalid feature domain",
                Some("domain_boundary"),
                Some(format!("'{domain}' is not defined in tree_focus")),
            ));
        }

        let mut created: Vec<Value> = Vec::new();
        for component in objects(feature.get("components")) {
            let component = with_default_domain(component, domain);
            let result = self.create_component(&component).await?;
            if is_error(&result) {
                return Ok(result);
            }
            created.extend(files_of(&result));
        }

        let mut updated: Vec<Value> = Vec::new();
        for component in objects(feature.get("updates")) {
            let component = with_default_domain(component, domain);
            let result = self.update_component(&component).await?;
            if is_error(&result) {
                return Ok(result);
            }
            updated.extend(files_of(&result));
        }

        Ok(json_map(json!({
            "status": "implemented",
            "created": created,
            "updated": updated,
            "domain": domain,
        })))
    }

    async fn fix_issue(&self, issue: &JsonMap) -> Result<JsonMap, CapabilityError> {
        let mut files: Vec<String> = Vec::new();
        for FileSpec { path, content } in file_specs(issue) {
            if let Err(e) = self.write(&path, &content).await {
                return Ok(error_result(format!("Failed to update file {path}"), None, Some(e)));
            }
            files.push(path);
        }

        let update_tests = issue
            .get("update_tests")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if update_tests {
            match self.write_tests(&files).await {
                Ok(paths) => files.extend(paths),
                Err((path, e)) => {
                    return Ok(error_result(
                        format!("Failed to update test file {path}"),
                        None,
                        Some(e),
                    ));
                }
            }
        }

        Ok(json_map(json!({ "status": "success", "files": files })))
    }
}

impl<F: FileSystem> Capability for DeveloperCapability<F> {
    fn name(&self) -> &str {
        "developer"
    }

    async fn process(&self, input: JsonMap) -> Result<JsonMap, CapabilityError> {
        let action = input.get("action").and_then(Value::as_str).unwrap_or_default();
        if !self.settings.allowed_actions.iter().any(|a| a == action) {
            return Ok(error_result(format!("Action not allowed: {action}"), None, None));
        }

        match action {
            "create_component" => self.create_component(object_field(&input, "component")?).await,
            "update_component" => self.update_component(object_field(&input, "component")?).await,
            "implement_feature" => self.implement_feature(object_field(&input, "feature")?).await,
            "fix_issue" => self.fix_issue(object_field(&input, "issue")?).await,
            other => Ok(error_result(format!("Unknown action: {other}"), None, None)),
        }
    }
}

fn json_map(value: Value) -> JsonMap {
    match value {
        Value::Object(map) => map,
        _ => JsonMap::new(),
    }
}

fn objects(value: Option<&Value>) -> impl Iterator<Item = &JsonMap> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn with_default_domain(component: &JsonMap, domain: &str) -> JsonMap {
    let mut component = component.clone();
    component
        .entry("domain")
        .or_insert_with(|| Value::String(domain.to_string()));
    component
}

fn files_of(result: &JsonMap) -> Vec<Value> {
    result
        .get("files")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryFileSystem, map};

    fn developer(fs: &Arc<MemoryFileSystem>) -> DeveloperCapability<MemoryFileSystem> {
        DeveloperCapability::new(Arc::clone(fs), &ConductorConfig::default())
    }

    fn create_input(component: Value) -> JsonMap {
        map(json!({ "action": "create_component", "component": component }))
    }

    #[tokio::test]
    async fn create_component_writes_files_and_tests() {
        let fs = Arc::new(MemoryFileSystem::new());
        let result = developer(&fs)
            .process(create_input(json!({
                "name": "UserCard",
                "domain": "frontend",
                "files": [{ "path": "src/UserCard.tsx", "content": "export const UserCard = () => null;" }],
            })))
            .await
            .unwrap();

        assert_eq!(result["status"], "success");
        assert_eq!(result["domain"], "frontend");
        assert_eq!(result["files"], json!(["src/UserCard.tsx", "src/UserCard.test.tsx"]));
        assert_eq!(
            fs.content("src/UserCard.tsx").as_deref(),
            Some("export const UserCard = () => null;")
        );
        assert!(fs.content("src/UserCard.test.tsx").unwrap().contains("describe('UserCard'"));
    }

    #[tokio::test]
    async fn create_component_infers_domain_from_paths() {
        let fs = Arc::new(MemoryFileSystem::new());
        let result = developer(&fs)
            .process(create_input(json!({
                "name": "user_store",
                "files": [{ "path": "api/user_store.py", "content": "" }],
            })))
            .await
            .unwrap();

        assert_eq!(result["domain"], "backend");
        assert_eq!(result["files"], json!(["api/user_store.py", "api/test_user_store.py"]));
    }

    #[tokio::test]
    async fn create_component_rejects_unknown_domain() {
        let fs = Arc::new(MemoryFileSystem::new());
        let result = developer(&fs)
            .process(create_input(json!({
                "name": "Thing",
                "files": [{ "path": "docs/thing.md" }],
            })))
            .await
            .unwrap();

        assert_eq!(result["status"], "error");
        assert_eq!(result["reason"], "domain_boundary");
        assert!(fs.paths().is_empty());
    }

    #[tokio::test]
    async fn create_component_rejects_bad_name() {
        let fs = Arc::new(MemoryFileSystem::new());
        let result = developer(&fs)
            .process(create_input(json!({
                "name": "user_card",
                "domain": "frontend",
                "files": [{ "path": "src/user_card.tsx" }],
            })))
            .await
            .unwrap();

        assert_eq!(result["error"], "Invalid naming convention");
        assert_eq!(result["reason"], "naming_convention");
        assert!(fs.paths().is_empty());
    }

    #[tokio::test]
    async fn create_component_rejects_stray_path_before_writing() {
        let fs = Arc::new(MemoryFileSystem::new());
        let result = developer(&fs)
            .process(create_input(json!({
                "name": "UserCard",
                "domain": "frontend",
                "files": [
                    { "path": "src/UserCard.tsx" },
                    { "path": "lib/UserCard.css" },
                ],
            })))
            .await
            .unwrap();

        assert_eq!(result["error"], "Invalid file path");
        assert_eq!(result["reason"], "file_path");
        assert!(fs.paths().is_empty());
    }

    #[tokio::test]
    async fn create_component_skips_tests_when_not_required() {
        let fs = Arc::new(MemoryFileSystem::new());
        let mut config = ConductorConfig::default();
        config.agents.developer.domain_rules.insert(
            "frontend".to_string(),
            conductor_types::config::DomainBuildRules {
                require_tests: false,
                ..Default::default()
            },
        );
        let developer = DeveloperCapability::new(Arc::clone(&fs), &config);

        let result = developer
            .process(create_input(json!({
                "name": "UserCard",
                "domain": "frontend",
                "files": [{ "path": "src/UserCard.tsx" }],
            })))
            .await
            .unwrap();

        assert_eq!(result["files"], json!(["src/UserCard.tsx"]));
    }

    #[tokio::test]
    async fn create_component_reports_write_failure() {
        let fs = Arc::new(MemoryFileSystem::new().with_broken("src/UserCard.tsx"));
        let result = developer(&fs)
            .process(create_input(json!({
                "name": "UserCard",
                "domain": "frontend",
                "files": [{ "path": "src/UserCard.tsx" }],
            })))
            .await
            .unwrap();

        assert_eq!(result["status"], "error");
        assert_eq!(result["error"], "Failed to create file src/UserCard.tsx");
        assert!(result.get("reason").is_none());
    }

    #[tokio::test]
    async fn disallowed_action_is_an_error_status() {
        let fs = Arc::new(MemoryFileSystem::new());
        let mut config = ConductorConfig::default();
        config.agents.developer.allowed_actions = vec!["fix_issue".to_string()];
        let developer = DeveloperCapability::new(Arc::clone(&fs), &config);

        let result = developer
            .process(map(json!({ "action": "create_component", "component": {} })))
            .await
            .unwrap();

        assert_eq!(result["status"], "error");
        assert_eq!(result["error"], "Action not allowed: create_component");
    }

    #[tokio::test]
    async fn missing_payload_is_invalid_input() {
        let fs = Arc::new(MemoryFileSystem::new());
        let err = developer(&fs)
            .process(map(json!({ "action": "fix_issue" })))
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn update_component_rewrites_existing_files_only() {
        let fs = Arc::new(
            MemoryFileSystem::new()
                .with_file("src/UserCard", "")
                .with_file("src/UserCard.tsx", "old")
                .with_file("src/UserCard.test.tsx", "old test"),
        );
        let result = developer(&fs)
            .process(map(json!({
                "action": "update_component",
                "component": {
                    "path": "src/UserCard",
                    "files": [
                        { "path": "src/UserCard.tsx", "content": "new" },
                        { "path": "src/Missing.tsx", "content": "ignored" },
                    ],
                },
            })))
            .await
            .unwrap();

        assert_eq!(result["status"], "updated");
        assert_eq!(result["files"], json!(["src/UserCard.tsx", "src/UserCard.test.tsx"]));
        assert_eq!(fs.content("src/UserCard.tsx").as_deref(), Some("new"));
        assert!(fs.content("src/UserCard.test.tsx").unwrap().contains("describe"));
        assert!(fs.content("src/Missing.tsx").is_none());
    }

    #[tokio::test]
    async fn update_component_requires_existing_root() {
        let fs = Arc::new(MemoryFileSystem::new());
        let result = developer(&fs)
            .process(map(json!({
                "action": "update_component",
                "component": { "path": "src/Gone" },
            })))
            .await
            .unwrap();
        assert_eq!(result["status"], "error");
        assert_eq!(result["error"], "Component does not exist");
    }

    #[tokio::test]
    async fn implement_feature_creates_and_updates() {
        let fs = Arc::new(
            MemoryFileSystem::new()
                .with_file("src/App.tsx", "old")
                .with_file("src", ""),
        );
        let result = developer(&fs)
            .process(map(json!({
                "action": "implement_feature",
                "feature": {
                    "domain": "frontend",
                    "components": [
                        { "name": "Badge", "files": [{ "path": "src/Badge.tsx", "content": "b" }] },
                    ],
                    "updates": [
                        { "path": "src", "files": [{ "path": "src/App.tsx", "content": "new" }] },
                    ],
                },
            })))
            .await
            .unwrap();

        assert_eq!(result["status"], "implemented");
        assert_eq!(result["created"], json!(["src/Badge.tsx", "src/Badge.test.tsx"]));
        assert_eq!(result["updated"], json!(["src/App.tsx"]));
        assert_eq!(result["domain"], "frontend");
    }

    #[tokio::test]
    async fn implement_feature_returns_first_failure() {
        let fs = Arc::new(MemoryFileSystem::new());
        let result = developer(&fs)
            .process(map(json!({
                "action": "implement_feature",
                "feature": {
                    "domain": "frontend",
                    "components": [
                        { "name": "bad_name", "files": [{ "path": "src/bad_name.tsx" }] },
                        { "name": "Good", "files": [{ "path": "src/Good.tsx" }] },
                    ],
                },
            })))
            .await
            .unwrap();

        assert_eq!(result["reason"], "naming_convention");
        assert!(fs.paths().is_empty());
    }

    #[tokio::test]
    async fn implement_feature_rejects_unknown_domain() {
        let fs = Arc::new(MemoryFileSystem::new());
        let result = developer(&fs)
            .process(map(json!({
                "action": "implement_feature",
                "feature": { "domain": "mobile" },
            })))
            .await
            .unwrap();
        assert_eq!(result["error"], "Invalid feature domain");
    }

    #[tokio::test]
    async fn fix_issue_writes_files_and_optional_tests() {
        let fs = Arc::new(MemoryFileSystem::new());
        let result = developer(&fs)
            .process(map(json!({
                "action": "fix_issue",
                "issue": {
                    "update_tests": true,
                    "files": [{ "path": "api/users.py", "content": "def get():\n    return 1\n" }],
                },
            })))
            .await
            .unwrap();

        assert_eq!(result["status"], "success");
        assert_eq!(result["files"], json!(["api/users.py", "api/test_users.py"]));
        assert!(fs.content("api/test_users.py").unwrap().contains("class TestUsers"));
    }
}
