//! Built-in `architect` capability.
//!
//! Static analysis of a project tree and architecture templating. Manifests
//! (`package.json`, `requirements.txt`, `pyproject.toml`) are read through the
//! `FileSystem` port; nothing is fetched over the network.
//!
//! Actions: `analyze_structure`, `design_architecture`,
//! `validate_deployment`. Deployment problems are answered with
//! `status: invalid` and a human-readable `reason`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use conductor_types::JsonMap;
use conductor_types::config::{ArchitectConfig, ConductorConfig, DomainRules};
use conductor_types::error::{CapabilityError, FileError};
use serde::Serialize;
use serde_json::{Value, json};

use crate::fs::FileSystem;

use super::Capability;
use super::domain::{error_result, object_field};

const MANIFESTS: [&str; 3] = ["package.json", "requirements.txt", "pyproject.toml"];

const REQUIRED_DEPLOYMENT_FIELDS: [&str; 4] = ["app_name", "port", "environment", "stack"];

pub struct ArchitectCapability<F: FileSystem> {
    fs: Arc<F>,
    tree_focus: BTreeMap<String, DomainRules>,
    settings: ArchitectConfig,
}

/// What the analysis found for one domain.
#[derive(Debug, Default, Serialize)]
struct DomainStructure {
    exists: bool,
    framework: Option<&'static str>,
    dependencies: Vec<String>,
    files: Vec<String>,
}

type Structure = BTreeMap<String, DomainStructure>;

// ---------------------------------------------------------------------------
// Manifests
// ---------------------------------------------------------------------------

/// Packages declared by one manifest file.
#[derive(Debug, Default, PartialEq)]
struct Manifest {
    framework: Option<&'static str>,
    dependencies: Vec<String>,
}

impl Manifest {
    /// Parse `content` according to the manifest `file_name`. Returns `None`
    /// for files that are not manifests.
    fn parse(file_name: &str, content: &str) -> Option<Self> {
        match file_name {
            "package.json" => Some(Self::from_package_json(content)),
            "requirements.txt" => Some(Self::python(
                content
                    .lines()
                    .filter_map(|line| line.split_once("=="))
                    .map(|(name, _)| name.trim().to_string())
                    .collect(),
            )),
            "pyproject.toml" => Some(Self::from_pyproject(content)),
            _ => None,
        }
    }

    fn from_package_json(content: &str) -> Self {
        let Ok(package) = serde_json::from_str::<Value>(content) else {
            return Self::default();
        };
        let mut dependencies: Vec<String> = Vec::new();
        for section in ["dependencies", "devDependencies"] {
            if let Some(deps) = package.get(section).and_then(Value::as_object) {
                for name in deps.keys() {
                    if !dependencies.contains(name) {
                        dependencies.push(name.clone());
                    }
                }
            }
        }

        let has = |name: &str| dependencies.iter().any(|d| d == name);
        let framework = if has("react") {
            Some(if has("next") { "next" } else { "react" })
        } else if has("vue") {
            Some("vue")
        } else {
            None
        };
        Self {
            framework,
            dependencies,
        }
    }

    /// Poetry dependency table of a `pyproject.toml`.
    fn from_pyproject(content: &str) -> Self {
        let Ok(table) = content.parse::<toml::Table>() else {
            return Self::default();
        };
        let dependencies = table
            .get("tool")
            .and_then(|tool| tool.get("poetry"))
            .and_then(|poetry| poetry.get("dependencies"))
            .and_then(toml::Value::as_table)
            .map(|deps| deps.keys().cloned().collect())
            .unwrap_or_default();
        Self::python(dependencies)
    }

    fn python(dependencies: Vec<String>) -> Self {
        let framework = ["fastapi", "flask", "django"]
            .into_iter()
            .find(|framework| dependencies.iter().any(|d| d == framework));
        Self {
            framework,
            dependencies,
        }
    }
}

// ---------------------------------------------------------------------------
// Design templates
// ---------------------------------------------------------------------------

fn frontend_design(framework: Option<&str>, features: &[&str]) -> Value {
    let Some(framework) = framework else {
        return Value::Null;
    };
    let mut components = vec![json!({ "name": "App", "type": "root", "children": [] })];
    if features.contains(&"authentication") {
        components.extend([
            json!({ "name": "AuthProvider", "type": "context" }),
            json!({ "name": "LoginForm", "type": "form" }),
            json!({ "name": "ProtectedRoute", "type": "hoc" }),
        ]);
    }
    if features.contains(&"dashboard") {
        components.extend([
            json!({ "name": "Dashboard", "type": "page" }),
            json!({ "name": "Sidebar", "type": "navigation" }),
            json!({ "name": "Header", "type": "navigation" }),
        ]);
    }

    let routing = if framework == "next" { "file-based" } else { "react-router" };
    let state_management = if features.contains(&"api") {
        "react-query"
    } else {
        "react-context"
    };
    json!({
        "framework": framework,
        "components": components,
        "routing": routing,
        "state_management": state_management,
    })
}

fn backend_design(framework: Option<&str>, features: &[&str]) -> Value {
    let Some(framework) = framework else {
        return Value::Null;
    };
    let mut endpoints = Vec::new();
    if features.contains(&"authentication") {
        endpoints.extend([
            json!({ "path": "/api/auth/login", "methods": ["POST"], "auth_required": false }),
            json!({ "path": "/api/auth/register", "methods": ["POST"], "auth_required": false }),
        ]);
    }
    if features.contains(&"dashboard") {
        endpoints.push(json!({ "path": "/api/dashboard", "methods": ["GET"], "auth_required": true }));
    }

    let database = if matches!(framework, "fastapi" | "flask") {
        "sqlalchemy"
    } else {
        "django-orm"
    };
    json!({
        "framework": framework,
        "database": database,
        "authentication": "jwt",
        "endpoints": endpoints,
    })
}

/// Domain names in a `stack`, given as an object keyed by domain, a list,
/// or a single name.
fn stack_domains(stack: &Value) -> Vec<String> {
    match stack {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::String(name) => vec![name.clone()],
        _ => Vec::new(),
    }
}

fn invalid(reason: String) -> JsonMap {
    let mut result = JsonMap::new();
    result.insert("status".to_string(), json!("invalid"));
    result.insert("reason".to_string(), Value::String(reason));
    result
}

impl<F: FileSystem> ArchitectCapability<F> {
    pub fn new(fs: Arc<F>, config: &ConductorConfig) -> Self {
        Self {
            fs,
            tree_focus: config.tree_focus.clone(),
            settings: config.agents.architect.clone(),
        }
    }

    /// Walk `root` and sort its files and manifests into domains. A missing
    /// root yields an empty structure.
    async fn scan(&self, root: &Path) -> Result<Structure, FileError> {
        let mut structure: Structure = self
            .tree_focus
            .keys()
            .map(|domain| (domain.clone(), DomainStructure::default()))
            .collect();

        let files = match self.fs.list_files(root).await {
            Ok(files) => files,
            Err(FileError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        for relative in &files {
            let path = relative.to_string_lossy();
            let file_name = relative
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            for (domain, rules) in &self.tree_focus {
                let Some(entry) = structure.get_mut(domain) else {
                    continue;
                };
                if rules.contains(&path) {
                    entry.exists = true;
                    entry.files.push(path.to_string());
                }
                if !rules.owns(&path) || !MANIFESTS.contains(&file_name.as_str()) {
                    continue;
                }
                let content = match self.fs.read_file(&join(root, relative)).await {
                    Ok(content) => content,
                    Err(e) => {
                        tracing::debug!(path = %path, error = %e, "skipping unreadable file");
                        continue;
                    }
                };
                let Some(manifest) = Manifest::parse(&file_name, &content) else {
                    continue;
                };
                entry.framework = entry.framework.or(manifest.framework);
                for dep in manifest.dependencies {
                    if !entry.dependencies.contains(&dep) {
                        entry.dependencies.push(dep);
                    }
                }
            }
        }
        Ok(structure)
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    async fn analyze_structure(&self, root: &Path) -> JsonMap {
        match self.scan(root).await {
            Ok(structure) => {
                tracing::debug!(root = %root.display(), "project structure analyzed");
                let mut result = JsonMap::new();
                result.insert("status".to_string(), json!("valid"));
                result.insert("structure".to_string(), json!(structure));
                result
            }
            Err(e) => error_result(
                "Failed to analyze project structure",
                None,
                Some(e.to_string()),
            ),
        }
    }

    fn design_architecture(&self, requirements: &JsonMap) -> JsonMap {
        let stack = requirements.get("stack").cloned().unwrap_or(Value::Null);
        let features: Vec<&str> = requirements
            .get("features")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let environment = requirements
            .get("environment")
            .and_then(Value::as_str)
            .unwrap_or("development");
        let port = |key: &str, default: u64| {
            requirements.get(key).cloned().unwrap_or_else(|| json!(default))
        };

        let architecture = json!({
            "frontend": frontend_design(stack.get("frontend").and_then(Value::as_str), &features),
            "backend": backend_design(stack.get("backend").and_then(Value::as_str), &features),
            "deployment": {
                "frontend": { "port": port("port", 3000), "environment": environment },
                "backend": { "port": port("backend_port", 8000), "environment": environment },
            },
        });

        let mut result = JsonMap::new();
        result.insert("status".to_string(), json!("designed"));
        result.insert("architecture".to_string(), architecture);
        result
    }

    async fn validate_deployment(&self, requirements: &JsonMap) -> JsonMap {
        if let Some(field) = REQUIRED_DEPLOYMENT_FIELDS
            .iter()
            .find(|field| !requirements.contains_key(**field))
        {
            return invalid(format!("Missing required field: {field}"));
        }

        let rules = &self.settings.validation_rules;
        let port = requirements["port"].as_u64().filter(|p| rules.port_range.contains(*p));
        let Some(port) = port else {
            return invalid(format!(
                "Invalid port number. Must be between {} and {}",
                rules.port_range.min, rules.port_range.max
            ));
        };

        let environment = requirements["environment"].as_str().unwrap_or_default();
        if !rules.environments.iter().any(|e| e == environment) {
            return invalid(format!(
                "Invalid environment. Must be one of: {}",
                rules.environments.join(", ")
            ));
        }

        let domains = stack_domains(&requirements["stack"]);
        if let Some(unknown) = domains.iter().find(|d| !self.tree_focus.contains_key(*d)) {
            return invalid(format!("Unknown stack domain: {unknown}"));
        }

        let root = requirements
            .get("path")
            .and_then(Value::as_str)
            .unwrap_or(".");
        let structure = match self.scan(Path::new(root)).await {
            Ok(structure) => structure,
            Err(e) => {
                return error_result(
                    "Failed to analyze project structure",
                    None,
                    Some(e.to_string()),
                );
            }
        };

        let mut tasks = Vec::new();
        for domain in &domains {
            let (Some(rules), Some(found)) = (self.tree_focus.get(domain), structure.get(domain))
            else {
                continue;
            };
            let missing: Vec<&str> = rules
                .expected_dependencies()
                .filter(|dep| !found.dependencies.iter().any(|d| d.starts_with(*dep)))
                .collect();
            if !missing.is_empty() {
                tasks.push(json!({
                    "action": "update_dependencies",
                    "domain": domain,
                    "dependencies": missing,
                }));
            }
        }

        tracing::info!(
            app = requirements["app_name"].as_str().unwrap_or_default(),
            environment,
            tasks = tasks.len(),
            "deployment validated"
        );
        let mut result = JsonMap::new();
        result.insert("status".to_string(), json!("valid"));
        result.insert(
            "configuration".to_string(),
            json!({
                "app_name": requirements["app_name"],
                "port": port,
                "environment": environment,
                "stack": requirements["stack"],
            }),
        );
        result.insert("structure".to_string(), json!(structure));
        result.insert("tasks".to_string(), Value::Array(tasks));
        result
    }
}

/// `relative` below `root`, without a leading `./` for the current directory.
fn join(root: &Path, relative: &Path) -> PathBuf {
    if root.as_os_str().is_empty() || root == Path::new(".") {
        relative.to_path_buf()
    } else {
        root.join(relative)
    }
}

impl<F: FileSystem> Capability for ArchitectCapability<F> {
    fn name(&self) -> &str {
        "architect"
    }

    async fn process(&self, input: JsonMap) -> Result<JsonMap, CapabilityError> {
        let action = input.get("action").and_then(Value::as_str).unwrap_or_default();
        if !self.settings.allowed_actions.iter().any(|a| a == action) {
            return Ok(error_result(format!("Action not allowed: {action}"), None, None));
        }

        match action {
            "analyze_structure" => {
                let root = input.get("path").and_then(Value::as_str).unwrap_or(".");
                Ok(self.analyze_structure(Path::new(root)).await)
            }
            "design_architecture" => {
                Ok(self.design_architecture(object_field(&input, "requirements")?))
            }
            "validate_deployment" => Ok(self
                .validate_deployment(object_field(&input, "requirements")?)
                .await),
            other => Ok(error_result(format!("Unknown action: {other}"), None, None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryFileSystem, map};

    const PACKAGE_JSON: &str = r#"{
        "dependencies": { "react": "^18.2.0", "next": "14.1.0" },
        "devDependencies": { "typescript": "^5.0.0", "react": "^18.2.0" }
    }"#;

    fn architect(fs: MemoryFileSystem) -> ArchitectCapability<MemoryFileSystem> {
        ArchitectCapability::new(Arc::new(fs), &ConductorConfig::default())
    }

    fn project() -> MemoryFileSystem {
        MemoryFileSystem::new()
            .with_file("src/App.tsx", "export default function App() {}")
            .with_file("src/package.json", PACKAGE_JSON)
            .with_file("api/main.py", "app = FastAPI()")
            .with_file("api/requirements.txt", "fastapi==0.110.0\nuvicorn>=0.29\npydantic==2.6.0\n")
            .with_file("docs/guide.md", "# Guide")
    }

    fn deployment(stack: Value) -> JsonMap {
        map(json!({
            "action": "validate_deployment",
            "requirements": {
                "app_name": "shop",
                "port": 8080,
                "environment": "staging",
                "stack": stack,
            },
        }))
    }

    #[test]
    fn manifests_are_parsed_by_file_name() {
        let package = Manifest::parse("package.json", PACKAGE_JSON).unwrap();
        assert_eq!(package.framework, Some("next"));
        assert_eq!(package.dependencies, vec!["next", "react", "typescript"]);

        let pyproject = Manifest::parse(
            "pyproject.toml",
            "[tool.poetry.dependencies]\npython = \"^3.11\"\ndjango = \"^5.0\"\n",
        )
        .unwrap();
        assert_eq!(pyproject.framework, Some("django"));
        assert_eq!(pyproject.dependencies, vec!["django", "python"]);

        let vue = Manifest::parse("package.json", r#"{"dependencies":{"vue":"3"}}"#).unwrap();
        assert_eq!(vue.framework, Some("vue"));

        assert_eq!(Manifest::parse("package.json", "not json"), Some(Manifest::default()));
        assert_eq!(Manifest::parse("Cargo.toml", ""), None);
    }

    #[tokio::test]
    async fn analyze_structure_sorts_files_into_domains() {
        let result = architect(project())
            .process(map(json!({ "action": "analyze_structure" })))
            .await
            .unwrap();

        assert_eq!(result["status"], "valid");
        let frontend = &result["structure"]["frontend"];
        assert_eq!(frontend["exists"], true);
        assert_eq!(frontend["framework"], "next");
        assert_eq!(frontend["files"], json!(["src/App.tsx"]));
        assert_eq!(frontend["dependencies"], json!(["next", "react", "typescript"]));

        let backend = &result["structure"]["backend"];
        assert_eq!(backend["framework"], "fastapi");
        assert_eq!(backend["files"], json!(["api/main.py"]));
        assert_eq!(backend["dependencies"], json!(["fastapi", "pydantic"]));
    }

    #[tokio::test]
    async fn missing_project_directory_is_an_empty_structure() {
        let result = architect(project())
            .process(map(json!({ "action": "analyze_structure", "path": "elsewhere" })))
            .await
            .unwrap();

        assert_eq!(result["status"], "valid");
        assert_eq!(result["structure"]["frontend"]["exists"], false);
        assert_eq!(result["structure"]["backend"]["framework"], Value::Null);
    }

    #[tokio::test]
    async fn design_architecture_follows_stack_and_features() {
        let result = architect(MemoryFileSystem::new())
            .process(map(json!({
                "action": "design_architecture",
                "requirements": {
                    "stack": { "frontend": "next", "backend": "fastapi" },
                    "features": ["authentication", "api"],
                    "port": 3100,
                },
            })))
            .await
            .unwrap();

        assert_eq!(result["status"], "designed");
        let architecture = &result["architecture"];
        let names: Vec<&str> = architecture["frontend"]["components"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["App", "AuthProvider", "LoginForm", "ProtectedRoute"]);
        assert_eq!(architecture["frontend"]["routing"], "file-based");
        assert_eq!(architecture["frontend"]["state_management"], "react-query");
        assert_eq!(architecture["backend"]["database"], "sqlalchemy");
        assert_eq!(architecture["backend"]["endpoints"].as_array().unwrap().len(), 2);
        assert_eq!(architecture["deployment"]["frontend"]["port"], 3100);
        assert_eq!(architecture["deployment"]["backend"]["port"], 8000);
        assert_eq!(architecture["deployment"]["backend"]["environment"], "development");
    }

    #[tokio::test]
    async fn design_without_backend_leaves_it_empty() {
        let result = architect(MemoryFileSystem::new())
            .process(map(json!({
                "action": "design_architecture",
                "requirements": { "stack": { "frontend": "react" }, "features": ["dashboard"] },
            })))
            .await
            .unwrap();

        let architecture = &result["architecture"];
        assert_eq!(architecture["backend"], Value::Null);
        assert_eq!(architecture["frontend"]["routing"], "react-router");
        assert_eq!(architecture["frontend"]["components"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn deployment_requests_are_checked_in_order() {
        let architect = architect(MemoryFileSystem::new());

        let mut missing = deployment(json!(["frontend"]));
        missing["requirements"].as_object_mut().unwrap().remove("stack");
        let result = architect.process(missing).await.unwrap();
        assert_eq!(result["status"], "invalid");
        assert_eq!(result["reason"], "Missing required field: stack");

        let mut low_port = deployment(json!(["frontend"]));
        low_port["requirements"]["port"] = json!(80);
        let result = architect.process(low_port).await.unwrap();
        assert_eq!(
            result["reason"],
            "Invalid port number. Must be between 1024 and 65535"
        );

        let mut environment = deployment(json!(["frontend"]));
        environment["requirements"]["environment"] = json!("qa");
        let result = architect.process(environment).await.unwrap();
        assert_eq!(
            result["reason"],
            "Invalid environment. Must be one of: development, staging, production"
        );

        let result = architect.process(deployment(json!(["mobile"]))).await.unwrap();
        assert_eq!(result["reason"], "Unknown stack domain: mobile");
    }

    #[tokio::test]
    async fn deployment_lists_missing_dependencies_as_tasks() {
        let fs = MemoryFileSystem::new()
            .with_file("src/package.json", r#"{"dependencies":{"react":"18"}}"#)
            .with_file("api/requirements.txt", "flask==3.0\n");
        let result = architect(fs)
            .process(deployment(json!({ "frontend": "react", "backend": "flask" })))
            .await
            .unwrap();

        assert_eq!(result["status"], "valid");
        assert_eq!(result["configuration"]["port"], 8080);
        assert_eq!(result["configuration"]["environment"], "staging");
        assert_eq!(
            result["tasks"],
            json!([
                { "action": "update_dependencies", "domain": "backend", "dependencies": ["fastapi"] },
                { "action": "update_dependencies", "domain": "frontend", "dependencies": ["react-dom"] },
            ])
        );
    }

    #[tokio::test]
    async fn satisfied_deployment_has_no_tasks() {
        let fs = MemoryFileSystem::new().with_file(
            "src/package.json",
            r#"{"dependencies":{"react":"18","react-dom":"18"}}"#,
        );
        let result = architect(fs)
            .process(deployment(json!("frontend")))
            .await
            .unwrap();

        assert_eq!(result["status"], "valid");
        assert_eq!(result["tasks"], json!([]));
        assert_eq!(result["structure"]["frontend"]["framework"], "react");
    }

    #[tokio::test]
    async fn disallowed_action_is_an_error_status() {
        let mut config = ConductorConfig::default();
        config.agents.architect.allowed_actions = vec!["analyze_structure".to_string()];
        let architect = ArchitectCapability::new(Arc::new(MemoryFileSystem::new()), &config);

        let result = architect
            .process(map(json!({ "action": "design_architecture", "requirements": {} })))
            .await
            .unwrap();
        assert_eq!(result["status"], "error");
        assert_eq!(result["error"], "Action not allowed: design_architecture");

        let result = architect
            .process(map(json!({ "action": "analyze_structure", "path": 7 })))
            .await
            .unwrap();
        assert_eq!(result["status"], "valid");
    }
}
