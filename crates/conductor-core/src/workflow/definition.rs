//! Workflow definition parsing, validation, and discovery.
//!
//! Converts YAML files into `WorkflowDefinition`s, validates structural
//! constraints (name format, non-empty steps, unique names), and assembles
//! the discovered definitions into a `WorkflowCatalog`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use conductor_types::workflow::{WorkflowDefinition, WorkflowFile};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur while loading workflow definitions.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// YAML parse failure.
    #[error("parse error: {0}")]
    ParseError(String),

    /// Structural validation failure.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Two definitions share a name.
    #[error("duplicate workflow name: '{0}'")]
    DuplicateName(String),

    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a YAML document into validated definitions.
///
/// The document is either a single definition or a `workflows:` catalog.
pub fn parse_workflow_yaml(yaml: &str) -> Result<Vec<WorkflowDefinition>, WorkflowError> {
    let file: WorkflowFile =
        serde_yaml_ng::from_str(yaml).map_err(|e| WorkflowError::ParseError(e.to_string()))?;
    let defs = file.into_definitions();
    for def in &defs {
        validate_definition(def)?;
    }
    Ok(defs)
}

/// Serialize a definition to YAML.
pub fn serialize_workflow_yaml(def: &WorkflowDefinition) -> Result<String, WorkflowError> {
    serde_yaml_ng::to_string(def).map_err(|e| WorkflowError::ParseError(e.to_string()))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate structural constraints on a definition.
///
/// Checks:
/// - Name is non-empty and contains only alphanumerics, hyphens, underscores
/// - At least one step exists
/// - Every step has a non-empty `type`
/// - An explicit `agent` is non-empty
pub fn validate_definition(def: &WorkflowDefinition) -> Result<(), WorkflowError> {
    if def.name.is_empty() {
        return Err(WorkflowError::ValidationError(
            "workflow name must not be empty".to_string(),
        ));
    }
    if !def
        .name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(WorkflowError::ValidationError(format!(
            "workflow name '{}' contains invalid characters (only alphanumerics, hyphens and underscores allowed)",
            def.name
        )));
    }

    if def.steps.is_empty() {
        return Err(WorkflowError::ValidationError(format!(
            "workflow '{}' must have at least one step",
            def.name
        )));
    }

    for (index, step) in def.steps.iter().enumerate() {
        if step.step_type.trim().is_empty() {
            return Err(WorkflowError::ValidationError(format!(
                "workflow '{}' step {} has an empty type",
                def.name, index
            )));
        }
        if step.agent.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err(WorkflowError::ValidationError(format!(
                "workflow '{}' step {} ('{}') has an empty agent",
                def.name, index, step.step_type
            )));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Named workflow definitions available to the engine.
#[derive(Debug, Clone, Default)]
pub struct WorkflowCatalog {
    workflows: BTreeMap<String, WorkflowDefinition>,
}

impl WorkflowCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog, rejecting duplicate names.
    pub fn from_definitions(
        defs: impl IntoIterator<Item = WorkflowDefinition>,
    ) -> Result<Self, WorkflowError> {
        let mut catalog = Self::new();
        for def in defs {
            catalog.insert(def)?;
        }
        Ok(catalog)
    }

    /// Add a definition. Fails if the name is already taken.
    pub fn insert(&mut self, def: WorkflowDefinition) -> Result<(), WorkflowError> {
        if self.workflows.contains_key(&def.name) {
            return Err(WorkflowError::DuplicateName(def.name));
        }
        self.workflows.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&WorkflowDefinition> {
        self.workflows.get(name)
    }

    /// Definitions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &WorkflowDefinition> {
        self.workflows.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.workflows.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Filesystem operations
// ---------------------------------------------------------------------------

/// Load every definition from one YAML file.
pub fn load_workflow_file(path: &Path) -> Result<Vec<WorkflowDefinition>, WorkflowError> {
    let content = std::fs::read_to_string(path)?;
    parse_workflow_yaml(&content)
}

/// Discover all workflow YAML files under `base_dir`.
///
/// Scans for `.yaml` and `.yml` files recursively, in path order. Files that
/// fail to parse or validate are skipped with a warning.
pub fn discover_workflows(
    base_dir: &Path,
) -> Result<Vec<(PathBuf, WorkflowDefinition)>, WorkflowError> {
    let mut results = Vec::new();
    if !base_dir.exists() {
        return Ok(results);
    }
    discover_recursive(base_dir, &mut results)?;
    Ok(results)
}

fn discover_recursive(
    dir: &Path,
    results: &mut Vec<(PathBuf, WorkflowDefinition)>,
) -> Result<(), WorkflowError> {
    let mut paths = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.sort();

    for path in paths {
        if path.is_dir() {
            discover_recursive(&path, results)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml")
        {
            match load_workflow_file(&path) {
                Ok(defs) => results.extend(defs.into_iter().map(|def| (path.clone(), def))),
                Err(e) => {
                    tracing::warn!(?path, error = %e, "skipping unloadable workflow file");
                }
            }
        }
    }
    Ok(())
}

/// Discover workflows under `base_dir` and build a catalog.
pub fn load_catalog(base_dir: &Path) -> Result<WorkflowCatalog, WorkflowError> {
    let discovered = discover_workflows(base_dir)?;
    tracing::debug!(dir = %base_dir.display(), count = discovered.len(), "discovered workflows");
    WorkflowCatalog::from_definitions(discovered.into_iter().map(|(_, def)| def))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
