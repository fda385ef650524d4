//! Configuration types for Conductor.
//!
//! `ConductorConfig` represents the top-level `conductor.toml` in the
//! conductor home directory. Every section is optional; missing values fall
//! back to the defaults below.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConductorConfig {
    /// Engine dispatch defaults.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Directory holding workflow YAML files, relative to the home directory.
    #[serde(default = "default_workflows_dir")]
    pub workflows_dir: PathBuf,

    /// Domain layout rules keyed by domain name (e.g. "frontend").
    #[serde(default = "default_tree_focus")]
    pub tree_focus: BTreeMap<String, DomainRules>,

    /// Settings for the built-in capabilities.
    #[serde(default)]
    pub agents: AgentsConfig,
}

fn default_workflows_dir() -> PathBuf {
    PathBuf::from("workflows")
}

impl Default for ConductorConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            workflows_dir: default_workflows_dir(),
            tree_focus: default_tree_focus(),
            agents: AgentsConfig::default(),
        }
    }
}

/// The first domain (in name order) whose directories prefix `path`.
pub fn domain_owning<'a>(
    tree_focus: &'a BTreeMap<String, DomainRules>,
    path: &str,
) -> Option<(&'a str, &'a DomainRules)> {
    tree_focus
        .iter()
        .find(|(_, rules)| rules.owns(path))
        .map(|(name, rules)| (name.as_str(), rules))
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Dispatch defaults used by the orchestration engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capability used by steps that omit `agent`.
    #[serde(default = "default_agent")]
    pub default_agent: String,

    /// Capability used by the review gate.
    #[serde(default = "default_reviewer")]
    pub reviewer: String,

    /// Review action used when a step omits `review_type`.
    #[serde(default = "default_review_type")]
    pub default_review_type: String,

    /// Step types that receive a `code` augmentation.
    #[serde(default = "default_code_review_actions")]
    pub code_review_actions: Vec<String>,

    /// Step types that receive a `fix` augmentation.
    #[serde(default = "default_fix_verification_actions")]
    pub fix_verification_actions: Vec<String>,
}

fn default_agent() -> String {
    "developer".to_string()
}

fn default_reviewer() -> String {
    "reviewer".to_string()
}

fn default_review_type() -> String {
    "review_code".to_string()
}

fn default_code_review_actions() -> Vec<String> {
    vec!["review_code".to_string()]
}

fn default_fix_verification_actions() -> Vec<String> {
    vec!["verify_fix".to_string()]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_agent: default_agent(),
            reviewer: default_reviewer(),
            default_review_type: default_review_type(),
            code_review_actions: default_code_review_actions(),
            fix_verification_actions: default_fix_verification_actions(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tree focus
// ---------------------------------------------------------------------------

/// Layout rules for one domain of the source tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainRules {
    /// Path prefixes owned by the domain (e.g. "src/").
    #[serde(default)]
    pub directories: Vec<String>,

    /// File extensions expected in the domain (e.g. ".tsx").
    #[serde(default)]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub naming_conventions: NamingConventions,

    /// Packages a deployment of the domain expects, grouped by purpose
    /// (e.g. `frameworks`, `databases`). Entries match installed package
    /// names by prefix.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, Vec<String>>,
}

impl DomainRules {
    /// Whether `path` starts with one of the domain's directories.
    pub fn owns(&self, path: &str) -> bool {
        self.directories.iter().any(|dir| path.starts_with(dir.as_str()))
    }

    /// Owned, and carrying one of the domain's extensions.
    pub fn contains(&self, path: &str) -> bool {
        self.owns(path) && self.extensions.iter().any(|ext| path.ends_with(ext.as_str()))
    }

    /// Every expected dependency, in group order.
    pub fn expected_dependencies(&self) -> impl Iterator<Item = &str> {
        self.dependencies.values().flatten().map(String::as_str)
    }
}

/// Naming conventions per artifact kind. Unrecognized names are kept as
/// strings and impose no constraint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamingConventions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<String>,
}

impl NamingConventions {
    /// The parsed component convention, if set and recognized.
    pub fn component_convention(&self) -> Option<NamingConvention> {
        self.components.as_deref().and_then(|s| s.parse().ok())
    }
}

/// A recognized identifier naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingConvention {
    PascalCase,
    CamelCase,
    KebabCase,
    SnakeCase,
}

impl NamingConvention {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamingConvention::PascalCase => "PascalCase",
            NamingConvention::CamelCase => "camelCase",
            NamingConvention::KebabCase => "kebab-case",
            NamingConvention::SnakeCase => "snake_case",
        }
    }

    /// Check `name` against the convention.
    pub fn matches(&self, name: &str) -> bool {
        let Some(first) = name.chars().next() else {
            return false;
        };
        let is_lower = name.chars().all(|c| !c.is_uppercase());
        match self {
            NamingConvention::PascalCase => first.is_uppercase() && !name.contains('_'),
            NamingConvention::CamelCase => first.is_lowercase() && !name.contains('_'),
            NamingConvention::KebabCase => is_lower && !name.contains('_') && name.contains('-'),
            NamingConvention::SnakeCase => is_lower && name.contains('_'),
        }
    }
}

impl FromStr for NamingConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PascalCase" => Ok(NamingConvention::PascalCase),
            "camelCase" => Ok(NamingConvention::CamelCase),
            "kebab-case" => Ok(NamingConvention::KebabCase),
            "snake_case" => Ok(NamingConvention::SnakeCase),
            other => Err(format!("unknown naming convention '{other}'")),
        }
    }
}

impl std::fmt::Display for NamingConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_tree_focus() -> BTreeMap<String, DomainRules> {
    let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    BTreeMap::from([
        (
            "backend".to_string(),
            DomainRules {
                directories: strings(&["api/", "server/"]),
                extensions: strings(&[".py"]),
                naming_conventions: NamingConventions {
                    components: Some("snake_case".to_string()),
                    modules: Some("snake_case".to_string()),
                    classes: Some("PascalCase".to_string()),
                    ..Default::default()
                },
                dependencies: BTreeMap::from([("frameworks".to_string(), strings(&["fastapi"]))]),
            },
        ),
        (
            "frontend".to_string(),
            DomainRules {
                directories: strings(&["src/", "components/"]),
                extensions: strings(&[".tsx", ".ts", ".css"]),
                naming_conventions: NamingConventions {
                    components: Some("PascalCase".to_string()),
                    files: Some("kebab-case".to_string()),
                    ..Default::default()
                },
                dependencies: BTreeMap::from([(
                    "required".to_string(),
                    strings(&["react", "react-dom"]),
                )]),
            },
        ),
    ])
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default)]
    pub developer: DeveloperConfig,
    #[serde(default)]
    pub reviewer: ReviewerConfig,
    #[serde(default)]
    pub architect: ArchitectConfig,
}

/// Settings for the built-in developer capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeveloperConfig {
    /// Register the capability at startup.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_developer_actions")]
    pub allowed_actions: Vec<String>,

    /// Per-domain build rules keyed by domain name.
    #[serde(default)]
    pub domain_rules: BTreeMap<String, DomainBuildRules>,
}

fn default_true() -> bool {
    true
}

fn default_developer_actions() -> Vec<String> {
    [
        "create_component",
        "update_component",
        "implement_feature",
        "fix_issue",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for DeveloperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_actions: default_developer_actions(),
            domain_rules: BTreeMap::new(),
        }
    }
}

/// Build rules the developer applies within one domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainBuildRules {
    /// Generate a test file for every created source file.
    #[serde(default = "default_true")]
    pub require_tests: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_function_length: Option<usize>,
}

impl Default for DomainBuildRules {
    fn default() -> Self {
        Self {
            require_tests: true,
            max_file_size: None,
            max_function_length: None,
        }
    }
}

/// Settings for the built-in reviewer capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_reviewer_actions")]
    pub allowed_actions: Vec<String>,

    #[serde(default)]
    pub review_rules: ReviewRules,
}

fn default_reviewer_actions() -> Vec<String> {
    vec!["review_code".to_string(), "verify_fix".to_string()]
}

impl Default for ReviewerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_actions: default_reviewer_actions(),
            review_rules: ReviewRules::default(),
        }
    }
}

/// Thresholds applied by the reviewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRules {
    /// Minimum test coverage percentage.
    #[serde(default = "default_coverage_threshold")]
    pub coverage_threshold: f64,
    /// Maximum file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Maximum function body length in lines.
    #[serde(default = "default_max_function_length")]
    pub max_function_length: usize,
    /// Enforce the coverage threshold.
    #[serde(default = "default_true")]
    pub required_tests: bool,
}

fn default_coverage_threshold() -> f64 {
    80.0
}

fn default_max_file_size() -> u64 {
    1_000_000
}

fn default_max_function_length() -> usize {
    50
}

impl Default for ReviewRules {
    fn default() -> Self {
        Self {
            coverage_threshold: default_coverage_threshold(),
            max_file_size: default_max_file_size(),
            max_function_length: default_max_function_length(),
            required_tests: true,
        }
    }
}

/// Settings for the built-in architect capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_architect_actions")]
    pub allowed_actions: Vec<String>,

    #[serde(default)]
    pub validation_rules: DeploymentRules,
}

fn default_architect_actions() -> Vec<String> {
    ["analyze_structure", "design_architecture", "validate_deployment"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ArchitectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_actions: default_architect_actions(),
            validation_rules: DeploymentRules::default(),
        }
    }
}

/// Limits applied when validating a deployment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRules {
    #[serde(default)]
    pub port_range: PortRange,
    #[serde(default = "default_environments")]
    pub environments: Vec<String>,
}

fn default_environments() -> Vec<String> {
    vec![
        "development".to_string(),
        "staging".to_string(),
        "production".to_string(),
    ]
}

impl Default for DeploymentRules {
    fn default() -> Self {
        Self {
            port_range: PortRange::default(),
            environments: default_environments(),
        }
    }
}

/// Inclusive port bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub min: u16,
    pub max: u16,
}

impl PortRange {
    pub fn contains(&self, port: u64) -> bool {
        (u64::from(self.min)..=u64::from(self.max)).contains(&port)
    }
}

impl Default for PortRange {
    fn default() -> Self {
        Self { min: 1024, max: 65535 }
    }
}
