//! Application state wiring config, filesystem, capabilities, and the engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use conductor_core::capability::{
    ArchitectCapability, BoxCapability, CapabilityRegistry, DeveloperCapability,
    ReviewerCapability,
};
use conductor_core::workflow::WorkflowEngine;
use conductor_infra::config::{load_config, load_workflows, resolve_home, workflows_dir};
use conductor_infra::filesystem::LocalFileSystem;
use conductor_types::config::ConductorConfig;

/// The engine pinned to the local filesystem.
pub type ConcreteEngine = WorkflowEngine<LocalFileSystem>;

pub struct AppState {
    pub home: PathBuf,
    pub config: ConductorConfig,
    pub engine: Arc<ConcreteEngine>,
}

impl AppState {
    /// Load config and workflows from the resolved home, then wire the engine.
    pub async fn init(home: Option<&Path>, root: Option<&Path>) -> anyhow::Result<Self> {
        let home = resolve_home(home);
        let config = load_config(&home)
            .await
            .with_context(|| format!("loading config from {}", home.display()))?;
        let catalog = load_workflows(&home, &config).with_context(|| {
            format!("loading workflows from {}", workflows_dir(&home, &config).display())
        })?;

        let fs = Arc::new(match root {
            Some(root) => LocalFileSystem::rooted(root),
            None => LocalFileSystem::new(),
        });
        let registry = build_registry(&fs, &config);

        tracing::debug!(
            home = %home.display(),
            workflows = catalog.len(),
            capabilities = ?registry.names(),
            "conductor initialized"
        );

        let engine = WorkflowEngine::new(Arc::new(registry), fs, catalog, config.engine.clone());
        Ok(Self {
            home,
            config,
            engine: Arc::new(engine),
        })
    }
}

/// Register the enabled built-in capabilities.
pub fn build_registry(fs: &Arc<LocalFileSystem>, config: &ConductorConfig) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    if config.agents.developer.enabled {
        registry.register(
            "developer",
            BoxCapability::new(DeveloperCapability::new(Arc::clone(fs), config)),
        );
    }
    if config.agents.reviewer.enabled {
        registry.register(
            "reviewer",
            BoxCapability::new(ReviewerCapability::new(Arc::clone(fs), config)),
        );
    }
    if config.agents.architect.enabled {
        registry.register(
            "architect",
            BoxCapability::new(ArchitectCapability::new(Arc::clone(fs), config)),
        );
    }
    registry
}
