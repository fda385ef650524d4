//! Configuration loader for Conductor.
//!
//! Reads `conductor.toml` from the conductor home directory and deserializes
//! it into [`ConductorConfig`]. A missing file means defaults; a malformed
//! file is an error, since silently dropping capability settings would
//! change what a workflow is allowed to do.

use std::path::{Path, PathBuf};

use conductor_core::workflow::definition::load_catalog;
use conductor_core::workflow::{WorkflowCatalog, WorkflowError};
use conductor_types::config::ConductorConfig;

/// Environment variable naming the conductor home directory.
pub const HOME_ENV: &str = "CONDUCTOR_HOME";

/// Config file name inside the home directory.
pub const CONFIG_FILE: &str = "conductor.toml";

const HOME_DIR_NAME: &str = ".conductor";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

/// Resolve the conductor home directory.
///
/// Priority:
/// 1. Explicit override (the `--home` flag)
/// 2. `CONDUCTOR_HOME` environment variable
/// 3. `./.conductor` when it exists
/// 4. `~/.conductor` when it exists
/// 5. `./.conductor`
pub fn resolve_home(override_dir: Option<&Path>) -> PathBuf {
    resolve_home_from(override_dir, std::env::var(HOME_ENV).ok())
}

fn resolve_home_from(override_dir: Option<&Path>, env: Option<String>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }
    if let Some(dir) = env.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }

    let local = PathBuf::from(HOME_DIR_NAME);
    if local.is_dir() {
        return local;
    }
    if let Some(user) = dirs::home_dir().map(|h| h.join(HOME_DIR_NAME)) {
        if user.is_dir() {
            return user;
        }
    }
    local
}

/// Load configuration from `{home}/conductor.toml`.
///
/// Returns [`ConductorConfig::default()`] when the file does not exist.
pub async fn load_config(home: &Path) -> Result<ConductorConfig, ConfigError> {
    let path = home.join(CONFIG_FILE);

    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {CONFIG_FILE} found at {}, using defaults", path.display());
            return Ok(ConductorConfig::default());
        }
        Err(source) => return Err(ConfigError::Io { path, source }),
    };

    toml::from_str::<ConductorConfig>(&content).map_err(|e| ConfigError::Parse {
        path,
        message: e.to_string(),
    })
}

/// Workflow directory for `config`, relative paths resolved against `home`.
pub fn workflows_dir(home: &Path, config: &ConductorConfig) -> PathBuf {
    if config.workflows_dir.is_absolute() {
        config.workflows_dir.clone()
    } else {
        home.join(&config.workflows_dir)
    }
}

/// Load every workflow under the configured workflow directory.
///
/// A missing directory yields an empty catalog.
pub fn load_workflows(home: &Path, config: &ConductorConfig) -> Result<WorkflowCatalog, ConfigError> {
    let dir = workflows_dir(home, config);
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "workflow directory missing, catalog is empty");
        return Ok(WorkflowCatalog::new());
    }
    Ok(load_catalog(&dir)?)
}
