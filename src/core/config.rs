//! Store-level configuration loaded from `<root>/config.toml`.

use crate::core::error::VerdictError;
use crate::core::model::DEFAULT_WORKSPACE_ID;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.toml";
pub const ROOT_ENV: &str = "VERDICT_HOME";
pub const DEFAULT_ROOT_DIR: &str = ".verdict";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct VerdictConfig {
    /// Tenant that new decisions are created under.
    pub workspace_id: String,
    /// Actor recorded in the audit journal.
    pub actor: String,
    pub export: ExportConfig,
    pub graph: GraphConfig,
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self {
            workspace_id: DEFAULT_WORKSPACE_ID.to_string(),
            actor: "verdict".to_string(),
            export: ExportConfig::default(),
            graph: GraphConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ExportConfig {
    /// Drop raw evidence text from exported bundles.
    pub redact_evidence: bool,
    /// Request a transcript signature when exporting.
    pub sign: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct GraphConfig {
    pub allow_cross_workspace: bool,
}

/// Load `config.toml` from the store root. A missing file yields defaults.
pub fn load_config(root: &Path) -> Result<VerdictConfig, VerdictError> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(VerdictConfig::default());
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content)
        .map_err(|e| VerdictError::ConfigError(format!("{}: {}", path.display(), e)))
}

/// `--root` wins, then `VERDICT_HOME`, then `./.verdict`.
pub fn resolve_root(explicit: Option<PathBuf>, cwd: &Path) -> PathBuf {
    if let Some(root) = explicit {
        return root;
    }
    match std::env::var(ROOT_ENV) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v),
        _ => cwd.join(DEFAULT_ROOT_DIR),
    }
}
