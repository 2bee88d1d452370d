//! Workspace persistence.
//!
//! The store is the only component that touches durable storage. One JSON
//! document per decision lives under `<root>/decisions/<decisionId>.json`.
//! Saves go through a temp file and a rename so readers never observe a
//! partially written document. There is no locking: concurrent writers to the
//! same decision race, and callers must serialize them.

use crate::core::error::VerdictError;
use crate::core::model::DecisionWorkspace;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const DECISIONS_DIR: &str = "decisions";

/// Load/save contract consumed by every operation that needs durable state.
pub trait WorkspaceStore {
    fn load(&self, decision_id: &str) -> Result<DecisionWorkspace, VerdictError>;
    fn save(&self, workspace: &DecisionWorkspace) -> Result<(), VerdictError>;
    fn exists(&self, decision_id: &str) -> Result<bool, VerdictError>;
    /// Every stored workspace, ordered by decision id.
    fn collect_all(&self) -> Result<Vec<DecisionWorkspace>, VerdictError>;
}

/// Store handle rooted at a state directory (usually `.verdict/`).
#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute or caller-relative path to the store root directory
    pub root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn decisions_dir(&self) -> PathBuf {
        self.root.join(DECISIONS_DIR)
    }

    pub fn workspace_path(&self, decision_id: &str) -> Result<PathBuf, VerdictError> {
        validate_decision_id(decision_id)?;
        Ok(self.decisions_dir().join(format!("{}.json", decision_id)))
    }
}

fn validate_decision_id(decision_id: &str) -> Result<(), VerdictError> {
    static ID: OnceLock<Regex> = OnceLock::new();
    let re = ID.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("valid id regex"));
    if re.is_match(decision_id) {
        Ok(())
    } else {
        Err(VerdictError::InvalidInput(format!(
            "malformed decision id '{}'",
            decision_id
        )))
    }
}

fn read_workspace(path: &Path) -> Result<DecisionWorkspace, VerdictError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

impl WorkspaceStore for Store {
    fn load(&self, decision_id: &str) -> Result<DecisionWorkspace, VerdictError> {
        let path = self.workspace_path(decision_id)?;
        if !path.exists() {
            return Err(VerdictError::NotFound(format!(
                "decision '{}' not found",
                decision_id
            )));
        }
        read_workspace(&path)
    }

    fn save(&self, workspace: &DecisionWorkspace) -> Result<(), VerdictError> {
        let path = self.workspace_path(&workspace.decision_id)?;
        fs::create_dir_all(self.decisions_dir())?;
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(workspace)?;
        fs::write(&tmp, format!("{}\n", body))?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn exists(&self, decision_id: &str) -> Result<bool, VerdictError> {
        Ok(self.workspace_path(decision_id)?.exists())
    }

    fn collect_all(&self) -> Result<Vec<DecisionWorkspace>, VerdictError> {
        let dir = self.decisions_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        paths.sort();

        let mut out = Vec::with_capacity(paths.len());
        for path in paths {
            out.push(read_workspace(&path)?);
        }
        out.sort_by(|a, b| a.decision_id.cmp(&b.decision_id));
        Ok(out)
    }
}
