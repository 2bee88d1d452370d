//! Append-only audit journal of workspace mutations.
//!
//! Every mutating operation writes one JSONL line to
//! `<root>/decisions.events.jsonl`, on success and on failure. Timestamps here
//! are wall-clock audit metadata and never feed scored or hashed output.

use crate::core::error::VerdictError;
use crate::core::time;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

pub const JOURNAL_FILE: &str = "decisions.events.jsonl";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JournalEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    pub decision_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub detail: serde_json::Value,
}

pub struct Journal {
    path: PathBuf,
    actor: String,
}

impl Journal {
    pub fn new(root: &Path, actor: &str) -> Self {
        Self {
            path: root.join(JOURNAL_FILE),
            actor: actor.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` and journal its outcome under `op`.
    ///
    /// The operation's own result is returned even when the journal line
    /// cannot be written; that failure goes to stderr.
    pub fn with_op<F, R>(&self, op: &str, decision_id: Option<&str>, f: F) -> Result<R, VerdictError>
    where
        F: FnOnce() -> Result<R, VerdictError>,
    {
        let result = f();
        let (status, detail) = match &result {
            Ok(_) => ("success", serde_json::Value::Null),
            Err(e) => ("error", serde_json::json!({ "error": e.to_string() })),
        };
        self.record_or_warn(op, decision_id, status, detail);
        result
    }

    /// Like [`Journal::record`], but a write failure is reported on stderr
    /// instead of replacing the caller's outcome.
    pub fn record_or_warn(
        &self,
        op: &str,
        decision_id: Option<&str>,
        status: &str,
        detail: serde_json::Value,
    ) {
        if let Err(e) = self.record(op, decision_id, status, detail) {
            eprintln!(
                "warning: failed to journal {} to {}: {}",
                op,
                self.path.display(),
                e
            );
        }
    }

    pub fn record(
        &self,
        op: &str,
        decision_id: Option<&str>,
        status: &str,
        detail: serde_json::Value,
    ) -> Result<(), VerdictError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let ev = JournalEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            actor: self.actor.clone(),
            op: op.to_string(),
            decision_id: decision_id.map(|s| s.to_string()),
            status: status.to_string(),
            detail,
        };
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(f, "{}", serde_json::to_string(&ev)?)?;
        Ok(())
    }
}

/// The last `limit` journal events, oldest first. Unparseable lines are skipped.
pub fn read_events(root: &Path, limit: usize) -> Result<Vec<JournalEvent>, VerdictError> {
    let path = root.join(JOURNAL_FILE);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(fs::File::open(&path)?);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(ev) = serde_json::from_str::<JournalEvent>(&line) {
            events.push(ev);
        }
    }
    let skip = events.len().saturating_sub(limit);
    Ok(events.into_iter().skip(skip).collect())
}
