//! Tamper-evident export bundles.
//!
//! Export writes a fixed set of files plus `manifest.json`, which lists every
//! file with its SHA-256 and byte size (sorted by path) together with an
//! aggregate `manifestHash` over the entry list and a `treeHash` over the
//! `[path, sha256]` pairs. Verification recomputes all of it from disk.
//!
//! Output is reproducible: the only date in a bundle is the caller's as-of
//! date.

use crate::core::error::VerdictError;
use crate::core::hashing::sha256_hex;
use crate::core::model::{DecisionWorkspace, SignatureStatus};
use crate::plugins::{decay, health};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path};

pub const SCHEMA_VERSION: &str = "1.0.0";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "signature.json";

#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    /// Leave raw evidence text out of `evidence.json`.
    pub redact_evidence: bool,
    /// Require a signed transcript for the bundle to count as verified.
    pub sign: bool,
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub sha256: String,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    HashOnly,
    Signed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStatus {
    pub verified: bool,
    pub method: VerificationMethod,
    pub checked_at: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    pub schema_version: String,
    pub decision_id: String,
    pub files: Vec<ManifestEntry>,
    pub manifest_hash: String,
    pub tree_hash: String,
    pub verification_status: VerificationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub verified: bool,
    pub decision_id: String,
    pub files_checked: usize,
    pub drift: Vec<String>,
    pub manifest_hash: String,
    pub tree_hash: String,
}

fn pretty<T: Serialize>(value: &T) -> Result<Vec<u8>, VerdictError> {
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');
    Ok(body.into_bytes())
}

fn transcript_markdown(workspace: &DecisionWorkspace) -> String {
    let mut md = format!("# {}\n\n", workspace.title);
    md.push_str(&format!(
        "- Decision: `{}` ({})\n- State: {}\n\n",
        workspace.decision_id,
        workspace.decision_type,
        workspace.state.as_str()
    ));
    let Some(run) = workspace.latest_run() else {
        md.push_str("_No runs recorded._\n");
        return md;
    };
    md.push_str("## Latest run\n\n");
    md.push_str(&format!("- Transcript: `{}`\n", run.transcript_hash));
    md.push_str(&format!("- Recommended action: {}\n", run.recommended_action));
    md.push_str(&format!(
        "- Flip distance: {:.2} ({})\n",
        run.flip_distance,
        run.fragility.as_str()
    ));
    md.push_str(&format!("- Boundary: {}\n", run.boundary_summary));
    if !run.top_evidence.is_empty() {
        md.push_str("\n## Top evidence\n\n");
        for item in &run.top_evidence {
            md.push_str(&format!("- `{}` ({} min)\n", item.id, item.time_minutes));
        }
    }
    if !run.plan.next_steps.is_empty() {
        md.push_str("\n## Next steps\n\n");
        for step in &run.plan.next_steps {
            md.push_str(&format!("- {}\n", step));
        }
    }
    if !run.plan.stop_conditions.is_empty() {
        md.push_str("\n## Stop conditions\n\n");
        for cond in &run.plan.stop_conditions {
            md.push_str(&format!("- {}\n", cond));
        }
    }
    md
}

fn evidence_document(workspace: &DecisionWorkspace, redact: bool) -> serde_json::Value {
    if !redact {
        return serde_json::json!({ "redacted": false, "items": workspace.evidence });
    }
    let items: Vec<serde_json::Value> = workspace
        .evidence
        .iter()
        .map(|e| {
            serde_json::json!({
                "id": e.id,
                "assertedAt": e.asserted_at,
                "expiresAt": e.expires_at,
                "provenance": e.provenance,
                "cost": e.cost,
            })
        })
        .collect();
    serde_json::json!({ "redacted": true, "items": items })
}

/// Bundle file bodies keyed by file name, before hashing.
pub fn render_files(
    workspace: &DecisionWorkspace,
    opts: &ExportOptions,
) -> Result<Vec<(String, Vec<u8>)>, VerdictError> {
    let latest = workspace.latest_run();
    let mut files = vec![
        (
            "decision.json".to_string(),
            pretty(&serde_json::json!({
                "decisionId": workspace.decision_id,
                "workspaceId": workspace.workspace_id,
                "title": workspace.title,
                "decisionType": workspace.decision_type,
                "workspaceMode": workspace.workspace_mode,
                "state": workspace.state,
                "createdAt": workspace.created_at,
                "reviewAt": workspace.review_at,
                "chain": workspace.chain,
                "runCount": workspace.runs.len(),
            }))?,
        ),
        (
            "evidence.json".to_string(),
            pretty(&evidence_document(workspace, opts.redact_evidence))?,
        ),
        (
            "transcript.md".to_string(),
            transcript_markdown(workspace).into_bytes(),
        ),
        (
            "metrics.json".to_string(),
            pretty(&serde_json::json!({
                "health": workspace.latest_health(),
                "healthHistory": workspace.health_history,
                "decaySummary": decay::summarize(&workspace.evidence, opts.as_of),
                "driftEventCount": workspace.drift_events.len(),
                "asOf": opts.as_of,
            }))?,
        ),
        (
            "replay.json".to_string(),
            pretty(&serde_json::json!({
                "transcriptHash": latest.map(|r| r.transcript_hash.clone()),
                "parentTranscriptHash": latest.and_then(|r| r.parent_transcript_hash.clone()),
                "runCount": workspace.runs.len(),
                "replayStable": workspace
                    .latest_health()
                    .is_some_and(|h| h.replay_stability_score == 100),
            }))?,
        ),
        (
            "policy.json".to_string(),
            pretty(&serde_json::json!({
                "decisionType": workspace.decision_type,
                "requiredEvidence": workspace.decision_type.required_evidence(),
                "evidenceCount": workspace.evidence.len(),
                "tasksTotal": workspace.tasks.len(),
                "tasksCompleted": workspace.completed_tasks(),
                "reviewAt": workspace.review_at,
                "reviewOverdue": health::is_review_overdue(workspace, opts.as_of),
                "workspaceMode": workspace.workspace_mode,
            }))?,
        ),
    ];

    let mut provenance: Vec<serde_json::Value> = workspace
        .evidence
        .iter()
        .map(|e| {
            serde_json::json!({
                "evidenceId": e.id,
                "source": e.provenance.source,
                "contentHash": e.provenance.content_hash,
            })
        })
        .collect();
    provenance.sort_by(|a, b| a["evidenceId"].as_str().cmp(&b["evidenceId"].as_str()));
    files.push(("provenance.json".to_string(), pretty(&provenance)?));

    if opts.sign {
        files.push((
            SIGNATURE_FILE.to_string(),
            pretty(&serde_json::json!({
                "transcriptHash": latest.map(|r| r.transcript_hash.clone()),
                "signatureStatus": latest.map(|r| r.signature_status).unwrap_or_default(),
            }))?,
        ));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// `(manifestHash, treeHash)` for a path-sorted entry list.
pub fn aggregate_hashes(entries: &[ManifestEntry]) -> Result<(String, String), VerdictError> {
    let manifest_hash = sha256_hex(serde_json::to_string(entries)?.as_bytes());
    let pairs: Vec<[&str; 2]> = entries
        .iter()
        .map(|e| [e.path.as_str(), e.sha256.as_str()])
        .collect();
    let tree_hash = sha256_hex(serde_json::to_string(&pairs)?.as_bytes());
    Ok((manifest_hash, tree_hash))
}

pub fn verification_status(workspace: &DecisionWorkspace, opts: &ExportOptions) -> VerificationStatus {
    let replay_ok = workspace
        .latest_health()
        .is_some_and(|h| h.replay_stability_score == 100);
    let signed = workspace
        .latest_run()
        .is_some_and(|r| r.signature_status == SignatureStatus::Signed);
    let verified = replay_ok && (!opts.sign || signed);
    let method = if opts.sign && signed {
        VerificationMethod::Signed
    } else {
        VerificationMethod::HashOnly
    };
    VerificationStatus {
        verified,
        method,
        checked_at: opts.as_of,
    }
}

pub fn build_manifest(
    workspace: &DecisionWorkspace,
    files: &[(String, Vec<u8>)],
    opts: &ExportOptions,
) -> Result<BundleManifest, VerdictError> {
    let mut entries: Vec<ManifestEntry> = files
        .iter()
        .map(|(path, bytes)| ManifestEntry {
            path: path.clone(),
            sha256: sha256_hex(bytes),
            size: bytes.len() as u64,
        })
        .collect();
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    let (manifest_hash, tree_hash) = aggregate_hashes(&entries)?;
    Ok(BundleManifest {
        schema_version: SCHEMA_VERSION.to_string(),
        decision_id: workspace.decision_id.clone(),
        files: entries,
        manifest_hash,
        tree_hash,
        verification_status: verification_status(workspace, opts),
    })
}

pub fn export_bundle(
    workspace: &DecisionWorkspace,
    dir: &Path,
    opts: &ExportOptions,
) -> Result<BundleManifest, VerdictError> {
    let files = render_files(workspace, opts)?;
    let manifest = build_manifest(workspace, &files, opts)?;

    fs::create_dir_all(dir)?;
    for (name, bytes) in &files {
        fs::write(dir.join(name), bytes)?;
    }
    fs::write(dir.join(MANIFEST_FILE), pretty(&manifest)?)?;
    Ok(manifest)
}

fn is_plain_file_name(path: &str) -> bool {
    let mut components = Path::new(path).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

pub fn verify_bundle(dir: &Path) -> Result<VerifyReport, VerdictError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Err(VerdictError::NotFound(format!(
            "no {} in {}",
            MANIFEST_FILE,
            dir.display()
        )));
    }
    let manifest: BundleManifest = serde_json::from_slice(&fs::read(&manifest_path)?)?;
    if manifest.schema_version != SCHEMA_VERSION {
        return Err(VerdictError::InvalidInput(format!(
            "unsupported bundle schema version '{}'",
            manifest.schema_version
        )));
    }

    let mut drift = Vec::new();
    for entry in &manifest.files {
        let disk_path = dir.join(&entry.path);
        if !is_plain_file_name(&entry.path) || !disk_path.is_file() {
            drift.push(format!("{}:missing", entry.path));
            continue;
        }
        let bytes = fs::read(&disk_path)?;
        if sha256_hex(&bytes) != entry.sha256 {
            drift.push(format!("{}:hash_mismatch", entry.path));
        }
        if bytes.len() as u64 != entry.size {
            drift.push(format!("{}:size_mismatch", entry.path));
        }
    }

    let (manifest_hash, tree_hash) = aggregate_hashes(&manifest.files)?;
    if manifest_hash != manifest.manifest_hash || tree_hash != manifest.tree_hash {
        drift.push(format!("{}:hash_mismatch", MANIFEST_FILE));
    }

    Ok(VerifyReport {
        verified: drift.is_empty(),
        decision_id: manifest.decision_id,
        files_checked: manifest.files.len(),
        drift,
        manifest_hash,
        tree_hash,
    })
}
