//! Decision workspace operations.
//!
//! Every operation loads a workspace, mutates an in-memory copy, and persists
//! it with a single terminal `save`; a failure part-way through leaves the
//! stored document untouched. Each mutation is journaled.

use crate::core::error::VerdictError;
use crate::core::hashing::{normalize_text, sha256_hex, short_id};
use crate::core::journal::Journal;
use crate::core::model::{
    Chain, DecayState, DecisionState, DecisionType, DecisionWorkspace, DriftEvent, DriftType,
    EvidenceCost, EvidenceItem, Fragility, Provenance, RunPlan, RunResult, Severity, TaskItem,
    TopEvidence, WorkspaceMode,
};
use crate::core::output::compact_line;
use crate::core::store::WorkspaceStore;
use crate::plugins::decay;
use crate::plugins::engine::{DecisionSpec, ReasoningEngine, Signer};
use crate::plugins::graph::{self, DependencyGraph};
use crate::plugins::health;
use chrono::{Duration, NaiveDate};
use serde::Serialize;

pub const DEFAULT_REVIEW_DAYS: i64 = 90;
pub const SUMMARY_CHARS: usize = 80;
pub const TOP_EVIDENCE_LIMIT: usize = 3;
pub const DEFAULT_SOURCE: &str = "manual";

#[derive(Debug, Clone)]
pub struct StartRequest {
    pub title: String,
    pub decision_type: DecisionType,
    pub workspace_mode: WorkspaceMode,
    /// Defaults to `as_of + 90 days`.
    pub review_at: Option<NaiveDate>,
    pub workspace_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct EvidenceInput {
    pub text: String,
    pub source: Option<String>,
    pub asserted_at: Option<NaiveDate>,
    pub expires_at: Option<NaiveDate>,
    pub time_minutes: Option<u32>,
    pub risk: Option<Severity>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceAdded {
    pub evidence: EvidenceItem,
    pub task: TaskItem,
    /// False when identical text was already recorded.
    pub created: bool,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub depends_on: Vec<String>,
    pub informs: Vec<String>,
    pub allow_cross_workspace: bool,
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct DriftInput {
    pub drift_type: DriftType,
    pub severity: Severity,
    pub assumption_id: Option<String>,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSummary {
    pub decision_id: String,
    pub workspace_id: String,
    pub title: String,
    pub decision_type: DecisionType,
    pub state: DecisionState,
    pub evidence: usize,
    pub open_tasks: usize,
    pub runs: usize,
    pub drift_events: usize,
    pub latest_risk: Option<u32>,
    pub latest_fragility: Option<Fragility>,
}

pub fn decision_id_for(title: &str) -> String {
    short_id("dec", &normalize_text(title).to_lowercase())
}

pub fn start<S: WorkspaceStore>(
    store: &S,
    journal: &Journal,
    req: StartRequest,
    as_of: NaiveDate,
) -> Result<DecisionWorkspace, VerdictError> {
    let title = normalize_text(&req.title);
    if title.is_empty() {
        return Err(VerdictError::InvalidInput("title must not be empty".into()));
    }
    let decision_id = decision_id_for(&title);
    journal.with_op("decision.start", Some(&decision_id), || {
        if store.exists(&decision_id)? {
            return Err(VerdictError::AlreadyExists(format!(
                "decision '{}' already exists for title '{}'",
                decision_id, title
            )));
        }
        let review_at = req
            .review_at
            .unwrap_or(as_of + Duration::days(DEFAULT_REVIEW_DAYS));
        let workspace = DecisionWorkspace {
            decision_id: decision_id.clone(),
            workspace_id: req.workspace_id.clone(),
            title: title.clone(),
            decision_type: req.decision_type,
            workspace_mode: req.workspace_mode,
            state: DecisionState::Proposed,
            created_at: as_of,
            review_at: Some(review_at),
            evidence: Vec::new(),
            tasks: Vec::new(),
            runs: Vec::new(),
            drift_events: Vec::new(),
            health_history: Vec::new(),
            chain: Chain::default(),
        };
        store.save(&workspace)?;
        Ok(workspace)
    })
}

pub fn add_evidence<S: WorkspaceStore>(
    store: &S,
    journal: &Journal,
    decision_id: &str,
    input: EvidenceInput,
) -> Result<EvidenceAdded, VerdictError> {
    journal.with_op("evidence.add", Some(decision_id), || {
        let text = normalize_text(&input.text);
        if text.is_empty() {
            return Err(VerdictError::InvalidInput(
                "evidence text must not be empty".into(),
            ));
        }
        if let (Some(asserted), Some(expires)) = (input.asserted_at, input.expires_at) {
            if expires < asserted {
                return Err(VerdictError::InvalidInput(format!(
                    "expiresAt {} is before assertedAt {}",
                    expires, asserted
                )));
            }
        }

        let mut ws = store.load(decision_id)?;
        let evidence_id = short_id("ev", &text);
        if let Some(existing) = ws.find_evidence(&evidence_id) {
            let task = ws
                .tasks
                .iter()
                .find(|t| t.source_evidence_id == evidence_id)
                .cloned()
                .ok_or_else(|| {
                    VerdictError::NotFound(format!("task for evidence '{}'", evidence_id))
                })?;
            return Ok(EvidenceAdded {
                evidence: existing.clone(),
                task,
                created: false,
            });
        }

        let defaults = EvidenceCost::default();
        let evidence = EvidenceItem {
            id: evidence_id.clone(),
            summary: compact_line(&text, SUMMARY_CHARS),
            provenance: Provenance {
                source: input.source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
                content_hash: sha256_hex(text.as_bytes()),
            },
            text,
            asserted_at: input.asserted_at,
            expires_at: input.expires_at,
            cost: EvidenceCost {
                time_minutes: input.time_minutes.unwrap_or(defaults.time_minutes),
                risk: input.risk.unwrap_or(defaults.risk),
            },
        };
        let task = TaskItem {
            id: short_id("task", &evidence_id),
            label: format!("Validate: {}", evidence.summary),
            source_evidence_id: evidence_id,
            completed: false,
        };
        ws.evidence.push(evidence.clone());
        ws.tasks.push(task.clone());
        store.save(&ws)?;
        Ok(EvidenceAdded {
            evidence,
            task,
            created: true,
        })
    })
}

/// Evidence item plus its decay state at `as_of`.
pub fn evidence_status<S: WorkspaceStore>(
    store: &S,
    decision_id: &str,
    evidence_id: &str,
    as_of: NaiveDate,
) -> Result<(EvidenceItem, DecayState), VerdictError> {
    let ws = store.load(decision_id)?;
    let item = ws.find_evidence(evidence_id).cloned().ok_or_else(|| {
        VerdictError::NotFound(format!(
            "evidence '{}' in decision '{}'",
            evidence_id, decision_id
        ))
    })?;
    let state = decay::classify(&item, as_of);
    Ok((item, state))
}

pub fn complete_task<S: WorkspaceStore>(
    store: &S,
    journal: &Journal,
    decision_id: &str,
    task_id: &str,
) -> Result<TaskItem, VerdictError> {
    journal.with_op("task.complete", Some(decision_id), || {
        let mut ws = store.load(decision_id)?;
        let task = ws
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| {
                VerdictError::NotFound(format!("task '{}' in decision '{}'", task_id, decision_id))
            })?;
        task.completed = true;
        let done = task.clone();
        store.save(&ws)?;
        Ok(done)
    })
}

pub fn set_state<S: WorkspaceStore>(
    store: &S,
    journal: &Journal,
    decision_id: &str,
    state: DecisionState,
) -> Result<DecisionWorkspace, VerdictError> {
    journal.with_op("decision.state", Some(decision_id), || {
        let mut ws = store.load(decision_id)?;
        ws.state = state;
        store.save(&ws)?;
        Ok(ws)
    })
}

fn top_evidence(ws: &DecisionWorkspace) -> Vec<TopEvidence> {
    let mut items: Vec<&EvidenceItem> = ws.evidence.iter().collect();
    items.sort_by(|a, b| {
        a.cost
            .time_minutes
            .cmp(&b.cost.time_minutes)
            .then_with(|| a.id.cmp(&b.id))
    });
    items
        .into_iter()
        .take(TOP_EVIDENCE_LIMIT)
        .map(|e| TopEvidence {
            id: e.id.clone(),
            summary: e.summary.clone(),
            time_minutes: e.cost.time_minutes,
        })
        .collect()
}

/// Evaluate the decision and append the run, its health snapshot, and any
/// drift it surfaces.
pub fn run_decision<S, E, G>(
    store: &S,
    journal: &Journal,
    engine: &E,
    signer: &G,
    decision_id: &str,
    opts: RunOptions,
) -> Result<RunResult, VerdictError>
where
    S: WorkspaceStore,
    E: ReasoningEngine + ?Sized,
    G: Signer + ?Sized,
{
    journal.with_op("decision.run", Some(decision_id), || {
        let ws = store.load(decision_id)?;
        let spec = DecisionSpec::from_workspace(&ws, &opts.depends_on, &opts.informs);
        let transcript = engine.execute(&spec)?;

        let all = store.collect_all()?;
        graph::check_cross_workspace(
            &all,
            &ws.workspace_id,
            &transcript.depends_on,
            opts.allow_cross_workspace,
        )?;

        let replay_stable = ws
            .latest_run()
            .is_some_and(|r| r.transcript_hash == transcript.transcript_hash);
        let assessment = health::assess(&ws, replay_stable, opts.as_of);

        let action = transcript.recommended_action().to_string();
        let flip_distance = transcript.min_flip_distance();
        let fragility = Fragility::from_flip_distance(flip_distance);
        let required = ws.decision_type.required_evidence();
        let run = RunResult {
            transcript_hash: transcript.transcript_hash.clone(),
            parent_transcript_hash: ws.chain.parent_transcript_hash.clone(),
            boundary_summary: format!(
                "{} at flip distance {:.2} ({}); {}/{} required evidence",
                action,
                flip_distance,
                fragility.as_str(),
                ws.evidence.len(),
                required
            ),
            recommended_action: action.clone(),
            flip_distance,
            fragility,
            top_evidence: top_evidence(&ws),
            plan: RunPlan {
                next_steps: transcript.next_best_evidence_prompts.clone(),
                stop_conditions: transcript.stop_conditions.clone(),
            },
            signature_status: signer.try_sign(&transcript),
            depends_on: transcript.depends_on.clone(),
            informs: transcript.informs.clone(),
            decay_summary: assessment.decay_summary,
            confidence: health::confidence(&assessment.health),
            health: assessment.health.clone(),
            executed_at: opts.as_of,
        };

        let mut drift = assessment.drift;
        if let Some(flip) = health::assumption_flip(&ws, &action, opts.as_of) {
            drift.push(flip);
        }

        let mut updated = ws;
        updated.runs.push(run.clone());
        updated.health_history.push(assessment.health);
        health::apply_drift(&mut updated, drift);
        updated.chain.parent_transcript_hash = Some(run.transcript_hash.clone());

        let candidate: Vec<DecisionWorkspace> = all
            .into_iter()
            .filter(|w| w.decision_id != updated.decision_id)
            .chain(std::iter::once(updated.clone()))
            .collect();
        DependencyGraph::build(&candidate)?;

        store.save(&updated)?;
        Ok(run)
    })
}

/// Record the observed outcome. Regret appends an `outcome_regret` drift event.
pub fn record_outcome<S: WorkspaceStore>(
    store: &S,
    journal: &Journal,
    decision_id: &str,
    regret: bool,
    note: &str,
    as_of: NaiveDate,
) -> Result<Option<DriftEvent>, VerdictError> {
    journal.with_op("decision.outcome", Some(decision_id), || {
        let mut ws = store.load(decision_id)?;
        if !regret {
            return Ok(None);
        }
        let event = DriftEvent {
            decision_id: ws.decision_id.clone(),
            assumption_id: None,
            drift_type: DriftType::OutcomeRegret,
            severity: Severity::High,
            detected_at: as_of,
            details: serde_json::json!({
                "note": normalize_text(note),
                "transcriptHash": ws.latest_run().map(|r| r.transcript_hash.clone()),
            }),
        };
        health::apply_drift(&mut ws, vec![event.clone()]);
        store.save(&ws)?;
        Ok(Some(event))
    })
}

pub fn record_drift<S: WorkspaceStore>(
    store: &S,
    journal: &Journal,
    decision_id: &str,
    input: DriftInput,
    as_of: NaiveDate,
) -> Result<DriftEvent, VerdictError> {
    journal.with_op("drift.record", Some(decision_id), || {
        let mut ws = store.load(decision_id)?;
        if let Some(assumption) = input.assumption_id.as_deref() {
            if ws.find_evidence(assumption).is_none() {
                return Err(VerdictError::NotFound(format!(
                    "evidence '{}' in decision '{}'",
                    assumption, decision_id
                )));
            }
        }
        let event = DriftEvent {
            decision_id: ws.decision_id.clone(),
            assumption_id: input.assumption_id.clone(),
            drift_type: input.drift_type,
            severity: input.severity,
            detected_at: as_of,
            details: input.details.clone(),
        };
        health::apply_drift(&mut ws, vec![event.clone()]);
        store.save(&ws)?;
        Ok(event)
    })
}

pub fn summarize<S: WorkspaceStore>(store: &S) -> Result<Vec<WorkspaceSummary>, VerdictError> {
    Ok(store
        .collect_all()?
        .into_iter()
        .map(|ws| WorkspaceSummary {
            evidence: ws.evidence.len(),
            open_tasks: ws.open_tasks(),
            runs: ws.runs.len(),
            drift_events: ws.drift_events.len(),
            latest_risk: ws.latest_health().map(|h| h.risk_score),
            latest_fragility: ws.latest_run().map(|r| r.fragility),
            decision_id: ws.decision_id,
            workspace_id: ws.workspace_id,
            title: ws.title,
            decision_type: ws.decision_type,
            state: ws.state,
        })
        .collect())
}
