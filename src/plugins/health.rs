//! Health & drift scoring.
//!
//! `assess` scores the run that is about to be appended to a workspace: the
//! workspace's existing runs are the prior history, and the pending run counts
//! towards `runCount`. Scoring is pure; callers append the returned snapshot
//! and drift events themselves (see `apply_drift`).

use crate::core::model::{
    DecayState, DecaySummary, DecisionHealth, DecisionWorkspace, DriftEvent, DriftType, Severity,
};
use crate::plugins::decay;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Runs with a flip distance below this count as flips for volatility.
pub const FLIP_THRESHOLD: f64 = 3.0;

const DECAYED_POLICY_PENALTY: i64 = 10;
const DECAYED_RISK_PENALTY: i64 = 5;
const OVERDUE_POLICY_PENALTY: i64 = 20;
const OVERDUE_VOLATILITY_PENALTY: i64 = 15;
const OVERDUE_RISK_PENALTY: i64 = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub health: DecisionHealth,
    pub decay_summary: DecaySummary,
    /// Drift events to append, already in deterministic order.
    pub drift: Vec<DriftEvent>,
}

/// Unclamped base scores before decay and review penalties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseScores {
    pub evidence: i64,
    pub policy: i64,
    pub replay: i64,
    pub volatility: i64,
    pub risk: i64,
}

fn clamp_score(v: i64) -> u32 {
    v.clamp(0, 100) as u32
}

#[allow(clippy::too_many_arguments)]
pub fn base_scores(
    evidence_count: usize,
    required: u32,
    completed_tasks: usize,
    total_tasks: usize,
    replay_stable: bool,
    flips: usize,
    expired_evidence: usize,
    run_count: usize,
) -> BaseScores {
    let required = required.max(1) as f64;
    let evidence = ((evidence_count as f64).min(required) / required * 100.0).round() as i64;
    let policy = if total_tasks == 0 {
        100
    } else {
        (completed_tasks as f64 / total_tasks as f64 * 100.0).round() as i64
    };
    let replay = if replay_stable { 100 } else { 0 };
    let volatility = (flips as i64 * 20
        + expired_evidence as i64 * 15
        + (run_count as i64 - 1).max(0) * 5)
        .min(100);
    let risk = ((100 - evidence) as f64 * 0.35
        + (100 - policy) as f64 * 0.35
        + (100 - replay) as f64 * 0.2
        + volatility as f64 * 0.1)
        .round() as i64;
    BaseScores {
        evidence,
        policy,
        replay,
        volatility,
        risk,
    }
}

pub fn is_review_overdue(workspace: &DecisionWorkspace, as_of: NaiveDate) -> bool {
    workspace.review_at.is_some_and(|review| review < as_of)
}

pub fn assess(workspace: &DecisionWorkspace, replay_stable: bool, as_of: NaiveDate) -> Assessment {
    let classified = decay::classify_all(&workspace.evidence, as_of);
    let mut decay_summary = DecaySummary::default();
    for (_, state) in &classified {
        decay_summary.record(*state);
    }

    let flips = workspace
        .runs
        .iter()
        .filter(|r| r.flip_distance < FLIP_THRESHOLD)
        .count();
    let base = base_scores(
        workspace.evidence.len(),
        workspace.decision_type.required_evidence(),
        workspace.completed_tasks(),
        workspace.tasks.len(),
        replay_stable,
        flips,
        decay_summary.expired as usize,
        workspace.runs.len() + 1,
    );

    let mut policy = base.policy;
    let mut volatility = base.volatility;
    let mut risk = base.risk;

    let decayed = classified.iter().filter(|(_, s)| s.is_decayed()).count() as i64;
    policy -= decayed * DECAYED_POLICY_PENALTY;
    risk += decayed * DECAYED_RISK_PENALTY;

    let mut drift = Vec::new();
    if is_review_overdue(workspace, as_of) {
        policy -= OVERDUE_POLICY_PENALTY;
        volatility += OVERDUE_VOLATILITY_PENALTY;
        risk += OVERDUE_RISK_PENALTY;
        drift.push(DriftEvent {
            decision_id: workspace.decision_id.clone(),
            assumption_id: None,
            drift_type: DriftType::ReviewOverdue,
            severity: Severity::High,
            detected_at: as_of,
            details: serde_json::json!({
                "reviewAt": workspace.review_at,
                "asOf": as_of,
            }),
        });
    }

    let already_flagged: BTreeSet<&str> = workspace
        .drift_events
        .iter()
        .filter(|e| e.drift_type == DriftType::EvidenceExpired)
        .filter_map(|e| e.assumption_id.as_deref())
        .collect();
    for (item, state) in &classified {
        if *state == DecayState::Expired && !already_flagged.contains(item.id.as_str()) {
            drift.push(DriftEvent {
                decision_id: workspace.decision_id.clone(),
                assumption_id: Some(item.id.clone()),
                drift_type: DriftType::EvidenceExpired,
                severity: Severity::Medium,
                detected_at: as_of,
                details: serde_json::json!({
                    "summary": item.summary,
                    "assertedAt": item.asserted_at,
                    "expiresAt": item.expires_at,
                }),
            });
        }
    }
    sort_drift(&mut drift);

    Assessment {
        health: DecisionHealth {
            evidence_completeness_score: clamp_score(base.evidence),
            policy_compliance_score: clamp_score(policy),
            replay_stability_score: clamp_score(base.replay),
            assumption_volatility_index: clamp_score(volatility),
            risk_score: clamp_score(risk),
            created_at: as_of,
            updated_at: as_of,
        },
        decay_summary,
        drift,
    }
}

/// Drift event for a change of recommendation between consecutive runs.
pub fn assumption_flip(
    workspace: &DecisionWorkspace,
    new_action: &str,
    as_of: NaiveDate,
) -> Option<DriftEvent> {
    let previous = workspace.latest_run()?;
    if previous.recommended_action == new_action {
        return None;
    }
    Some(DriftEvent {
        decision_id: workspace.decision_id.clone(),
        assumption_id: None,
        drift_type: DriftType::AssumptionFlip,
        severity: Severity::Medium,
        detected_at: as_of,
        details: serde_json::json!({
            "from": previous.recommended_action,
            "to": new_action,
            "previousTranscriptHash": previous.transcript_hash,
        }),
    })
}

/// Ordering key is `(detectedAt, decisionId, type)`; the sort is stable so
/// equal keys keep append order.
pub fn sort_drift(events: &mut [DriftEvent]) {
    events.sort_by(|a, b| {
        a.detected_at
            .cmp(&b.detected_at)
            .then_with(|| a.decision_id.cmp(&b.decision_id))
            .then_with(|| a.drift_type.as_str().cmp(b.drift_type.as_str()))
    });
}

/// Append drift events and re-sort the full history.
pub fn apply_drift(workspace: &mut DecisionWorkspace, events: Vec<DriftEvent>) {
    workspace.drift_events.extend(events);
    sort_drift(&mut workspace.drift_events);
}

/// Confidence in the latest recommendation, derived from the risk score.
pub fn confidence(health: &DecisionHealth) -> f64 {
    let raw = (100 - health.risk_score.min(100)) as f64 / 100.0;
    (raw * 100.0).round() / 100.0
}
