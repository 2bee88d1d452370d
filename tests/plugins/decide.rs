use chrono::NaiveDate;
use verdict::core::error::{EXIT_CYCLE, VerdictError};
use verdict::core::journal::{Journal, read_events};
use verdict::core::model::{
    DecisionState, DecisionType, DriftType, Fragility, RunResult, Severity, WorkspaceMode,
};
use verdict::core::store::{Store, WorkspaceStore};
use verdict::plugins::decide::{
    DriftInput, EvidenceInput, RunOptions, StartRequest, add_evidence, complete_task,
    record_drift, record_outcome, run_decision, set_state, start, summarize,
};
use verdict::plugins::engine::{
    DecisionSpec, LocalEngine, NoopSigner, ReasoningEngine, Transcript,
};
use tempfile::tempdir;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn fixture() -> (tempfile::TempDir, Store, Journal) {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let journal = Journal::new(tmp.path(), "test");
    (tmp, store, journal)
}

fn request(title: &str, workspace_id: &str) -> StartRequest {
    StartRequest {
        title: title.to_string(),
        decision_type: DecisionType::Eng,
        workspace_mode: WorkspaceMode::Internal,
        review_at: None,
        workspace_id: workspace_id.to_string(),
    }
}

fn opts(as_of: NaiveDate) -> RunOptions {
    RunOptions {
        depends_on: vec![],
        informs: vec![],
        allow_cross_workspace: false,
        as_of,
    }
}

fn note(text: &str) -> EvidenceInput {
    EvidenceInput {
        text: text.to_string(),
        ..Default::default()
    }
}

/// Transcript hash is the decision id, so reruns keep their graph identity.
struct PinnedEngine;

impl ReasoningEngine for PinnedEngine {
    fn execute(&self, spec: &DecisionSpec) -> Result<Transcript, VerdictError> {
        Ok(Transcript {
            recommended_actions: vec!["proceed".to_string()],
            flip_distances: vec![4.0],
            next_best_evidence_prompts: vec![],
            stop_conditions: vec![],
            transcript_hash: format!("sha256:{}", spec.decision_id),
            depends_on: spec.depends_on.clone(),
            informs: spec.informs.clone(),
        })
    }
}

fn run_local(
    store: &Store,
    journal: &Journal,
    id: &str,
    opts: RunOptions,
) -> Result<RunResult, VerdictError> {
    run_decision(store, journal, &LocalEngine, &NoopSigner, id, opts)
}

fn run_pinned(
    store: &Store,
    journal: &Journal,
    id: &str,
    opts: RunOptions,
) -> Result<RunResult, VerdictError> {
    run_decision(store, journal, &PinnedEngine, &NoopSigner, id, opts)
}

#[test]
fn test_rerun_without_changes_replays_same_hash() {
    let (_tmp, store, journal) = fixture();
    let ws = start(&store, &journal, request("Adopt Kafka", "default"), d(2024, 1, 1)).unwrap();
    add_evidence(&store, &journal, &ws.decision_id, note("Throughput is 20k msg/s")).unwrap();
    add_evidence(&store, &journal, &ws.decision_id, note("Team knows the ops model")).unwrap();

    let first = run_local(&store, &journal, &ws.decision_id, opts(d(2024, 1, 2))).unwrap();
    let second = run_local(&store, &journal, &ws.decision_id, opts(d(2024, 1, 2))).unwrap();

    assert_eq!(first.transcript_hash, second.transcript_hash);
    assert_eq!(first.health.replay_stability_score, 0);
    assert_eq!(second.health.replay_stability_score, 100);
    assert_eq!(second.parent_transcript_hash.as_deref(), Some(first.transcript_hash.as_str()));
    assert_eq!(first.recommended_action, "proceed");
    assert_eq!(first.fragility, Fragility::Fragile);

    let loaded = store.load(&ws.decision_id).unwrap();
    assert_eq!(loaded.runs.len(), 2);
    assert_eq!(loaded.health_history.len(), 2);
    assert_eq!(
        loaded.chain.parent_transcript_hash.as_deref(),
        Some(second.transcript_hash.as_str())
    );
}

#[test]
fn test_expired_evidence_is_flagged_once() {
    let (_tmp, store, journal) = fixture();
    let ws = start(&store, &journal, request("Expiring note", "default"), d(2024, 1, 1)).unwrap();
    let added = add_evidence(
        &store,
        &journal,
        &ws.decision_id,
        EvidenceInput {
            text: "Vendor quote valid for one day".into(),
            asserted_at: Some(d(2024, 1, 1)),
            expires_at: Some(d(2024, 1, 2)),
            ..Default::default()
        },
    )
    .unwrap();

    let run = run_local(&store, &journal, &ws.decision_id, opts(d(2024, 4, 1))).unwrap();
    assert_eq!(run.decay_summary.expired, 1);
    assert_eq!(run.health.evidence_completeness_score, 50);
    assert_eq!(run.health.policy_compliance_score, 0);

    let loaded = store.load(&ws.decision_id).unwrap();
    let expired: Vec<_> = loaded
        .drift_events
        .iter()
        .filter(|e| e.drift_type == DriftType::EvidenceExpired)
        .collect();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].assumption_id.as_deref(), Some(added.evidence.id.as_str()));
    assert_eq!(expired[0].severity, Severity::Medium);
    assert!(
        loaded
            .drift_events
            .iter()
            .any(|e| e.drift_type == DriftType::ReviewOverdue && e.severity == Severity::High)
    );

    run_local(&store, &journal, &ws.decision_id, opts(d(2024, 4, 2))).unwrap();
    let loaded = store.load(&ws.decision_id).unwrap();
    let expired_count = loaded
        .drift_events
        .iter()
        .filter(|e| e.drift_type == DriftType::EvidenceExpired)
        .count();
    assert_eq!(expired_count, 1);
}

#[test]
fn test_overdue_review_penalizes_policy() {
    let (_tmp, store, journal) = fixture();
    let mut req = request("Overdue review", "default");
    req.review_at = Some(d(2024, 2, 1));
    let ws = start(&store, &journal, req, d(2024, 1, 1)).unwrap();

    let on_time = run_local(&store, &journal, &ws.decision_id, opts(d(2024, 2, 1))).unwrap();
    assert_eq!(on_time.health.policy_compliance_score, 100);

    let late = run_local(&store, &journal, &ws.decision_id, opts(d(2024, 3, 1))).unwrap();
    assert_eq!(late.health.policy_compliance_score, 80);
    // one prior knife-edge run (20) + second run (5) + overdue (15)
    assert_eq!(late.health.assumption_volatility_index, 40);

    let loaded = store.load(&ws.decision_id).unwrap();
    let overdue: Vec<_> = loaded
        .drift_events
        .iter()
        .filter(|e| e.drift_type == DriftType::ReviewOverdue)
        .collect();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].detected_at, d(2024, 3, 1));
}

#[test]
fn test_completed_tasks_raise_policy_score() {
    let (_tmp, store, journal) = fixture();
    let ws = start(&store, &journal, request("Task policy", "default"), d(2024, 1, 1)).unwrap();
    let a = add_evidence(&store, &journal, &ws.decision_id, note("first")).unwrap();
    add_evidence(&store, &journal, &ws.decision_id, note("second")).unwrap();
    complete_task(&store, &journal, &ws.decision_id, &a.task.id).unwrap();

    let run = run_local(&store, &journal, &ws.decision_id, opts(d(2024, 1, 2))).unwrap();
    assert_eq!(run.health.policy_compliance_score, 50);
    assert_eq!(run.health.evidence_completeness_score, 100);

    let err = complete_task(&store, &journal, &ws.decision_id, "task_missing").unwrap_err();
    assert!(matches!(err, VerdictError::NotFound(_)));
}

#[test]
fn test_recommendation_change_records_assumption_flip() {
    let (_tmp, store, journal) = fixture();
    let ws = start(&store, &journal, request("Flip", "default"), d(2024, 1, 1)).unwrap();
    add_evidence(&store, &journal, &ws.decision_id, note("only one note")).unwrap();
    let first = run_local(&store, &journal, &ws.decision_id, opts(d(2024, 1, 2))).unwrap();
    assert_eq!(first.recommended_action, "gather_evidence");

    add_evidence(&store, &journal, &ws.decision_id, note("second note")).unwrap();
    let second = run_local(&store, &journal, &ws.decision_id, opts(d(2024, 1, 3))).unwrap();
    assert_eq!(second.recommended_action, "proceed");

    let loaded = store.load(&ws.decision_id).unwrap();
    let flip = loaded
        .drift_events
        .iter()
        .find(|e| e.drift_type == DriftType::AssumptionFlip)
        .expect("flip drift recorded");
    assert_eq!(flip.details["from"], "gather_evidence");
    assert_eq!(flip.details["to"], "proceed");
}

#[test]
fn test_cross_workspace_dependency_requires_override() {
    let (_tmp, store, journal) = fixture();
    let upstream = start(&store, &journal, request("Upstream", "alpha"), d(2024, 1, 1)).unwrap();
    let downstream = start(&store, &journal, request("Downstream", "beta"), d(2024, 1, 1)).unwrap();
    let parent = run_local(&store, &journal, &upstream.decision_id, opts(d(2024, 1, 2))).unwrap();

    let mut linked = opts(d(2024, 1, 2));
    linked.depends_on = vec![parent.transcript_hash.clone()];
    let err = run_local(&store, &journal, &downstream.decision_id, linked.clone()).unwrap_err();
    match err {
        VerdictError::CrossWorkspaceViolation { owner, workspace, .. } => {
            assert_eq!(owner, "alpha");
            assert_eq!(workspace, "beta");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.load(&downstream.decision_id).unwrap().runs.is_empty());

    linked.allow_cross_workspace = true;
    let run = run_local(&store, &journal, &downstream.decision_id, linked).unwrap();
    assert_eq!(run.depends_on, vec![parent.transcript_hash]);
}

#[test]
fn test_self_dependency_is_rejected_as_cycle() {
    let (_tmp, store, journal) = fixture();
    let ws = start(&store, &journal, request("Self loop", "default"), d(2024, 1, 1)).unwrap();
    let mut linked = opts(d(2024, 1, 2));
    linked.depends_on = vec![format!("sha256:{}", ws.decision_id)];

    let err = run_pinned(&store, &journal, &ws.decision_id, linked).unwrap_err();
    assert!(matches!(err, VerdictError::CycleDetected(_)));
    assert_eq!(err.exit_code(), EXIT_CYCLE);
    assert!(store.load(&ws.decision_id).unwrap().runs.is_empty());

    let events = read_events(&store.root, 1).unwrap();
    assert_eq!(events[0].op, "decision.run");
    assert_eq!(events[0].status, "error");
}

#[test]
fn test_two_decision_cycle_is_rejected() {
    let (_tmp, store, journal) = fixture();
    let a = start(&store, &journal, request("Cycle A", "default"), d(2024, 1, 1)).unwrap();
    let b = start(&store, &journal, request("Cycle B", "default"), d(2024, 1, 1)).unwrap();
    let ha = run_pinned(&store, &journal, &a.decision_id, opts(d(2024, 1, 2))).unwrap();

    let mut from_a = opts(d(2024, 1, 2));
    from_a.depends_on = vec![ha.transcript_hash.clone()];
    let hb = run_pinned(&store, &journal, &b.decision_id, from_a).unwrap();

    let mut from_b = opts(d(2024, 1, 3));
    from_b.depends_on = vec![hb.transcript_hash.clone()];
    let err = run_pinned(&store, &journal, &a.decision_id, from_b).unwrap_err();
    assert!(matches!(err, VerdictError::CycleDetected(_)));
    assert_eq!(store.load(&a.decision_id).unwrap().runs.len(), 1);
}

#[test]
fn test_outcome_and_manual_drift() {
    let (_tmp, store, journal) = fixture();
    let ws = start(&store, &journal, request("Outcomes", "default"), d(2024, 1, 1)).unwrap();
    let ev = add_evidence(&store, &journal, &ws.decision_id, note("SLA is 99.9")).unwrap();

    assert!(record_outcome(&store, &journal, &ws.decision_id, false, "fine", d(2024, 2, 1)).unwrap().is_none());
    let regret = record_outcome(&store, &journal, &ws.decision_id, true, "paged twice", d(2024, 2, 1))
        .unwrap()
        .unwrap();
    assert_eq!(regret.drift_type, DriftType::OutcomeRegret);
    assert_eq!(regret.severity, Severity::High);

    let manual = record_drift(
        &store,
        &journal,
        &ws.decision_id,
        DriftInput {
            drift_type: DriftType::PolicyChange,
            severity: Severity::Low,
            assumption_id: Some(ev.evidence.id.clone()),
            details: serde_json::json!({ "note": "new retention rule" }),
        },
        d(2024, 1, 15),
    )
    .unwrap();
    assert_eq!(manual.detected_at, d(2024, 1, 15));

    let loaded = store.load(&ws.decision_id).unwrap();
    let order: Vec<DriftType> = loaded.drift_events.iter().map(|e| e.drift_type).collect();
    assert_eq!(order, vec![DriftType::PolicyChange, DriftType::OutcomeRegret]);

    let err = record_drift(
        &store,
        &journal,
        &ws.decision_id,
        DriftInput {
            drift_type: DriftType::EnvironmentChange,
            severity: Severity::Medium,
            assumption_id: Some("ev_unknown".into()),
            details: serde_json::Value::Null,
        },
        d(2024, 1, 15),
    )
    .unwrap_err();
    assert!(matches!(err, VerdictError::NotFound(_)));
}

#[test]
fn test_state_and_summary() {
    let (_tmp, store, journal) = fixture();
    let ws = start(&store, &journal, request("Summary", "default"), d(2024, 1, 1)).unwrap();
    add_evidence(&store, &journal, &ws.decision_id, note("a")).unwrap();
    set_state(&store, &journal, &ws.decision_id, DecisionState::Challenged).unwrap();
    run_local(&store, &journal, &ws.decision_id, opts(d(2024, 1, 2))).unwrap();

    let rows = summarize(&store).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].state, DecisionState::Challenged);
    assert_eq!(rows[0].evidence, 1);
    assert_eq!(rows[0].open_tasks, 1);
    assert_eq!(rows[0].runs, 1);
    assert!(rows[0].latest_risk.is_some());
    assert_eq!(rows[0].latest_fragility, Some(Fragility::KnifeEdge));
}

#[test]
fn test_invalid_inputs_leave_store_untouched() {
    let (_tmp, store, journal) = fixture();
    let err = start(&store, &journal, request("   ", "default"), d(2024, 1, 1)).unwrap_err();
    assert!(matches!(err, VerdictError::InvalidInput(_)));

    let ws = start(&store, &journal, request("Inputs", "default"), d(2024, 1, 1)).unwrap();
    let err = add_evidence(
        &store,
        &journal,
        &ws.decision_id,
        EvidenceInput {
            text: "backwards".into(),
            asserted_at: Some(d(2024, 2, 1)),
            expires_at: Some(d(2024, 1, 1)),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, VerdictError::InvalidInput(_)));
    assert!(store.load(&ws.decision_id).unwrap().evidence.is_empty());

    let err = run_local(&store, &journal, "dec_missing", opts(d(2024, 1, 2))).unwrap_err();
    assert!(matches!(err, VerdictError::NotFound(_)));
}
