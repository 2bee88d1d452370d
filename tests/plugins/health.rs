use chrono::NaiveDate;
use verdict::core::model::{
    DecayState, DecisionWorkspace, EvidenceCost, EvidenceItem, Provenance, RunResult,
};
use verdict::plugins::decay::{self, classify_dates};
use verdict::plugins::health::{FLIP_THRESHOLD, assess, confidence};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn workspace() -> DecisionWorkspace {
    serde_json::from_value(serde_json::json!({
        "decisionId": "dec_plughealth0",
        "title": "Plugin health",
        "decisionType": "PROD",
        "createdAt": "2024-01-01"
    }))
    .unwrap()
}

fn evidence(id: &str, asserted: NaiveDate) -> EvidenceItem {
    EvidenceItem {
        id: id.to_string(),
        text: id.to_string(),
        summary: id.to_string(),
        asserted_at: Some(asserted),
        expires_at: None,
        provenance: Provenance {
            source: "manual".into(),
            content_hash: format!("sha256:{}", id),
        },
        cost: EvidenceCost::default(),
    }
}

#[test]
fn test_decay_thresholds_are_inclusive() {
    let asserted = d(2024, 1, 1);
    let at = |days: i64| asserted + chrono::Duration::days(days);
    let cases = [
        (0, DecayState::Fresh),
        (30, DecayState::Fresh),
        (31, DecayState::Aging),
        (90, DecayState::Aging),
        (91, DecayState::Stale),
        (180, DecayState::Stale),
        (181, DecayState::Expired),
    ];
    for (days, expected) in cases {
        assert_eq!(
            classify_dates(Some(asserted), None, at(days)),
            expected,
            "age {} days",
            days
        );
    }
}

#[test]
fn test_decay_expiry_and_unknown() {
    let as_of = d(2024, 3, 1);
    assert_eq!(classify_dates(None, Some(as_of), as_of), DecayState::Expired);
    assert_eq!(
        classify_dates(Some(d(2024, 2, 28)), Some(d(2024, 3, 2)), as_of),
        DecayState::Fresh
    );
    assert_eq!(classify_dates(None, None, as_of), DecayState::Unknown);
    assert_eq!(classify_dates(None, Some(d(2024, 6, 1)), as_of), DecayState::Unknown);
    // asserted in the future
    assert_eq!(classify_dates(Some(d(2024, 5, 1)), None, as_of), DecayState::Fresh);
}

#[test]
fn test_stale_evidence_penalizes_without_drift() {
    let mut ws = workspace();
    ws.evidence.push(evidence("ev_old", d(2023, 9, 1)));
    ws.evidence.push(evidence("ev_new", d(2024, 1, 10)));
    let as_of = d(2024, 1, 15);

    let summary = decay::summarize(&ws.evidence, as_of);
    assert_eq!(summary.stale, 1);
    assert_eq!(summary.fresh, 1);

    let a = assess(&ws, true, as_of);
    assert_eq!(a.decay_summary, summary);
    assert_eq!(a.health.evidence_completeness_score, 100);
    assert_eq!(a.health.policy_compliance_score, 90);
    assert_eq!(a.health.risk_score, 5);
    assert!(a.drift.is_empty());
    assert_eq!(confidence(&a.health), 0.95);
}

#[test]
fn test_prior_knife_edge_runs_raise_volatility() {
    let mut ws = workspace();
    let as_of = d(2024, 1, 15);
    let template = assess(&ws, true, as_of);
    for (i, flip) in [1.0, FLIP_THRESHOLD, 2.5].into_iter().enumerate() {
        ws.runs.push(
            serde_json::from_value::<RunResult>(serde_json::json!({
                "transcriptHash": format!("sha256:run{}", i),
                "recommendedAction": "proceed",
                "boundarySummary": "",
                "flipDistance": flip,
                "fragility": "Knife-edge",
                "health": template.health,
                "confidence": 0.5,
                "executedAt": "2024-01-10"
            }))
            .unwrap(),
        );
    }
    let a = assess(&ws, true, as_of);
    // two runs under the threshold (40) + three prior runs (15)
    assert_eq!(a.health.assumption_volatility_index, 55);
}
