use std::fs;
use tempfile::tempdir;
use verdict::core::config::{CONFIG_FILE, load_config, resolve_root};
use verdict::core::error::VerdictError;
use verdict::core::hashing::{canonical_json, hash_canonical, short_id};
use verdict::core::journal::{JOURNAL_FILE, Journal, read_events};
use verdict::core::model::{DecisionType, DecisionWorkspace, Fragility};
use verdict::core::store::{Store, WorkspaceStore};
use verdict::core::time::{command_envelope, parse_date, parse_optional_date};

fn sample(id: &str, workspace_id: &str) -> DecisionWorkspace {
    serde_json::from_value(serde_json::json!({
        "decisionId": id,
        "workspaceId": workspace_id,
        "title": format!("Decision {}", id),
        "decisionType": "SEC",
        "createdAt": "2024-01-01"
    }))
    .unwrap()
}

#[test]
fn store_roundtrip_preserves_document() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let ws = sample("dec_000000000001", "alpha");
    assert!(!store.exists(&ws.decision_id).unwrap());
    store.save(&ws).unwrap();
    assert!(store.exists(&ws.decision_id).unwrap());

    let loaded = store.load(&ws.decision_id).unwrap();
    assert_eq!(loaded, ws);
    assert_eq!(loaded.decision_type, DecisionType::Sec);
    assert_eq!(loaded.decision_type.required_evidence(), 3);

    let raw = fs::read_to_string(store.workspace_path(&ws.decision_id).unwrap()).unwrap();
    assert!(raw.contains("\"decisionId\""));
    assert!(raw.contains("\"workspaceId\": \"alpha\""));
}

#[test]
fn store_defaults_missing_workspace_id() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    fs::create_dir_all(store.decisions_dir()).unwrap();
    fs::write(
        store.decisions_dir().join("dec_legacy000000.json"),
        r#"{"decisionId":"dec_legacy000000","title":"Legacy","decisionType":"MKT","createdAt":"2023-06-01"}"#,
    )
    .unwrap();
    let ws = store.load("dec_legacy000000").unwrap();
    assert_eq!(ws.workspace_id, "default");
    assert!(ws.runs.is_empty());
}

#[test]
fn store_collect_all_skips_temp_files() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    store.save(&sample("dec_b", "default")).unwrap();
    store.save(&sample("dec_a", "default")).unwrap();
    fs::write(store.decisions_dir().join("dec_c.json.tmp"), "{").unwrap();

    let ids: Vec<String> = store
        .collect_all()
        .unwrap()
        .into_iter()
        .map(|w| w.decision_id)
        .collect();
    assert_eq!(ids, vec!["dec_a", "dec_b"]);
}

#[test]
fn store_rejects_path_like_ids() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    for bad in ["../etc", "a/b", "", "dec id"] {
        assert!(matches!(
            store.load(bad),
            Err(VerdictError::InvalidInput(_))
        ));
    }
}

#[test]
fn config_file_overrides_defaults() {
    let tmp = tempdir().unwrap();
    fs::write(
        tmp.path().join(CONFIG_FILE),
        "workspace_id = \"payments\"\n\n[export]\nredact_evidence = true\n",
    )
    .unwrap();
    let cfg = load_config(tmp.path()).unwrap();
    assert_eq!(cfg.workspace_id, "payments");
    assert_eq!(cfg.actor, "verdict");
    assert!(cfg.export.redact_evidence);
    assert!(!cfg.export.sign);
    assert!(!cfg.graph.allow_cross_workspace);

    let explicit = tmp.path().join("elsewhere");
    assert_eq!(resolve_root(Some(explicit.clone()), tmp.path()), explicit);
}

#[test]
fn journal_appends_one_line_per_operation() {
    let tmp = tempdir().unwrap();
    let journal = Journal::new(tmp.path(), "ci");
    journal
        .with_op("decision.start", Some("dec_a"), || Ok::<_, VerdictError>(()))
        .unwrap();
    let err = journal
        .with_op("decision.run", Some("dec_a"), || {
            Err::<(), _>(VerdictError::NotFound("dec_a".into()))
        })
        .unwrap_err();
    assert!(matches!(err, VerdictError::NotFound(_)));

    let raw = fs::read_to_string(tmp.path().join(JOURNAL_FILE)).unwrap();
    assert_eq!(raw.lines().count(), 2);

    let events = read_events(tmp.path(), 10).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].actor, "ci");
    assert_eq!(events[0].status, "success");
    assert_eq!(events[1].op, "decision.run");
    assert_eq!(events[1].status, "error");
    assert_ne!(events[0].event_id, events[1].event_id);
}

#[test]
fn canonical_hash_ignores_key_order() {
    let a = serde_json::json!({"b": 1, "a": {"y": [1, 2], "x": null}});
    let b = serde_json::json!({"a": {"x": null, "y": [1, 2]}, "b": 1});
    assert_eq!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());
    assert_eq!(hash_canonical(&a).unwrap(), hash_canonical(&b).unwrap());
    assert!(hash_canonical(&a).unwrap().starts_with("sha256:"));
    assert_ne!(short_id("ev", "a"), short_id("ev", "b"));
}

#[test]
fn dates_parse_strictly() {
    assert_eq!(parse_date("2024-02-29").unwrap().to_string(), "2024-02-29");
    assert_eq!(
        parse_date("2024-03-01T23:30:00-02:00").unwrap().to_string(),
        "2024-03-02"
    );
    assert!(matches!(
        parse_date("2023-02-29"),
        Err(VerdictError::InvalidInput(_))
    ));
    assert!(parse_optional_date(None).unwrap().is_none());
}

#[test]
fn envelope_merges_extra_fields() {
    let env = command_envelope("verify", "ok", serde_json::json!({"result": {"verified": true}}));
    assert_eq!(env["cmd"], "verify");
    assert_eq!(env["status"], "ok");
    assert_eq!(env["result"]["verified"], true);
    assert_eq!(env["envelope_version"], "1.0.0");
}

#[test]
fn fragility_labels_serialize() {
    assert_eq!(
        serde_json::to_value(Fragility::KnifeEdge).unwrap(),
        serde_json::json!("Knife-edge")
    );
    assert_eq!(Fragility::from_flip_distance(5.0), Fragility::Stable);
    assert_eq!(Fragility::from_flip_distance(4.99), Fragility::Fragile);
    assert_eq!(Fragility::from_flip_distance(2.99), Fragility::KnifeEdge);
}
