//! Reasoning engine and signing seams.
//!
//! The engine that evaluates a decision is external; the workspace engine only
//! builds a `DecisionSpec` and consumes the fields of the returned `Transcript`.
//! `LocalEngine` is the deterministic evaluator wired into the CLI.

use crate::core::error::VerdictError;
use crate::core::hashing;
use crate::core::model::{DecisionType, DecisionWorkspace, SignatureStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assumption {
    pub id: String,
    pub text: String,
    /// Provenance checksum of the evidence the assumption came from.
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionSpec {
    pub decision_id: String,
    pub title: String,
    pub decision_type: DecisionType,
    pub required_evidence: u32,
    pub assumptions: Vec<Assumption>,
    pub depends_on: Vec<String>,
    pub informs: Vec<String>,
}

impl DecisionSpec {
    /// Each evidence item becomes one assumption, ordered by evidence id.
    pub fn from_workspace(
        workspace: &DecisionWorkspace,
        depends_on: &[String],
        informs: &[String],
    ) -> Self {
        let mut assumptions: Vec<Assumption> = workspace
            .evidence
            .iter()
            .map(|e| Assumption {
                id: e.id.clone(),
                text: e.text.clone(),
                checksum: e.provenance.content_hash.clone(),
            })
            .collect();
        assumptions.sort_by(|a, b| a.id.cmp(&b.id));

        let mut depends_on = depends_on.to_vec();
        depends_on.sort();
        depends_on.dedup();
        let mut informs = informs.to_vec();
        informs.sort();
        informs.dedup();

        Self {
            decision_id: workspace.decision_id.clone(),
            title: workspace.title.clone(),
            decision_type: workspace.decision_type,
            required_evidence: workspace.decision_type.required_evidence(),
            assumptions,
            depends_on,
            informs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub recommended_actions: Vec<String>,
    pub flip_distances: Vec<f64>,
    pub next_best_evidence_prompts: Vec<String>,
    pub stop_conditions: Vec<String>,
    pub transcript_hash: String,
    pub depends_on: Vec<String>,
    pub informs: Vec<String>,
}

impl Transcript {
    pub fn recommended_action(&self) -> &str {
        self.recommended_actions
            .first()
            .map(String::as_str)
            .unwrap_or("no_action")
    }

    /// Most fragile flip distance; an empty list is treated as 0.
    pub fn min_flip_distance(&self) -> f64 {
        self.flip_distances
            .iter()
            .copied()
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
            .unwrap_or(0.0)
    }
}

pub trait ReasoningEngine {
    fn execute(&self, spec: &DecisionSpec) -> Result<Transcript, VerdictError>;
}

pub trait Signer {
    fn try_sign(&self, transcript: &Transcript) -> SignatureStatus;
}

/// Signer for setups without a keyring.
pub struct NoopSigner;

impl Signer for NoopSigner {
    fn try_sign(&self, _transcript: &Transcript) -> SignatureStatus {
        SignatureStatus::Unsigned
    }
}

/// Deterministic in-process evaluator: the transcript hash is the content hash
/// of the canonical `DecisionSpec`, so unchanged evidence replays to the same hash.
pub struct LocalEngine;

const FLIP_PER_ASSUMPTION: f64 = 1.5;

impl ReasoningEngine for LocalEngine {
    fn execute(&self, spec: &DecisionSpec) -> Result<Transcript, VerdictError> {
        let transcript_hash = hashing::hash_canonical(spec)?;
        let have = spec.assumptions.len() as u32;
        let missing = spec.required_evidence.saturating_sub(have);

        let action = if missing == 0 {
            "proceed"
        } else {
            "gather_evidence"
        };

        let mut prompts = Vec::new();
        if missing > 0 {
            prompts.push(format!(
                "Add {} more evidence item(s) for this {} decision",
                missing, spec.decision_type
            ));
        }
        if let Some(first) = spec.assumptions.first() {
            prompts.push(format!("Re-confirm assumption {}", first.id));
        }

        Ok(Transcript {
            recommended_actions: vec![action.to_string()],
            flip_distances: vec![have as f64 * FLIP_PER_ASSUMPTION],
            next_best_evidence_prompts: prompts,
            stop_conditions: vec![
                "Recommended action flips".to_string(),
                "Evidence expires before the review date".to_string(),
            ],
            transcript_hash,
            depends_on: spec.depends_on.clone(),
            informs: spec.informs.clone(),
        })
    }
}
