//! Decision workspace data model.
//!
//! A `DecisionWorkspace` is the root aggregate persisted as one JSON document
//! per decision. Everything below it is plain data: behavior lives in the
//! plugins (`decay`, `health`, `graph`, `bundle`, `decide`).
//!
//! Documents are loaded leniently: absent arrays default to empty and an absent
//! `workspaceId` falls back to [`DEFAULT_WORKSPACE_ID`], so older files keep
//! loading as the format grows.

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_WORKSPACE_ID: &str = "default";

fn default_workspace_id() -> String {
    DEFAULT_WORKSPACE_ID.to_string()
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "UPPERCASE")]
#[value(rename_all = "UPPER")]
pub enum DecisionType {
    Eng,
    Ops,
    Sec,
    Prod,
    Mkt,
    Cust,
}

impl DecisionType {
    /// Evidence items needed for a full completeness score.
    pub fn required_evidence(self) -> u32 {
        match self {
            DecisionType::Sec => 3,
            _ => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DecisionType::Eng => "ENG",
            DecisionType::Ops => "OPS",
            DecisionType::Sec => "SEC",
            DecisionType::Prod => "PROD",
            DecisionType::Mkt => "MKT",
            DecisionType::Cust => "CUST",
        }
    }
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceMode {
    #[default]
    Internal,
    Customer,
}

/// Informational lifecycle marker. Any transition is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DecisionState {
    #[default]
    Proposed,
    Challenged,
    Amended,
    Finalized,
}

impl DecisionState {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionState::Proposed => "proposed",
            DecisionState::Challenged => "challenged",
            DecisionState::Amended => "amended",
            DecisionState::Finalized => "finalized",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayState {
    Fresh,
    Aging,
    Stale,
    Expired,
    Unknown,
}

impl DecayState {
    pub fn is_decayed(self) -> bool {
        matches!(self, DecayState::Stale | DecayState::Expired)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DecaySummary {
    pub fresh: u32,
    pub aging: u32,
    pub stale: u32,
    pub expired: u32,
    pub unknown: u32,
}

impl DecaySummary {
    pub fn record(&mut self, state: DecayState) {
        match state {
            DecayState::Fresh => self.fresh += 1,
            DecayState::Aging => self.aging += 1,
            DecayState::Stale => self.stale += 1,
            DecayState::Expired => self.expired += 1,
            DecayState::Unknown => self.unknown += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fragility {
    Stable,
    Fragile,
    #[serde(rename = "Knife-edge")]
    KnifeEdge,
}

impl Fragility {
    /// Thresholds are inclusive on the lower bound: 5 is Stable, 3 is Fragile.
    pub fn from_flip_distance(flip_distance: f64) -> Self {
        if flip_distance >= 5.0 {
            Fragility::Stable
        } else if flip_distance >= 3.0 {
            Fragility::Fragile
        } else {
            Fragility::KnifeEdge
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Fragility::Stable => "Stable",
            Fragility::Fragile => "Fragile",
            Fragility::KnifeEdge => "Knife-edge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SignatureStatus {
    Signed,
    #[default]
    Unsigned,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum DriftType {
    AssumptionFlip,
    EvidenceExpired,
    OutcomeRegret,
    PolicyChange,
    EnvironmentChange,
    ReviewOverdue,
}

impl DriftType {
    pub fn as_str(self) -> &'static str {
        match self {
            DriftType::AssumptionFlip => "assumption_flip",
            DriftType::EvidenceExpired => "evidence_expired",
            DriftType::OutcomeRegret => "outcome_regret",
            DriftType::PolicyChange => "policy_change",
            DriftType::EnvironmentChange => "environment_change",
            DriftType::ReviewOverdue => "review_overdue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub source: String,
    pub content_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceCost {
    pub time_minutes: u32,
    pub risk: Severity,
}

impl Default for EvidenceCost {
    fn default() -> Self {
        Self {
            time_minutes: 30,
            risk: Severity::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceItem {
    pub id: String,
    pub text: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asserted_at: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<NaiveDate>,
    pub provenance: Provenance,
    #[serde(default)]
    pub cost: EvidenceCost,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub id: String,
    pub label: String,
    pub source_evidence_id: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionHealth {
    pub evidence_completeness_score: u32,
    pub policy_compliance_score: u32,
    pub replay_stability_score: u32,
    pub assumption_volatility_index: u32,
    pub risk_score: u32,
    pub created_at: NaiveDate,
    pub updated_at: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftEvent {
    pub decision_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assumption_id: Option<String>,
    #[serde(rename = "type")]
    pub drift_type: DriftType,
    pub severity: Severity,
    pub detected_at: NaiveDate,
    #[serde(default)]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopEvidence {
    pub id: String,
    pub summary: String,
    pub time_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RunPlan {
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default)]
    pub stop_conditions: Vec<String>,
}

/// One immutable reasoning pass over the workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub transcript_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_transcript_hash: Option<String>,
    pub recommended_action: String,
    pub boundary_summary: String,
    pub flip_distance: f64,
    pub fragility: Fragility,
    #[serde(default)]
    pub top_evidence: Vec<TopEvidence>,
    #[serde(default)]
    pub plan: RunPlan,
    #[serde(default)]
    pub signature_status: SignatureStatus,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub informs: Vec<String>,
    #[serde(default)]
    pub decay_summary: DecaySummary,
    pub health: DecisionHealth,
    pub confidence: f64,
    pub executed_at: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_transcript_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionWorkspace {
    pub decision_id: String,
    #[serde(default = "default_workspace_id")]
    pub workspace_id: String,
    pub title: String,
    pub decision_type: DecisionType,
    #[serde(default)]
    pub workspace_mode: WorkspaceMode,
    #[serde(default)]
    pub state: DecisionState,
    pub created_at: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_at: Option<NaiveDate>,
    #[serde(default)]
    pub evidence: Vec<EvidenceItem>,
    #[serde(default)]
    pub tasks: Vec<TaskItem>,
    #[serde(default)]
    pub runs: Vec<RunResult>,
    #[serde(default)]
    pub drift_events: Vec<DriftEvent>,
    #[serde(default)]
    pub health_history: Vec<DecisionHealth>,
    #[serde(default)]
    pub chain: Chain,
}

impl DecisionWorkspace {
    pub fn find_evidence(&self, evidence_id: &str) -> Option<&EvidenceItem> {
        self.evidence.iter().find(|e| e.id == evidence_id)
    }

    pub fn latest_run(&self) -> Option<&RunResult> {
        self.runs.last()
    }

    pub fn latest_health(&self) -> Option<&DecisionHealth> {
        self.health_history.last()
    }

    pub fn completed_tasks(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    pub fn open_tasks(&self) -> usize {
        self.tasks.len() - self.completed_tasks()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    DependsOn,
    Informs,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub transcript_hash: String,
    pub decision_id: String,
    pub workspace_id: String,
    pub flip_distance: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
}
