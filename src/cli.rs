//! CLI struct definitions for the Verdict command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use crate::core::model::{DecisionState, DecisionType, DriftType, Severity, WorkspaceMode};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "verdict",
    version = env!("CARGO_PKG_VERSION"),
    about = "Versioned decision workspaces with evidence decay, drift signals, dependency graphs, and tamper-evident bundles."
)]
pub(crate) struct Cli {
    /// Store root (defaults to $VERDICT_HOME, then ./.verdict).
    #[clap(long, global = true)]
    pub root: Option<PathBuf>,
    /// Output format: 'text' or 'json'.
    #[clap(long, global = true, default_value = "text")]
    pub format: String,
    /// Evaluation date (YYYY-MM-DD); defaults to today (UTC).
    #[clap(long, global = true)]
    pub as_of: Option<String>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create a decision workspace.
    Start {
        #[clap(long)]
        title: String,
        #[clap(long = "type", value_enum, ignore_case = true, default_value_t = DecisionType::Eng)]
        decision_type: DecisionType,
        #[clap(long, value_enum, ignore_case = true, default_value = "internal")]
        mode: WorkspaceMode,
        /// Review date; defaults to 90 days after --as-of.
        #[clap(long)]
        review_at: Option<String>,
        /// Tenant id; defaults to the configured workspace_id.
        #[clap(long)]
        workspace: Option<String>,
    },
    /// Manage evidence notes.
    Evidence(EvidenceCli),
    /// Manage derived tasks.
    Task(TaskCli),
    /// Set the informational decision state.
    State {
        #[clap(long)]
        id: String,
        #[clap(long, value_enum, ignore_case = true)]
        state: DecisionState,
    },
    /// Evaluate a decision and append the run.
    Run {
        #[clap(long)]
        id: String,
        /// Transcript hash this run depends on (repeatable).
        #[clap(long = "depends-on")]
        depends_on: Vec<String>,
        /// Transcript hash this run informs (repeatable).
        #[clap(long)]
        informs: Vec<String>,
        /// Permit dependsOn links into other workspaces.
        #[clap(long)]
        allow_cross_workspace: bool,
    },
    /// Record an observed outcome.
    Outcome {
        #[clap(long)]
        id: String,
        /// The outcome was regretted.
        #[clap(long)]
        regret: bool,
        #[clap(long, default_value = "")]
        note: String,
    },
    /// Record drift manually.
    Drift(DriftCli),
    /// Show a decision workspace.
    Show {
        #[clap(long)]
        id: String,
    },
    /// List all decision workspaces.
    List,
    /// Inspect the cross-decision dependency graph.
    Graph(GraphCli),
    /// Export a tamper-evident bundle.
    Export {
        #[clap(long)]
        id: String,
        #[clap(long)]
        out: PathBuf,
        /// Leave raw evidence text out of the bundle.
        #[clap(long)]
        redact: bool,
        /// Require a signed transcript for verification.
        #[clap(long)]
        sign: bool,
    },
    /// Verify an exported bundle against its manifest.
    Verify {
        #[clap(long)]
        dir: PathBuf,
    },
    /// Show the mutation journal.
    Log {
        #[clap(long, default_value = "20")]
        limit: usize,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct EvidenceCli {
    #[clap(subcommand)]
    pub command: EvidenceCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum EvidenceCommand {
    /// Add an evidence note (idempotent on identical text).
    Add {
        #[clap(long)]
        id: String,
        #[clap(long)]
        text: String,
        #[clap(long)]
        source: Option<String>,
        #[clap(long)]
        asserted_at: Option<String>,
        #[clap(long)]
        expires_at: Option<String>,
        #[clap(long)]
        minutes: Option<u32>,
        #[clap(long, value_enum, ignore_case = true)]
        risk: Option<Severity>,
    },
    /// Show one evidence item with its decay state.
    Show {
        #[clap(long)]
        id: String,
        #[clap(long)]
        evidence: String,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct TaskCli {
    #[clap(subcommand)]
    pub command: TaskCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum TaskCommand {
    /// Mark a task completed.
    Done {
        #[clap(long)]
        id: String,
        #[clap(long)]
        task: String,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct DriftCli {
    #[clap(subcommand)]
    pub command: DriftCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum DriftCommand {
    /// Append a drift event.
    Record {
        #[clap(long)]
        id: String,
        #[clap(long = "type", value_enum, ignore_case = true)]
        drift_type: DriftType,
        #[clap(long, value_enum, ignore_case = true, default_value = "medium")]
        severity: Severity,
        /// Evidence id the drift concerns.
        #[clap(long)]
        assumption: Option<String>,
        #[clap(long, default_value = "")]
        details: String,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct GraphCli {
    #[clap(subcommand)]
    pub command: GraphCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum GraphCommand {
    /// Rebuild and validate the graph.
    Build,
    /// Transcripts downstream of a transcript hash.
    Impact {
        #[clap(long)]
        transcript: String,
    },
    /// Rank transcripts by fragility score.
    Rank,
}
