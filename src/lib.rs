//! Verdict: a decision-governance record keeper.
//!
//! Verdict tracks each decision as a long-lived, versioned workspace: evidence
//! notes, the tasks derived from them, the history of reasoning runs, links to
//! other decisions, and health/drift signals computed from all of it.
//!
//! # Core Principles
//!
//! - **Reproducible**: every time-sensitive computation takes an explicit
//!   as-of date; identical inputs give bit-identical scores and bundle hashes
//! - **Append-only history**: runs, health snapshots and drift events are
//!   never rewritten
//! - **Tamper-evident**: exported bundles carry per-file and aggregate hashes
//!   that can be re-verified from disk
//!
//! # Architecture
//!
//! - [`core`]: data model, store, config, journal, hashing and time helpers
//! - [`plugins`]: the engine subsystems
//!   - `decay`: evidence lifecycle classifier
//!   - `health`: health scores and drift events
//!   - `graph`: cross-decision dependency graph
//!   - `bundle`: export manifest and verifier
//!   - `engine`: reasoning-engine and signer seams
//!   - `decide`: workspace operations tying the above together
//!
//! # Examples
//!
//! ```bash
//! verdict start --title "Move billing to queue" --type OPS
//! verdict evidence add --id dec_... --text "Peak load is 3k rps" --asserted-at 2024-01-01
//! verdict run --id dec_...
//! verdict export --id dec_... --out ./bundle
//! verdict verify --dir ./bundle
//! ```

mod cli;
pub mod core;
pub mod plugins;

use crate::cli::{Cli, Command, DriftCommand, EvidenceCommand, GraphCommand, TaskCommand};
use crate::core::config::{self, VerdictConfig};
use crate::core::error::{self, VerdictError};
use crate::core::journal::{self, Journal};
use crate::core::model::DecisionWorkspace;
use crate::core::output;
use crate::core::store::{Store, WorkspaceStore};
use crate::core::time;
use crate::plugins::bundle::{self, ExportOptions};
use crate::plugins::decay;
use crate::plugins::decide::{self, DriftInput, EvidenceInput, RunOptions, StartRequest};
use crate::plugins::engine::{LocalEngine, NoopSigner};
use crate::plugins::graph::DependencyGraph;

use chrono::NaiveDate;
use clap::Parser;
use colored::Colorize;
use serde::Serialize;

struct Context {
    store: Store,
    journal: Journal,
    config: VerdictConfig,
    as_of: NaiveDate,
    json: bool,
}

impl Context {
    fn emit<T: Serialize>(&self, cmd: &str, status: &str, payload: &T) -> Result<(), VerdictError> {
        let extra = serde_json::json!({ "result": serde_json::to_value(payload)? });
        println!(
            "{}",
            serde_json::to_string_pretty(&time::command_envelope(cmd, status, extra))?
        );
        Ok(())
    }
}

fn build_context(cli: &Cli) -> Result<Context, VerdictError> {
    let cwd = std::env::current_dir()?;
    let root = config::resolve_root(cli.root.clone(), &cwd);
    let config = config::load_config(&root)?;
    let as_of = match cli.as_of.as_deref() {
        Some(raw) => time::parse_date(raw)?,
        None => time::today_utc(),
    };
    let json = match cli.format.as_str() {
        "json" => true,
        "text" => false,
        other => {
            return Err(VerdictError::InvalidInput(format!(
                "unknown format '{}' (expected text or json)",
                other
            )));
        }
    };
    Ok(Context {
        journal: Journal::new(&root, &config.actor),
        store: Store::new(root),
        config,
        as_of,
        json,
    })
}

/// Parse the command line, dispatch, and return the process exit code.
pub fn run() -> Result<i32, VerdictError> {
    let cli = Cli::parse();
    let ctx = build_context(&cli)?;
    dispatch(&ctx, cli.command)
}

fn dispatch(ctx: &Context, command: Command) -> Result<i32, VerdictError> {
    match command {
        Command::Start {
            title,
            decision_type,
            mode,
            review_at,
            workspace,
        } => {
            let req = StartRequest {
                title,
                decision_type,
                workspace_mode: mode,
                review_at: time::parse_optional_date(review_at.as_deref())?,
                workspace_id: workspace.unwrap_or_else(|| ctx.config.workspace_id.clone()),
            };
            let ws = decide::start(&ctx.store, &ctx.journal, req, ctx.as_of)?;
            if ctx.json {
                ctx.emit("start", "ok", &ws)?;
            } else {
                println!("Decision started: {} ({})", ws.decision_id.bold(), ws.title);
            }
        }
        Command::Evidence(evidence) => match evidence.command {
            EvidenceCommand::Add {
                id,
                text,
                source,
                asserted_at,
                expires_at,
                minutes,
                risk,
            } => {
                let input = EvidenceInput {
                    text,
                    source,
                    asserted_at: time::parse_optional_date(asserted_at.as_deref())?,
                    expires_at: time::parse_optional_date(expires_at.as_deref())?,
                    time_minutes: minutes,
                    risk,
                };
                let added = decide::add_evidence(&ctx.store, &ctx.journal, &id, input)?;
                if ctx.json {
                    ctx.emit("evidence.add", "ok", &added)?;
                } else if added.created {
                    println!(
                        "Evidence added: {} (task {})",
                        added.evidence.id, added.task.id
                    );
                } else {
                    println!("Evidence already recorded: {}", added.evidence.id);
                }
            }
            EvidenceCommand::Show { id, evidence } => {
                let (item, state) = decide::evidence_status(&ctx.store, &id, &evidence, ctx.as_of)?;
                if ctx.json {
                    ctx.emit(
                        "evidence.show",
                        "ok",
                        &serde_json::json!({ "evidence": item, "decay": state }),
                    )?;
                } else {
                    println!("{} [{:?}] {}", item.id, state, item.summary);
                }
            }
        },
        Command::Task(task) => match task.command {
            TaskCommand::Done { id, task } => {
                let done = decide::complete_task(&ctx.store, &ctx.journal, &id, &task)?;
                if ctx.json {
                    ctx.emit("task.done", "ok", &done)?;
                } else {
                    println!("Task completed: {}", done.id);
                }
            }
        },
        Command::State { id, state } => {
            let ws = decide::set_state(&ctx.store, &ctx.journal, &id, state)?;
            if ctx.json {
                ctx.emit(
                    "state",
                    "ok",
                    &serde_json::json!({ "decisionId": ws.decision_id, "state": ws.state }),
                )?;
            } else {
                println!("{} is now {}", ws.decision_id, ws.state.as_str());
            }
        }
        Command::Run {
            id,
            depends_on,
            informs,
            allow_cross_workspace,
        } => {
            let opts = RunOptions {
                depends_on,
                informs,
                allow_cross_workspace: allow_cross_workspace
                    || ctx.config.graph.allow_cross_workspace,
                as_of: ctx.as_of,
            };
            let run = decide::run_decision(
                &ctx.store,
                &ctx.journal,
                &LocalEngine,
                &NoopSigner,
                &id,
                opts,
            )?;
            if ctx.json {
                ctx.emit("run", "ok", &run)?;
            } else {
                println!("Run recorded: {}", run.transcript_hash);
                println!(
                    "  {} | {} | flip {:.2} | {}",
                    run.recommended_action.bold(),
                    output::fragility_badge(run.fragility),
                    run.flip_distance,
                    output::risk_badge(run.health.risk_score)
                );
                for step in &run.plan.next_steps {
                    println!("  next: {}", output::compact_line(step, 100));
                }
            }
        }
        Command::Outcome { id, regret, note } => {
            let event =
                decide::record_outcome(&ctx.store, &ctx.journal, &id, regret, &note, ctx.as_of)?;
            if ctx.json {
                ctx.emit("outcome", "ok", &event)?;
            } else if event.is_some() {
                println!("Outcome regret recorded for {}", id);
            } else {
                println!("Outcome recorded for {}", id);
            }
        }
        Command::Drift(drift) => match drift.command {
            DriftCommand::Record {
                id,
                drift_type,
                severity,
                assumption,
                details,
            } => {
                let input = DriftInput {
                    drift_type,
                    severity,
                    assumption_id: assumption,
                    details: serde_json::json!({ "note": details }),
                };
                let event = decide::record_drift(&ctx.store, &ctx.journal, &id, input, ctx.as_of)?;
                if ctx.json {
                    ctx.emit("drift.record", "ok", &event)?;
                } else {
                    println!(
                        "Drift recorded: {} ({})",
                        event.drift_type.as_str(),
                        output::severity_badge(event.severity)
                    );
                }
            }
        },
        Command::Show { id } => {
            let ws = ctx.store.load(&id)?;
            if ctx.json {
                ctx.emit("show", "ok", &ws)?;
            } else {
                render_workspace(&ws, ctx.as_of);
            }
        }
        Command::List => {
            let rows = decide::summarize(&ctx.store)?;
            if ctx.json {
                ctx.emit("list", "ok", &rows)?;
            } else if rows.is_empty() {
                println!("No decisions recorded.");
            } else {
                for row in rows {
                    let risk = row
                        .latest_risk
                        .map(|r| output::risk_badge(r).to_string())
                        .unwrap_or_else(|| "risk   -".dimmed().to_string());
                    println!(
                        "{}  {:<5} {:<10} {}  runs={} open_tasks={} drift={}  {}",
                        row.decision_id,
                        row.decision_type.as_str(),
                        row.state.as_str(),
                        risk,
                        row.runs,
                        row.open_tasks,
                        row.drift_events,
                        output::compact_line(&row.title, 48)
                    );
                }
            }
        }
        Command::Graph(graph) => {
            let workspaces = ctx.store.collect_all()?;
            let built = DependencyGraph::build(&workspaces)?;
            match graph.command {
                GraphCommand::Build => {
                    if ctx.json {
                        ctx.emit("graph.build", "ok", &built)?;
                    } else {
                        println!(
                            "Graph OK: {} node(s), {} edge(s), {} dangling",
                            built.nodes.len(),
                            built.edges.len(),
                            built.dangling.len()
                        );
                    }
                }
                GraphCommand::Impact { transcript } => {
                    let impact = built.downstream_impact(&transcript)?;
                    if ctx.json {
                        ctx.emit("graph.impact", "ok", &impact)?;
                    } else if impact.is_empty() {
                        println!("No downstream transcripts.");
                    } else {
                        for hash in impact {
                            println!("{}", hash);
                        }
                    }
                }
                GraphCommand::Rank => {
                    let ranks = built.fragility_ranking();
                    if ctx.json {
                        ctx.emit("graph.rank", "ok", &ranks)?;
                    } else {
                        for r in ranks {
                            println!(
                                "{:>8.2}  impact={:<3} flip={:<6.2} {} ({})",
                                r.fragility_score,
                                r.downstream_impact,
                                r.flip_distance,
                                r.transcript_hash,
                                r.decision_id
                            );
                        }
                    }
                }
            }
        }
        Command::Export {
            id,
            out,
            redact,
            sign,
        } => {
            let ws = ctx.store.load(&id)?;
            let opts = ExportOptions {
                redact_evidence: redact || ctx.config.export.redact_evidence,
                sign: sign || ctx.config.export.sign,
                as_of: ctx.as_of,
            };
            let manifest = ctx
                .journal
                .with_op("bundle.export", Some(&id), || bundle::export_bundle(&ws, &out, &opts))?;
            if ctx.json {
                ctx.emit("export", "ok", &manifest)?;
            } else {
                println!(
                    "Exported {} file(s) to {} (tree {})",
                    manifest.files.len(),
                    out.display(),
                    manifest.tree_hash
                );
            }
        }
        Command::Verify { dir } => {
            let report = bundle::verify_bundle(&dir)?;
            let status = if report.verified { "ok" } else { "tampered" };
            ctx.journal.record_or_warn(
                "bundle.verify",
                Some(&report.decision_id),
                status,
                serde_json::json!({ "drift": report.drift }),
            );
            if ctx.json {
                ctx.emit("verify", status, &report)?;
            } else if report.verified {
                println!("{} {} file(s) match the manifest", "VERIFIED".green().bold(), report.files_checked);
            } else {
                println!("{}", "TAMPER DETECTED".red().bold());
                for d in &report.drift {
                    println!("  {}", d);
                }
            }
            if !report.verified {
                return Ok(error::EXIT_TAMPER);
            }
        }
        Command::Log { limit } => {
            let events = journal::read_events(&ctx.store.root, limit)?;
            if ctx.json {
                ctx.emit("log", "ok", &events)?;
            } else {
                for ev in events {
                    println!(
                        "{} {:<18} {:<8} {}",
                        ev.ts,
                        ev.op,
                        ev.status,
                        ev.decision_id.unwrap_or_default()
                    );
                }
            }
        }
    }
    Ok(error::EXIT_OK)
}

fn render_workspace(ws: &DecisionWorkspace, as_of: NaiveDate) {
    println!("{} {}", ws.decision_id.bold(), ws.title);
    println!(
        "  type={} mode={:?} state={} workspace={}",
        ws.decision_type,
        ws.workspace_mode,
        ws.state.as_str(),
        ws.workspace_id
    );
    println!(
        "  created={} review={}",
        ws.created_at,
        ws.review_at.map(|d| d.to_string()).unwrap_or_else(|| "-".into())
    );
    println!("  evidence ({}):", ws.evidence.len());
    for (item, state) in decay::classify_all(&ws.evidence, as_of) {
        println!("    {} [{:?}] {}", item.id, state, item.summary);
    }
    println!("  tasks: {} open / {} total", ws.open_tasks(), ws.tasks.len());
    if let Some(run) = ws.latest_run() {
        println!(
            "  latest run: {} {} ({})",
            run.transcript_hash,
            run.recommended_action,
            output::fragility_badge(run.fragility)
        );
    }
    if let Some(h) = ws.latest_health() {
        println!(
            "  health: evidence={} policy={} replay={} volatility={} {}",
            h.evidence_completeness_score,
            h.policy_compliance_score,
            h.replay_stability_score,
            h.assumption_volatility_index,
            output::risk_badge(h.risk_score)
        );
    }
    for ev in &ws.drift_events {
        println!(
            "  drift {} {} {}",
            ev.detected_at,
            ev.drift_type.as_str(),
            output::severity_badge(ev.severity)
        );
    }
}
