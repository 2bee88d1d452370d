//! Inter-decision dependency graph.
//!
//! Nodes are run transcripts; edges come from each run's `dependsOn` and
//! `informs` lists. The graph is derived on demand from every stored
//! workspace and never persisted. A build either returns an acyclic graph or
//! fails with `CycleDetected`.

use crate::core::error::VerdictError;
use crate::core::model::{DecisionWorkspace, EdgeType, GraphEdge, GraphNode};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Declared edges naming a transcript no stored run owns.
    pub dangling: Vec<GraphEdge>,
    #[serde(skip)]
    index: BTreeMap<String, usize>,
    #[serde(skip)]
    adjacency: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FragilityRank {
    pub transcript_hash: String,
    pub decision_id: String,
    pub flip_distance: f64,
    pub downstream_impact: usize,
    pub fragility_score: f64,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Gray,
    Black,
}

/// Nodes and raw edges declared by every run, before validation.
pub fn collect(workspaces: &[DecisionWorkspace]) -> (Vec<GraphNode>, Vec<GraphEdge>) {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for ws in workspaces {
        for run in &ws.runs {
            nodes.push(GraphNode {
                transcript_hash: run.transcript_hash.clone(),
                decision_id: ws.decision_id.clone(),
                workspace_id: ws.workspace_id.clone(),
                flip_distance: run.flip_distance,
            });
            for parent in &run.depends_on {
                edges.push(GraphEdge {
                    from: parent.clone(),
                    to: run.transcript_hash.clone(),
                    edge_type: EdgeType::DependsOn,
                });
            }
            for child in &run.informs {
                edges.push(GraphEdge {
                    from: run.transcript_hash.clone(),
                    to: child.clone(),
                    edge_type: EdgeType::Informs,
                });
            }
        }
    }
    (nodes, edges)
}

impl DependencyGraph {
    pub fn build(workspaces: &[DecisionWorkspace]) -> Result<Self, VerdictError> {
        let (nodes, edges) = collect(workspaces);
        Self::from_parts(nodes, edges)
    }

    /// Deduplicate, drop dangling edges, and reject cycles.
    pub fn from_parts(
        raw_nodes: Vec<GraphNode>,
        raw_edges: Vec<GraphEdge>,
    ) -> Result<Self, VerdictError> {
        let mut by_hash: BTreeMap<String, GraphNode> = BTreeMap::new();
        for node in raw_nodes {
            by_hash.entry(node.transcript_hash.clone()).or_insert(node);
        }

        let unique: BTreeSet<GraphEdge> = raw_edges.into_iter().collect();
        let (edges, dangling): (Vec<GraphEdge>, Vec<GraphEdge>) = unique
            .into_iter()
            .partition(|e| by_hash.contains_key(&e.from) && by_hash.contains_key(&e.to));

        let mut adjacency: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for edge in &edges {
            adjacency
                .entry(edge.from.clone())
                .or_default()
                .push(edge.to.clone());
        }
        for targets in adjacency.values_mut() {
            targets.sort();
            targets.dedup();
        }

        let nodes: Vec<GraphNode> = by_hash.into_values().collect();
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.transcript_hash.clone(), i))
            .collect();

        let graph = Self {
            nodes,
            edges,
            dangling,
            index,
            adjacency,
        };
        graph.detect_cycle()?;
        Ok(graph)
    }

    pub fn node(&self, transcript_hash: &str) -> Option<&GraphNode> {
        self.index.get(transcript_hash).map(|&i| &self.nodes[i])
    }

    /// Three-color DFS from every node in sorted order, on an explicit stack
    /// so long dependency chains cannot exhaust the thread stack.
    fn detect_cycle(&self) -> Result<(), VerdictError> {
        let mut colors: FxHashMap<&str, Color> = FxHashMap::default();
        for node in &self.nodes {
            let root = node.transcript_hash.as_str();
            if colors.contains_key(root) {
                continue;
            }
            colors.insert(root, Color::Gray);
            let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
            while let Some(&(current, cursor)) = stack.last() {
                let targets = self
                    .adjacency
                    .get(current)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let Some(next) = targets.get(cursor) else {
                    colors.insert(current, Color::Black);
                    stack.pop();
                    continue;
                };
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                match colors.get(next.as_str()) {
                    Some(Color::Gray) => return Err(VerdictError::CycleDetected(next.clone())),
                    Some(Color::Black) => {}
                    None => {
                        colors.insert(next.as_str(), Color::Gray);
                        stack.push((next.as_str(), 0));
                    }
                }
            }
        }
        Ok(())
    }

    /// Every node reachable over outgoing edges, sorted, excluding the start.
    pub fn downstream_impact(&self, transcript_hash: &str) -> Result<Vec<String>, VerdictError> {
        if self.node(transcript_hash).is_none() {
            return Err(VerdictError::NotFound(format!(
                "transcript '{}' is not in the graph",
                transcript_hash
            )));
        }
        Ok(self.reachable(transcript_hash).into_iter().collect())
    }

    fn reachable(&self, start: &str) -> BTreeSet<String> {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            if let Some(targets) = self.adjacency.get(current) {
                for next in targets {
                    if next != start && seen.insert(next.clone()) {
                        queue.push_back(next);
                    }
                }
            }
        }
        seen
    }

    /// Nodes ranked by `downstreamImpact * max(1, 10 - flipDistance)`,
    /// descending, ties broken by transcript hash.
    pub fn fragility_ranking(&self) -> Vec<FragilityRank> {
        let mut ranks: Vec<FragilityRank> = self
            .nodes
            .iter()
            .map(|n| {
                let impact = self.reachable(&n.transcript_hash).len();
                FragilityRank {
                    transcript_hash: n.transcript_hash.clone(),
                    decision_id: n.decision_id.clone(),
                    flip_distance: n.flip_distance,
                    downstream_impact: impact,
                    fragility_score: impact as f64 * (10.0 - n.flip_distance).max(1.0),
                }
            })
            .collect();
        ranks.sort_by(|a, b| {
            b.fragility_score
                .partial_cmp(&a.fragility_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.transcript_hash.cmp(&b.transcript_hash))
        });
        ranks
    }
}

/// Reject `dependsOn` links to transcripts owned by another workspace id
/// unless `allow_override` is set. Unknown transcripts are not rejected here.
pub fn check_cross_workspace(
    workspaces: &[DecisionWorkspace],
    workspace_id: &str,
    depends_on: &[String],
    allow_override: bool,
) -> Result<(), VerdictError> {
    if allow_override {
        return Ok(());
    }
    let owners: BTreeMap<&str, &str> = workspaces
        .iter()
        .flat_map(|ws| {
            ws.runs
                .iter()
                .map(move |r| (r.transcript_hash.as_str(), ws.workspace_id.as_str()))
        })
        .collect();
    for dep in depends_on {
        if let Some(owner) = owners.get(dep.as_str()) {
            if *owner != workspace_id {
                return Err(VerdictError::CrossWorkspaceViolation {
                    transcript: dep.clone(),
                    owner: owner.to_string(),
                    workspace: workspace_id.to_string(),
                });
            }
        }
    }
    Ok(())
}
