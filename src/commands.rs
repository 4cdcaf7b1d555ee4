use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use go_indeps::analyze_dir;
use go_indeps::frontend::go::LoadConfig;
use go_indeps::graph::Graph;
use go_indeps::render::{to_dot, GraphReport};
use go_indeps::types::NodeKind;

/// Print `data` as pretty JSON if `json` is true, otherwise call `human_fmt`.
fn output<T: Serialize>(data: &T, json: bool, human_fmt: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(data)?);
    } else {
        human_fmt(data);
    }
    Ok(())
}

/// Analyze a package and print its declaration graph.
pub fn cmd_graph(dir: &str, config: &LoadConfig, prune: bool, json: bool) -> Result<()> {
    let (package, mut graph) = analyze_dir(Path::new(dir), config)?;
    if prune {
        graph.remove_disconnected_nodes();
    }

    let report = GraphReport::new(package, &graph);
    output(&report, json, |_| print!("{}", to_dot(&graph)))
}

#[derive(Debug, Serialize)]
pub struct GraphStats {
    pub package: String,
    pub nodes: usize,
    pub edges: usize,
    pub disconnected: usize,
    pub kinds: BTreeMap<NodeKind, usize>,
}

impl GraphStats {
    fn new(package: String, graph: &Graph) -> Self {
        let nodes = graph.nodes();
        let mut kinds: BTreeMap<NodeKind, usize> =
            NodeKind::ALL.iter().map(|&k| (k, 0)).collect();
        for node in &nodes {
            *kinds.entry(node.kind()).or_default() += 1;
        }
        Self {
            package,
            nodes: nodes.len(),
            edges: graph.edge_count(),
            disconnected: nodes.iter().filter(|n| graph.is_disconnected(n)).count(),
            kinds,
        }
    }
}

/// Declaration graph statistics summary.
pub fn cmd_stats(dir: &str, config: &LoadConfig, json: bool) -> Result<()> {
    let (package, graph) = analyze_dir(Path::new(dir), config)?;
    let stats = GraphStats::new(package, &graph);

    output(&stats, json, |stats| {
        println!("Package:      {}", stats.package);
        println!("Declarations: {}", stats.nodes);
        println!("Edges:        {}", stats.edges);
        println!("Disconnected: {}", stats.disconnected);
        println!("Declarations by kind:");
        for (kind, count) in &stats.kinds {
            println!("  {kind}: {count}");
        }
    })
}
