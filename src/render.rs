use std::fmt::Write;

use serde::Serialize;

use crate::graph::Graph;
use crate::types::{Edge, Node};

const NODE_ATTRS: &str = r#"node [shape=box,fontname=Helvetica,fontsize=10,margin="0.11,0"]"#;

/// Serializable, sorted snapshot of a graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphReport {
    pub package: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphReport {
    pub fn new(package: impl Into<String>, graph: &Graph) -> Self {
        let mut nodes: Vec<Node> = graph.nodes().into_iter().collect();
        nodes.sort();
        let mut edges: Vec<Edge> = graph.edges().into_iter().collect();
        edges.sort();
        Self {
            package: package.into(),
            nodes,
            edges,
        }
    }
}

/// Render the graph in Graphviz DOT syntax, nodes then edges, both sorted.
pub fn to_dot(graph: &Graph) -> String {
    let report = GraphReport::new("", graph);
    let mut out = String::from("digraph G {\n");
    let _ = writeln!(out, "    {NODE_ATTRS}");
    for node in &report.nodes {
        let _ = writeln!(out, "    {};", quote(&node.to_string()));
    }
    for edge in &report.edges {
        let _ = writeln!(
            out,
            "    {} -> {};",
            quote(&edge.from.to_string()),
            quote(&edge.to.to_string())
        );
    }
    out.push_str("}\n");
    out
}

/// Double-quoted DOT identifier.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Graph {
        let mut g = Graph::new();
        g.add_edge(Node::ty("Server"), Node::ty("Config"));
        g.add_edge(Node::function("main"), Node::ty("Server"));
        g.add_node(Node::constant("Version"));
        g
    }

    #[test]
    fn test_dot_output() {
        let expected = r#"digraph G {
    node [shape=box,fontname=Helvetica,fontsize=10,margin="0.11,0"]
    "func main";
    "type Config";
    "type Server";
    "const Version";
    "func main" -> "type Server";
    "type Server" -> "type Config";
}
"#;
        assert_eq!(to_dot(&sample()), expected);
    }

    #[test]
    fn test_dot_empty_graph() {
        let dot = to_dot(&Graph::new());
        assert_eq!(
            dot,
            "digraph G {\n    node [shape=box,fontname=Helvetica,fontsize=10,margin=\"0.11,0\"]\n}\n"
        );
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("type A"), "\"type A\"");
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
    }

    #[test]
    fn test_report_json_sorted() {
        let report = GraphReport::new("shop", &sample());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["package"], "shop");
        assert_eq!(json["nodes"].as_array().unwrap().len(), 4);
        assert_eq!(
            json["nodes"][0],
            serde_json::json!({"kind": "func", "name": "main"})
        );
        assert_eq!(
            json["edges"][1],
            serde_json::json!({
                "from": {"kind": "type", "name": "Server"},
                "to": {"kind": "type", "name": "Config"},
            })
        );
    }
}
