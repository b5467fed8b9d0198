//! Mermaid rendering of a [`RelationshipGraph`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{GraphEdge, GraphNode, RelationshipGraph};
use crate::ingest::{SymbolKind, UsageKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramType {
    #[default]
    Graph,
    Flowchart,
}

impl DiagramType {
    pub fn keyword(&self) -> &'static str {
        match self {
            DiagramType::Graph => "graph",
            DiagramType::Flowchart => "flowchart",
        }
    }
}

impl FromStr for DiagramType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "graph" => Ok(DiagramType::Graph),
            "flowchart" => Ok(DiagramType::Flowchart),
            other => Err(format!("unknown diagram type: {}", other)),
        }
    }
}

/// Layout direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Top down
    #[default]
    TD,
    LR,
    RL,
    BT,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::TD => "TD",
            Direction::LR => "LR",
            Direction::RL => "RL",
            Direction::BT => "BT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TD" | "TB" => Ok(Direction::TD),
            "LR" => Ok(Direction::LR),
            "RL" => Ok(Direction::RL),
            "BT" => Ok(Direction::BT),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiagramOptions {
    pub diagram_type: DiagramType,
    pub direction: Direction,
    /// Render `|label|` on edges
    pub show_labels: bool,
}

fn shape(kind: SymbolKind) -> (&'static str, &'static str) {
    match kind {
        SymbolKind::Class => ("[", "]"),
        SymbolKind::Function => ("(", ")"),
        SymbolKind::Method => ("([", "])"),
        SymbolKind::Selector => ("{{", "}}"),
        SymbolKind::Variable => ("[/", "/]"),
        SymbolKind::Event => (">", "]"),
        SymbolKind::File => ("[[", "]]"),
    }
}

fn arrow(kind: UsageKind) -> &'static str {
    match kind {
        UsageKind::Extend => "==>",
        UsageKind::Implement => "-.->",
        UsageKind::Call => "-->",
        UsageKind::Reference => "---",
        UsageKind::Import => "-.-",
        UsageKind::Inclusion => "-->",
    }
}

fn escape_label(label: &str) -> String {
    label.replace('"', "#quot;")
}

fn node_line(node: &GraphNode) -> String {
    let (open, close) = shape(node.kind);
    format!("    {}{}\"{}\"{}", node.id, open, escape_label(&node.label), close)
}

fn edge_line(edge: &GraphEdge, show_labels: bool) -> String {
    match (&edge.label, show_labels) {
        (Some(label), true) => format!(
            "    {} {}|{}| {}",
            edge.from,
            arrow(edge.kind),
            escape_label(label),
            edge.to
        ),
        _ => format!("    {} {} {}", edge.from, arrow(edge.kind), edge.to),
    }
}

/// Render `graph` as Mermaid text.
///
/// Header first, then one line per node, then one line per edge, joined by
/// `\n` with no trailing newline. An empty graph renders the header alone.
pub fn generate_mermaid_diagram(graph: &RelationshipGraph, options: &DiagramOptions) -> String {
    let mut lines = Vec::with_capacity(1 + graph.node_count() + graph.edge_count());
    lines.push(format!("{} {}", options.diagram_type.keyword(), options.direction));
    lines.extend(graph.nodes().iter().map(node_line));
    lines.extend(graph.edges().iter().map(|e| edge_line(e, options.show_labels)));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, kind: SymbolKind) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            label: id.to_string(),
            kind,
        }
    }

    fn edge(from: &str, to: &str, kind: UsageKind) -> GraphEdge {
        GraphEdge {
            from: from.to_string(),
            to: to.to_string(),
            kind,
            label: Some(kind.as_str().to_string()),
        }
    }

    #[test]
    fn test_empty_graph_is_header_only() {
        let graph = RelationshipGraph::new();
        assert_eq!(generate_mermaid_diagram(&graph, &DiagramOptions::default()), "graph TD");

        let options = DiagramOptions {
            diagram_type: DiagramType::Flowchart,
            ..DiagramOptions::default()
        };
        assert_eq!(generate_mermaid_diagram(&graph, &options), "flowchart TD");
    }

    #[test]
    fn test_shapes_by_kind() {
        let mut graph = RelationshipGraph::new();
        graph.add_node(node("A", SymbolKind::Class));
        graph.add_node(node("b", SymbolKind::Function));
        graph.add_node(node("c", SymbolKind::Method));
        graph.add_node(node("_d", SymbolKind::Selector));
        graph.add_node(node("__e", SymbolKind::Variable));
        graph.add_node(node("f", SymbolKind::Event));
        graph.add_node(node("file_x_js", SymbolKind::File));
        let text = generate_mermaid_diagram(&graph, &DiagramOptions::default());
        let expected = [
            "graph TD",
            "    A[\"A\"]",
            "    b(\"b\")",
            "    c([\"c\"])",
            "    _d{{\"_d\"}}",
            "    __e[/\"__e\"/]",
            "    f>\"f\"]",
            "    file_x_js[[\"file_x_js\"]]",
        ]
        .join("\n");
        assert_eq!(text, expected);
    }

    #[test]
    fn test_arrows_and_labels() {
        let mut graph = RelationshipGraph::new();
        graph.add_edge(edge("Foo", "file_a", UsageKind::Extend));
        graph.add_edge(edge("Foo", "file_b", UsageKind::Implement));
        graph.add_edge(edge("file_c", "Foo", UsageKind::Call));
        graph.add_edge(edge("file_d", "Foo", UsageKind::Reference));
        graph.add_edge(edge("file_e", "Foo", UsageKind::Import));

        let options = DiagramOptions {
            direction: Direction::LR,
            ..DiagramOptions::default()
        };
        let lines: Vec<String> = generate_mermaid_diagram(&graph, &options)
            .lines()
            .map(str::to_string)
            .collect();
        assert_eq!(lines[0], "graph LR");
        assert_eq!(lines[1], "    Foo ==> file_a");
        assert_eq!(lines[2], "    Foo -.-> file_b");
        assert_eq!(lines[3], "    file_c --> Foo");
        assert_eq!(lines[4], "    file_d --- Foo");
        assert_eq!(lines[5], "    file_e -.- Foo");

        let labelled = DiagramOptions {
            show_labels: true,
            ..DiagramOptions::default()
        };
        let text = generate_mermaid_diagram(&graph, &labelled);
        assert!(text.contains("    file_c -->|call| Foo"));
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn test_label_quotes_escaped() {
        let mut graph = RelationshipGraph::new();
        graph.add_node(GraphNode {
            id: "x".into(),
            label: "a\"b".into(),
            kind: SymbolKind::Class,
        });
        let text = generate_mermaid_diagram(&graph, &DiagramOptions::default());
        assert!(text.ends_with("x[\"a#quot;b\"]"));
    }

    #[test]
    fn test_parse_options() {
        assert_eq!("lr".parse::<Direction>().unwrap(), Direction::LR);
        assert_eq!("Flowchart".parse::<DiagramType>().unwrap(), DiagramType::Flowchart);
        assert!("sideways".parse::<Direction>().is_err());
    }
}
