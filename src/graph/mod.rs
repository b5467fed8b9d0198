//! Relationship graph between symbols and the files that use them.
//!
//! Nodes are symbols (capped at `max_nodes`, first come first served) and,
//! optionally, the files their usages live in. Nodes are deduplicated by id
//! and identical edges are collapsed, so rendering the same symbols twice
//! gives the same diagram.

pub mod mermaid;

pub use mermaid::{generate_mermaid_diagram, DiagramOptions, DiagramType, Direction};

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use crate::ingest::{Symbol, SymbolKind, UsageKind};
use crate::validation::display_path;

/// Default cap on symbol nodes.
pub const DEFAULT_MAX_NODES: usize = 50;

#[derive(Debug, Clone)]
pub struct GraphOptions {
    /// Maximum number of symbol nodes
    pub max_nodes: usize,
    /// One edge per referencing file instead of one per usage
    pub group_by_file: bool,
    /// Emit a node for every referencing file
    pub include_files: bool,
    /// Render file labels relative to this directory
    pub root: Option<PathBuf>,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_NODES,
            group_by_file: true,
            include_files: true,
            root: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    /// `SymbolKind::File` for file nodes
    pub kind: SymbolKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub kind: UsageKind,
    pub label: Option<String>,
}

/// Deduplicated node and edge lists, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    node_ids: HashSet<String>,
    edge_keys: HashSet<GraphEdge>,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.node_ids.contains(id)
    }

    /// Add a node unless one with the same id exists. Returns whether it was added.
    pub fn add_node(&mut self, node: GraphNode) -> bool {
        if !self.node_ids.insert(node.id.clone()) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// Add an edge unless an identical one exists. Returns whether it was added.
    pub fn add_edge(&mut self, edge: GraphEdge) -> bool {
        if !self.edge_keys.insert(edge.clone()) {
            return false;
        }
        self.edges.push(edge);
        true
    }
}

/// Renderer-safe node id: every char outside `[A-Za-z0-9]` becomes `_`.
pub fn sanitize_id(name: &str) -> String {
    let id: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if id.is_empty() {
        return "_".to_string();
    }
    // `end` is a keyword in the flowchart grammar
    if id.eq_ignore_ascii_case("end") {
        return format!("{}_", id);
    }
    id
}

/// Node id for a symbol.
pub fn symbol_node_id(symbol: &Symbol) -> String {
    sanitize_id(&symbol.name)
}

/// Node id for a referencing file.
pub fn file_node_id(path: &str) -> String {
    sanitize_id(&format!("file_{}", path))
}

fn symbol_node(symbol: &Symbol) -> GraphNode {
    GraphNode {
        id: symbol_node_id(symbol),
        label: symbol.name.clone(),
        kind: symbol.kind,
    }
}

/// Graph over `symbols`.
///
/// Symbol nodes are added in input order until `max_nodes` distinct nodes
/// exist; only symbols with a node contribute edges.
pub fn build_graph(symbols: &[Symbol], options: &GraphOptions) -> RelationshipGraph {
    let mut graph = RelationshipGraph::new();
    let mut seeded = Vec::new();

    for symbol in symbols {
        let node = symbol_node(symbol);
        if !graph.has_node(&node.id) {
            if graph.node_count() >= options.max_nodes {
                continue;
            }
            graph.add_node(node);
        }
        seeded.push(symbol);
    }

    for symbol in seeded {
        add_usage_edges(&mut graph, symbol, options);
    }
    graph
}

/// Graph seeded with `symbol` alone.
pub fn build_symbol_graph(symbol: &Symbol, options: &GraphOptions) -> RelationshipGraph {
    let mut graph = RelationshipGraph::new();
    graph.add_node(symbol_node(symbol));
    add_usage_edges(&mut graph, symbol, options);
    graph
}

fn add_usage_edges(graph: &mut RelationshipGraph, symbol: &Symbol, options: &GraphOptions) {
    if symbol.usages.is_empty() {
        return;
    }
    let symbol_id = symbol_node_id(symbol);
    let root = options.root.as_deref();

    if options.group_by_file {
        // first usage per file decides the kind
        let mut by_file: BTreeMap<String, UsageKind> = BTreeMap::new();
        for usage in &symbol.usages {
            by_file
                .entry(display_path(&usage.file_path, root))
                .or_insert(usage.kind);
        }
        for (path, kind) in by_file {
            add_file_edge(graph, &symbol_id, &path, kind, kind.as_str().to_string(), options);
        }
    } else {
        for usage in &symbol.usages {
            let path = display_path(&usage.file_path, root);
            let label = format!("{}:{}", usage.kind, usage.position.line + 1);
            add_file_edge(graph, &symbol_id, &path, usage.kind, label, options);
        }
    }
}

fn add_file_edge(
    graph: &mut RelationshipGraph,
    symbol_id: &str,
    path: &str,
    kind: UsageKind,
    label: String,
    options: &GraphOptions,
) {
    let file_id = file_node_id(path);
    if options.include_files {
        graph.add_node(GraphNode {
            id: file_id.clone(),
            label: path.to_string(),
            kind: SymbolKind::File,
        });
    }

    // inheritance points from the symbol outward; everything else points in
    let (from, to) = match kind {
        UsageKind::Extend | UsageKind::Implement => (symbol_id.to_string(), file_id),
        _ => (file_id, symbol_id.to_string()),
    };
    graph.add_edge(GraphEdge {
        from,
        to,
        kind,
        label: Some(label),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{Position, Range, Usage};

    fn symbol(name: &str, kind: SymbolKind, file: &str, line: usize) -> Symbol {
        let position = Position::new(line, 0);
        Symbol::new(name, kind, file, position, Range { start: position, end: position })
    }

    fn usage(file: &str, line: usize, kind: UsageKind) -> Usage {
        let position = Position::new(line, 4);
        Usage {
            file_path: file.to_string(),
            position,
            range: Range { start: position, end: position },
            context: String::new(),
            kind,
        }
    }

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("Foo"), "Foo");
        assert_eq!(sanitize_id(".btn-primary"), "_btn_primary");
        assert_eq!(sanitize_id("--brand"), "__brand");
        assert_eq!(sanitize_id("café"), "caf_");
        assert_eq!(sanitize_id(""), "_");
        assert_eq!(sanitize_id("end"), "end_");
        assert_eq!(sanitize_id("#nav"), sanitize_id("#nav"));
    }

    #[test]
    fn test_grouped_edges_one_per_file() {
        let mut foo = symbol("Foo", SymbolKind::Class, "payments.php", 9);
        foo.usages = vec![
            usage("cart.php", 4, UsageKind::Call),
            usage("cart.php", 21, UsageKind::Reference),
            usage("shop.php", 2, UsageKind::Extend),
        ];
        let graph = build_graph(&[foo], &GraphOptions::default());

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        let cart = &graph.edges()[0];
        assert_eq!((cart.from.as_str(), cart.to.as_str()), ("file_cart_php", "Foo"));
        assert_eq!(cart.kind, UsageKind::Call);
        let shop = &graph.edges()[1];
        assert_eq!((shop.from.as_str(), shop.to.as_str()), ("Foo", "file_shop_php"));
    }

    #[test]
    fn test_ungrouped_edges_one_per_usage() {
        let mut foo = symbol("foo", SymbolKind::Function, "lib.js", 0);
        foo.usages = vec![usage("app.js", 1, UsageKind::Call), usage("app.js", 5, UsageKind::Call)];
        let options = GraphOptions {
            group_by_file: false,
            ..GraphOptions::default()
        };
        let graph = build_graph(&[foo], &options);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edges()[1].label.as_deref(), Some("call:6"));
    }

    #[test]
    fn test_file_nodes_added_once() {
        let mut a = symbol("a", SymbolKind::Function, "lib.js", 0);
        a.usages = vec![usage("app.js", 1, UsageKind::Call)];
        let mut b = symbol("b", SymbolKind::Function, "lib.js", 3);
        b.usages = vec![usage("app.js", 2, UsageKind::Call)];
        let graph = build_graph(&[a, b], &GraphOptions::default());
        let file_nodes = graph.nodes().iter().filter(|n| n.kind == SymbolKind::File).count();
        assert_eq!(file_nodes, 1);
    }

    #[test]
    fn test_max_nodes_caps_symbols_first_come() {
        let symbols: Vec<Symbol> = (0..5)
            .map(|i| symbol(&format!("s{}", i), SymbolKind::Function, "lib.js", i))
            .collect();
        let options = GraphOptions {
            max_nodes: 3,
            ..GraphOptions::default()
        };
        let graph = build_graph(&symbols, &options);
        let ids: Vec<&str> = graph.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["s0", "s1", "s2"]);
    }

    #[test]
    fn test_include_files_false() {
        let mut foo = symbol("foo", SymbolKind::Function, "lib.js", 0);
        foo.usages = vec![usage("app.js", 1, UsageKind::Call)];
        let options = GraphOptions {
            include_files: false,
            ..GraphOptions::default()
        };
        let graph = build_graph(&[foo], &options);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_symbol_graph_seeds_single_symbol() {
        let mut foo = symbol("foo", SymbolKind::Function, "lib.js", 0);
        foo.usages = vec![usage("app.js", 1, UsageKind::Import)];
        let options = GraphOptions {
            max_nodes: 0,
            ..GraphOptions::default()
        };
        let graph = build_symbol_graph(&foo, &options);
        assert_eq!(graph.nodes()[0].id, "foo");
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_file_labels_relative_to_root() {
        let mut foo = symbol("foo", SymbolKind::Function, "/proj/lib.js", 0);
        foo.usages = vec![usage("/proj/src/app.js", 1, UsageKind::Call)];
        let options = GraphOptions {
            root: Some(PathBuf::from("/proj")),
            ..GraphOptions::default()
        };
        let graph = build_graph(&[foo], &options);
        assert_eq!(graph.nodes()[1].label, "src/app.js");
        assert_eq!(graph.nodes()[1].id, "file_src_app_js");
    }
}
