//! Graph command: scan, then print a Mermaid diagram.

use anyhow::{Context, Result};
use std::path::PathBuf;
use usedby::{build_graph, build_symbol_graph, generate_mermaid_diagram, Config, Symbol};

use crate::scan_cmd::{report_diagnostics, scan_root};

pub struct GraphCommandOptions {
    /// Restrict the diagram to symbols with this name
    pub symbol: Option<String>,
    /// Write here instead of stdout
    pub output: Option<PathBuf>,
    pub include_files: bool,
    pub show_labels: bool,
}

pub async fn run_graph(root: PathBuf, config: &Config, options: &GraphCommandOptions) -> Result<()> {
    let outcome = scan_root(&root, config).await?;
    report_diagnostics(&outcome.result.diagnostics);

    let mut graph_options = config.graph_options(Some(&outcome.root));
    graph_options.include_files = options.include_files;
    let mut diagram_options = config.diagram_options();
    diagram_options.show_labels = options.show_labels;

    let graph = match &options.symbol {
        Some(name) => {
            let matches: Vec<Symbol> = outcome
                .scanner
                .find_symbols_by_name(name)
                .into_iter()
                .cloned()
                .collect();
            match matches.as_slice() {
                [] => return Err(anyhow::anyhow!("symbol not found: {}", name)),
                [single] => build_symbol_graph(single, &graph_options),
                several => build_graph(several, &graph_options),
            }
        }
        None => build_graph(&outcome.result.symbols, &graph_options),
    };

    let diagram = generate_mermaid_diagram(&graph, &diagram_options);
    match &options.output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", diagram))
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", diagram),
    }
    Ok(())
}
