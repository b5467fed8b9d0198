//! usedby CLI - keep `@usedby` documentation current
//!
//! Usage: usedby <command> [arguments]

mod annotate_cmd;
mod graph_cmd;
mod scan_cmd;
mod version;

use anyhow::Result;
use env_logger::{Env, Target};
use std::path::PathBuf;
use std::process::ExitCode;
use usedby::{Config, DiagramType, Direction, OutputFormat, ScanDepth};

fn print_usage() {
    eprintln!("usedby - cross-reference PHP, JavaScript and CSS symbols");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  usedby <command> [arguments]");
    eprintln!("  usedby --help");
    eprintln!("  usedby --version");
    eprintln!();
    eprintln!("  usedby scan --root <DIR> [--output <FILE>] [--format <human|json>] [--basic]");
    eprintln!("  usedby annotate --root <DIR> [--dry-run] [--diagrams] [--ungrouped]");
    eprintln!("  usedby graph --root <DIR> [--symbol <NAME>] [--output <FILE>] [--labels] [--no-files]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  scan      Extract symbols and usages, optionally persisting them as JSON");
    eprintln!("  annotate  Write @usedby doc blocks above every used definition");
    eprintln!("  graph     Print a Mermaid relationship diagram");
    eprintln!();
    eprintln!("Common arguments:");
    eprintln!("  --root <DIR>            Directory to scan (default: current directory)");
    eprintln!("  --include <GLOB>        Only scan matching files (repeatable)");
    eprintln!("  --exclude <GLOB>        Skip matching files (repeatable)");
    eprintln!("  --ungrouped             One annotation or edge per usage instead of per file");
    eprintln!();
    eprintln!("Scan arguments:");
    eprintln!("  --output <FILE>         Write the scan result to FILE");
    eprintln!("  --format <FORMAT>       Output format: human (default) or json");
    eprintln!("  --basic                 Definitions only, no usage discovery");
    eprintln!();
    eprintln!("Annotate arguments:");
    eprintln!("  --dry-run               Report files that would change without writing");
    eprintln!("  --diagrams              Embed a Mermaid diagram in every doc block");
    eprintln!("  --diagram-type <TYPE>   graph (default) or flowchart");
    eprintln!("  --direction <DIR>       TD (default), LR, RL or BT");
    eprintln!();
    eprintln!("Graph arguments:");
    eprintln!("  --symbol <NAME>         Only the symbol(s) with this name");
    eprintln!("  --output <FILE>         Write the diagram to FILE instead of stdout");
    eprintln!("  --direction <DIR>       TD (default), LR, RL or BT");
    eprintln!("  --diagram-type <TYPE>   graph (default) or flowchart");
    eprintln!("  --max-nodes <N>         Cap on symbol nodes (default: 50)");
    eprintln!("  --no-files              Leave out file nodes");
    eprintln!("  --labels                Label edges with the usage kind");
    eprintln!();
    eprintln!("Settings are read from <root>/usedby.json when present; flags override them.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}

/// Flags shared by every command, applied over `usedby.json`.
#[derive(Debug, Default)]
struct CommonArgs {
    root: Option<PathBuf>,
    include: Vec<String>,
    exclude: Vec<String>,
    basic: bool,
    ungrouped: bool,
    diagrams: bool,
    diagram_type: Option<DiagramType>,
    direction: Option<Direction>,
    max_nodes: Option<usize>,
}

impl CommonArgs {
    fn root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    fn apply(&self, config: &mut Config) {
        config.include.extend(self.include.iter().cloned());
        config.exclude.extend(self.exclude.iter().cloned());
        if self.basic {
            config.scan_depth = ScanDepth::Basic;
        }
        if self.ungrouped {
            config.group_usages_by_file = false;
        }
        if self.diagrams {
            config.include_diagrams = true;
        }
        if let Some(diagram_type) = self.diagram_type {
            config.diagram_type = diagram_type;
        }
        if let Some(direction) = self.direction {
            config.direction = direction;
        }
        if let Some(max_nodes) = self.max_nodes {
            config.max_nodes = max_nodes;
        }
    }
}

enum Command {
    Scan {
        common: CommonArgs,
        output: Option<PathBuf>,
        format: OutputFormat,
    },
    Annotate {
        common: CommonArgs,
        dry_run: bool,
    },
    Graph {
        common: CommonArgs,
        symbol: Option<String>,
        output: Option<PathBuf>,
        no_files: bool,
        labels: bool,
    },
}

fn value<'a>(args: &'a [String], i: usize) -> Result<&'a str> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("{} requires an argument", args[i]))
}

/// Consume one common flag at `args[i]`. Returns how many arguments it used.
fn parse_common(args: &[String], i: usize, common: &mut CommonArgs) -> Result<Option<usize>> {
    let used = match args[i].as_str() {
        "--root" => {
            common.root = Some(PathBuf::from(value(args, i)?));
            2
        }
        "--include" => {
            common.include.push(value(args, i)?.to_string());
            2
        }
        "--exclude" => {
            common.exclude.push(value(args, i)?.to_string());
            2
        }
        "--ungrouped" => {
            common.ungrouped = true;
            1
        }
        "--direction" => {
            common.direction = Some(value(args, i)?.parse().map_err(anyhow::Error::msg)?);
            2
        }
        "--diagram-type" => {
            common.diagram_type = Some(value(args, i)?.parse().map_err(anyhow::Error::msg)?);
            2
        }
        _ => return Ok(None),
    };
    Ok(Some(used))
}

fn parse_args(args: &[String]) -> Result<Command> {
    if args.len() < 2 {
        return Err(anyhow::anyhow!("Missing command"));
    }

    let command = args[1].as_str();
    let mut common = CommonArgs::default();
    let mut output: Option<PathBuf> = None;
    let mut format = OutputFormat::Human;
    let mut dry_run = false;
    let mut symbol: Option<String> = None;
    let mut no_files = false;
    let mut labels = false;

    let mut i = 2;
    while i < args.len() {
        if let Some(used) = parse_common(args, i, &mut common)? {
            i += used;
            continue;
        }
        match (command, args[i].as_str()) {
            ("scan" | "graph", "--output") => {
                output = Some(PathBuf::from(value(args, i)?));
                i += 2;
            }
            ("scan", "--format") => {
                let raw = value(args, i)?;
                format = OutputFormat::parse(raw)
                    .ok_or_else(|| anyhow::anyhow!("Unknown format: {}", raw))?;
                i += 2;
            }
            ("scan", "--basic") => {
                common.basic = true;
                i += 1;
            }
            ("annotate", "--dry-run") => {
                dry_run = true;
                i += 1;
            }
            ("annotate", "--diagrams") => {
                common.diagrams = true;
                i += 1;
            }
            ("graph", "--symbol") => {
                symbol = Some(value(args, i)?.to_string());
                i += 2;
            }
            ("graph", "--max-nodes") => {
                common.max_nodes = Some(value(args, i)?.parse()?);
                i += 2;
            }
            ("graph", "--no-files") => {
                no_files = true;
                i += 1;
            }
            ("graph", "--labels") => {
                labels = true;
                i += 1;
            }
            _ => {
                return Err(anyhow::anyhow!("Unknown argument: {}", args[i]));
            }
        }
    }

    match command {
        "scan" => Ok(Command::Scan {
            common,
            output,
            format,
        }),
        "annotate" => Ok(Command::Annotate { common, dry_run }),
        "graph" => Ok(Command::Graph {
            common,
            symbol,
            output,
            no_files,
            labels,
        }),
        other => Err(anyhow::anyhow!("Unknown command: {}", other)),
    }
}

/// `usedby.json` from the root with command-line flags applied.
fn load_config(common: &CommonArgs) -> Result<Config> {
    let root = common.root();
    let mut config = if root.is_dir() {
        Config::load(&root)?
    } else {
        Config::default()
    };
    common.apply(&mut config);
    Ok(config)
}

async fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Scan {
            common,
            output,
            format,
        } => {
            let config = load_config(&common)?;
            scan_cmd::run_scan(common.root(), &config, output, format).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Annotate { common, dry_run } => {
            let config = load_config(&common)?;
            let failed = annotate_cmd::run_annotate(common.root(), &config, dry_run).await?;
            Ok(if failed > 0 {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Graph {
            common,
            symbol,
            output,
            no_files,
            labels,
        } => {
            let mut config = load_config(&common)?;
            // usages are needed for edges
            config.scan_depth = ScanDepth::Deep;
            let options = graph_cmd::GraphCommandOptions {
                symbol,
                output,
                include_files: !no_files,
                show_labels: labels,
            };
            graph_cmd::run_graph(common.root(), &config, &options).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    match args[1].as_str() {
        "--help" | "-h" => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        "--version" | "-V" => {
            println!("{}", version::version());
            return ExitCode::SUCCESS;
        }
        _ => {}
    }

    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            return ExitCode::from(1);
        }
    };

    match run(command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        std::iter::once("usedby").chain(items.iter().copied()).map(String::from).collect()
    }

    #[test]
    fn test_parse_scan() {
        let command = parse_args(&args(&["scan", "--root", "src", "--basic", "--exclude", "a/**", "--format", "json"])).unwrap();
        match command {
            Command::Scan { common, format, output } => {
                assert_eq!(common.root(), PathBuf::from("src"));
                assert!(common.basic);
                assert_eq!(common.exclude, vec!["a/**".to_string()]);
                assert_eq!(format, OutputFormat::Json);
                assert!(output.is_none());
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn test_parse_graph_flags() {
        let command = parse_args(&args(&[
            "graph", "--symbol", "Foo", "--direction", "lr", "--max-nodes", "10", "--no-files", "--labels",
        ]))
        .unwrap();
        match command {
            Command::Graph {
                common,
                symbol,
                no_files,
                labels,
                ..
            } => {
                assert_eq!(symbol.as_deref(), Some("Foo"));
                assert_eq!(common.direction, Some(Direction::LR));
                assert_eq!(common.max_nodes, Some(10));
                assert!(no_files && labels);
            }
            _ => panic!("expected graph"),
        }
    }

    #[test]
    fn test_flags_scoped_to_command() {
        assert!(parse_args(&args(&["scan", "--dry-run"])).is_err());
        assert!(parse_args(&args(&["annotate", "--symbol", "x"])).is_err());
        assert!(parse_args(&args(&["annotate", "--root"])).is_err());
        assert!(parse_args(&args(&["bogus"])).is_err());
    }

    #[test]
    fn test_common_overrides_config() {
        let common = CommonArgs {
            basic: true,
            ungrouped: true,
            exclude: vec!["x/**".to_string()],
            ..CommonArgs::default()
        };
        let mut config = Config {
            exclude: vec!["y/**".to_string()],
            ..Config::default()
        };
        common.apply(&mut config);
        assert_eq!(config.scan_depth, ScanDepth::Basic);
        assert!(!config.group_usages_by_file);
        assert_eq!(config.exclude, vec!["y/**".to_string(), "x/**".to_string()]);
    }
}
