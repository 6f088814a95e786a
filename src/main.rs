//! Flowdoc CLI - inspect workflow documents

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;

use flowdoc::completion;
use flowdoc::error::{FixSuggestion, FlowdocError, Result};
use flowdoc::graph::{GraphEdge, GraphNode};
use flowdoc::{ModelConfig, Position, SectorOwner, SectorType, WorkflowModel};

#[derive(Parser)]
#[command(name = "flowdoc")]
#[command(about = "Flowdoc - position-aware workflow document model")]
#[command(version)]
struct Cli {
    /// Config file (debounce window, indent)
    #[arg(short, long, global = true, default_value = "flowdoc.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a workflow and report errors
    Check {
        /// Path to the workflow YAML file
        file: PathBuf,
    },

    /// List sectors, or the sectors under a position (innermost first)
    Sectors {
        file: PathBuf,

        /// Zero-based `row:column`
        #[arg(long, value_parser = parse_position)]
        at: Option<Position>,

        /// Only sectors of this type (task, name, ref, input, property,
        /// transition, when, publish, do, variable)
        #[arg(short = 't', long = "type")]
        kind: Option<SectorType>,

        #[arg(long)]
        json: bool,
    },

    /// Print the task graph
    Graph {
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Completion suggestions at a position
    Complete {
        file: PathBuf,

        /// Zero-based `row:column`
        #[arg(long, value_parser = parse_position)]
        at: Position,
    },

    /// Encode a JSON file (or stdin with `-`) as a bundle
    Pack { file: PathBuf },

    /// Decode a bundle; malformed input prints `{}`
    Unpack { data: String },
}

fn parse_position(raw: &str) -> std::result::Result<Position, String> {
    let (row, column) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected row:column, got '{}'", raw))?;
    let number = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| format!("'{}' is not a number", s))
    };
    Ok(Position::new(number(row)?, number(column)?))
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { file } => check(&cli.config, &file),
        Commands::Sectors {
            file,
            at,
            kind,
            json,
        } => sectors(&cli.config, &file, at, kind, json),
        Commands::Graph { file, json } => graph(&cli.config, &file, json),
        Commands::Complete { file, at } => complete(&cli.config, &file, at),
        Commands::Pack { file } => pack(&file),
        Commands::Unpack { data } => unpack(&data),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn load(config: &Path, file: &Path) -> Result<WorkflowModel> {
    let config = ModelConfig::load(config)?.with_env()?;
    let text = fs::read_to_string(file)?;
    WorkflowModel::with_config(&text, config)
}

fn check(config: &Path, file: &Path) -> Result<()> {
    let model = load(config, file)?;
    let roundtrip = model.document().serialize() == model.text();
    println!(
        "{} {} is valid ({} tasks, {} transitions)",
        "✓".green(),
        file.display(),
        model.tasks().len(),
        model.transitions().len()
    );
    if !roundtrip {
        eprintln!("  {} serialized text differs from the source", "Warning:".yellow());
    }
    Ok(())
}

fn owner(owner: &SectorOwner) -> String {
    match owner {
        SectorOwner::Workflow => "workflow".to_string(),
        SectorOwner::Task(name) => name.clone(),
        SectorOwner::Transition(id) => id.to_string(),
    }
}

fn sectors(
    config: &Path,
    file: &Path,
    at: Option<Position>,
    kind: Option<SectorType>,
    json: bool,
) -> Result<()> {
    let model = load(config, file)?;
    let sectors = match at {
        Some(position) => model.search(position, kind),
        None => {
            let mut all: Vec<_> = model
                .workflow_sectors()
                .iter()
                .chain(model.tasks().iter().flat_map(|t| t.sectors().iter()))
                .chain(model.transitions().iter().flat_map(|t| t.sectors().iter()))
                .filter(|s| kind.map_or(true, |k| s.kind == k))
                .collect();
            all.sort_by_key(|s| (s.range.start, s.range.end));
            all
        }
    };

    if json {
        println!("{}", to_json(&sectors)?);
        return Ok(());
    }
    if sectors.is_empty() {
        println!("{}", "No sectors".dimmed());
    }
    for sector in sectors {
        let label = sector.label.as_deref().unwrap_or("");
        println!(
            "{:<11} {:<12} {:<14} {}",
            sector.kind.to_string().cyan(),
            sector.range.to_string(),
            owner(&sector.owner),
            label.dimmed()
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct GraphView<'a> {
    nodes: &'a [&'a GraphNode],
    edges: &'a [&'a GraphEdge],
}

fn graph(config: &Path, file: &Path, json: bool) -> Result<()> {
    let model = load(config, file)?;
    let graph = model.graph();
    let nodes: Vec<_> = graph.nodes().collect();
    let edges = graph.all_edges();

    if json {
        println!("{}", to_json(&GraphView { nodes: &nodes, edges: &edges })?);
        return Ok(());
    }

    println!("{} ({})", "Nodes".cyan().bold(), nodes.len());
    for node in &nodes {
        let action = node
            .attrs
            .get("action")
            .and_then(|a| a.as_str())
            .unwrap_or("-");
        println!("  {:<16} {}", node.id.to_string().bold(), action.dimmed());
    }
    println!("{} ({})", "Edges".cyan().bold(), edges.len());
    for edge in &edges {
        let when = edge
            .attrs
            .get("when")
            .and_then(|w| w.as_str())
            .unwrap_or("");
        println!("  {:<24} {}", edge.id.to_string(), when.dimmed());
    }
    Ok(())
}

fn complete(config: &Path, file: &Path, at: Position) -> Result<()> {
    let model = load(config, file)?;
    for suggestion in completion::complete(&model, at) {
        println!(
            "{:<24} {}",
            suggestion.label.green(),
            suggestion.detail.dimmed()
        );
    }
    Ok(())
}

fn pack(file: &Path) -> Result<()> {
    let raw = if file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(file)?
    };
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| FlowdocError::MalformedBundle {
            reason: format!("input is not JSON: {}", e),
        })?;
    println!("{}", flowdoc::pack(&value));
    Ok(())
}

fn unpack(data: &str) -> Result<()> {
    let map = flowdoc::unpack(data);
    println!("{}", to_json(&map)?);
    Ok(())
}

fn to_json(value: &impl Serialize) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| FlowdocError::Io(e.into()))
}
