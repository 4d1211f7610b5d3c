#![forbid(unsafe_code)]

//! Annotation-graph CLI.
//!
//! # Commands
//!
//! - `summary`: node, edge and per-type counts of a parsed graph
//! - `node`: everything one node answers (properties, span, neighbours, parents)
//! - `validate`: parse and report the first error with its stable code

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lg_core::{Ancestry, Extent, Graph, GraphError, NodeRef, Sequence, SpanContainer};
use lg_parser::{GraphParser, ParserConfig};
use serde::Serialize;
use tokio::io::AsyncRead;
use tracing::{debug, info};

/// Annotation-graph CLI - inspect and validate graph markup.
#[derive(Debug, Parser)]
#[command(
    name = "lg-cli",
    version,
    about = "Inspect and validate annotation-graph markup",
    long_about = "Reads graph markup (nodes, properties and labelled edges over a source text)\n\
        and answers structural queries about the resulting graph."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Parser configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (can be repeated for more detail: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Debug, Args)]
struct InputArgs {
    /// Markup file path or "-" for stdin.
    #[arg(default_value = "-")]
    markup: String,

    /// Source text the node offsets point into. Spans are unavailable without it.
    #[arg(short, long)]
    text: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse a graph and print its counts.
    Summary {
        #[command(flatten)]
        input: InputArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Show one node: type, properties, span, text, neighbours and parents.
    Node {
        #[command(flatten)]
        input: InputArgs,

        /// Node id
        #[arg(long)]
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a graph and exit non-zero if it is invalid.
    Validate {
        #[command(flatten)]
        input: InputArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Serialize)]
struct SummaryResult {
    nodes: usize,
    edges: usize,
    types: Vec<TypeCount>,
    parse_time_ms: f64,
}

#[derive(Debug, Serialize)]
struct TypeCount {
    node_type: String,
    count: usize,
}

#[derive(Debug, Serialize)]
struct NodeResult {
    id: String,
    node_type: String,
    capabilities: Vec<&'static str>,
    properties: Vec<PropertyResult>,
    start: Option<usize>,
    end: Option<usize>,
    text: Option<String>,
    span_error: Option<String>,
    previous: Option<String>,
    next: Option<String>,
    first: Option<String>,
    last: Option<String>,
    parents: Vec<String>,
    children: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PropertyResult {
    name: String,
    values: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ValidateResult {
    valid: bool,
    node_count: usize,
    edge_count: usize,
    error: Option<ValidationError>,
}

#[derive(Debug, Serialize)]
struct ValidationError {
    code: &'static str,
    message: String,
    offset: Option<usize>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Summary {
            input,
            json,
            pretty,
        } => cmd_summary(&input, config, json, pretty).await,
        Command::Node { input, id, json } => cmd_node(&input, config, &id, json).await,
        Command::Validate { input, json } => cmd_validate(&input, config, json).await,
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

fn load_config(path: Option<&str>) -> Result<ParserConfig> {
    let Some(path) = path else {
        return Ok(ParserConfig::default());
    };
    let raw = std::fs::read_to_string(path).context(format!("Failed to read config: {path}"))?;
    let config = ParserConfig::from_json(&raw).context(format!("Invalid config: {path}"))?;
    info!("Loaded parser config from: {path}");
    Ok(config)
}

async fn open_markup(markup: &str) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    if markup == "-" {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(markup)
        .await
        .context(format!("Failed to open markup: {markup}"))?;
    Ok(Box::new(file))
}

async fn load_text(text: Option<&str>) -> Result<String> {
    match text {
        Some(path) if Path::new(path).exists() => tokio::fs::read_to_string(path)
            .await
            .context(format!("Failed to read text: {path}")),
        Some(path) => anyhow::bail!("Text file not found: {path}"),
        None => Ok(String::new()),
    }
}

/// Parses the input; setup failures (missing files) are `Err`, parse failures
/// are returned inside `Ok` so `validate` can report them.
async fn parse_input(
    input: &InputArgs,
    config: ParserConfig,
) -> Result<(Result<Graph, GraphError>, f64)> {
    let text = load_text(input.text.as_deref()).await?;
    let markup = open_markup(&input.markup).await?;
    let mut parser = GraphParser::new(config);

    let start = Instant::now();
    let graph = parser.parse(markup, text).await;
    let parse_time_ms = start.elapsed().as_secs_f64() * 1000.0;
    debug!(state = parser.state().as_str(), parse_time_ms, "parse finished");
    Ok((graph, parse_time_ms))
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

// =============================================================================
// Command: summary
// =============================================================================

async fn cmd_summary(input: &InputArgs, config: ParserConfig, json: bool, pretty: bool) -> Result<()> {
    let (graph, parse_time_ms) = parse_input(input, config).await?;
    let graph = graph.context(format!("Failed to parse: {}", input.markup))?;

    let result = SummaryResult {
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        types: graph
            .node_types()
            .map(|node_type| TypeCount {
                node_type: node_type.to_string(),
                count: graph.nodes_by_type(node_type).len(),
            })
            .collect(),
        parse_time_ms,
    };

    if json {
        println!("{}", to_json(&result, pretty)?);
    } else {
        println!("Nodes: {}", result.nodes);
        println!("Edges: {}", result.edges);
        println!("Types:");
        for entry in &result.types {
            println!("  {:<12} {}", entry.node_type, entry.count);
        }
    }
    Ok(())
}

// =============================================================================
// Command: node
// =============================================================================

async fn cmd_node(input: &InputArgs, config: ParserConfig, id: &str, json: bool) -> Result<()> {
    let (graph, _) = parse_input(input, config).await?;
    let graph = graph.context(format!("Failed to parse: {}", input.markup))?;
    let node = graph.node_by_id(id)?;
    let result = describe_node(node);

    if json {
        println!("{}", to_json(&result, true)?);
        return Ok(());
    }

    println!("Node {} ({})", result.id, result.node_type);
    println!("  Capabilities: {}", result.capabilities.join(", "));
    for property in &result.properties {
        println!("  {} = {}", property.name, property.values.join(" | "));
    }
    match (&result.start, &result.end, &result.span_error) {
        (Some(start), Some(end), _) => println!("  Span: {start}..{end}"),
        (_, _, Some(err)) => println!("  Span: unavailable ({err})"),
        _ => {}
    }
    if let Some(text) = &result.text {
        println!("  Text: {text:?}");
    }
    for (label, value) in [
        ("Previous", &result.previous),
        ("Next", &result.next),
        ("First", &result.first),
        ("Last", &result.last),
    ] {
        if let Some(value) = value {
            println!("  {label}: {value}");
        }
    }
    if !result.parents.is_empty() {
        println!("  Parents: {}", result.parents.join(", "));
    }
    if !result.children.is_empty() {
        println!("  Children: {}", result.children.join(", "));
    }
    Ok(())
}

fn describe_node(node: NodeRef<'_>) -> NodeResult {
    let id_of = |other: NodeRef<'_>| other.id().to_string();
    let span = node
        .start_index()
        .and_then(|start| Ok((start, node.end_index()?)));
    let (start, end, span_error) = match span {
        Ok((start, end)) => (Some(start), Some(end), None),
        Err(err) => (None, None, Some(format!("[{}] {err}", err.code().as_str()))),
    };

    NodeResult {
        id: node.id().to_string(),
        node_type: node.node_type().to_string(),
        capabilities: node.capabilities().iter().map(|cap| cap.as_str()).collect(),
        properties: node
            .properties()
            .names()
            .map(|name| PropertyResult {
                name: name.to_string(),
                values: node.properties().all(name).to_vec(),
            })
            .collect(),
        start,
        end,
        text: node.text().ok().map(str::to_string),
        span_error,
        previous: node.previous().ok().map(id_of),
        next: node.next().ok().map(id_of),
        first: node.first().ok().map(id_of),
        last: node.last().ok().map(id_of),
        parents: node.parents().into_iter().map(id_of).collect(),
        children: node.children().into_iter().map(id_of).collect(),
    }
}

// =============================================================================
// Command: validate
// =============================================================================

async fn cmd_validate(input: &InputArgs, config: ParserConfig, json: bool) -> Result<()> {
    let (graph, _) = parse_input(input, config).await?;

    let result = match &graph {
        Ok(graph) => ValidateResult {
            valid: true,
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            error: None,
        },
        Err(err) => ValidateResult {
            valid: false,
            node_count: 0,
            edge_count: 0,
            error: Some(ValidationError {
                code: err.code().as_str(),
                message: err.to_string(),
                offset: match err {
                    GraphError::MalformedInput { offset, .. } => *offset,
                    _ => None,
                },
            }),
        },
    };

    if json {
        println!("{}", to_json(&result, true)?);
    } else if let Some(err) = &result.error {
        println!("✗ Invalid graph");
        println!("  [{}] {}", err.code, err.message);
    } else {
        println!("✓ Valid graph");
        println!("  Nodes: {}", result.node_count);
        println!("  Edges: {}", result.edge_count);
    }

    if !result.valid {
        std::process::exit(1);
    }
    Ok(())
}
