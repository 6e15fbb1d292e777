//! Query command - Evaluate a selector against a graph document

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use depquery_config::DepQueryConfig;
use depquery_core::{DependencyGraph, GraphDocument, InMemorySecurityArchive};
use depquery_query::{Query, QueryOptions, QueryResponse, RegistryClient};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::GlobalOptions;

/// Arguments for the query command
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Selector to evaluate (e.g. ':root > .dev')
    selector: String,

    /// Graph document (JSON)
    #[arg(long, short = 'g')]
    graph: PathBuf,

    /// Security archive (JSON), required by alert and score selectors
    #[arg(long, short = 'a')]
    archive: Option<PathBuf>,

    /// Treat unknown or invalid selectors as matching nothing
    #[arg(long)]
    loose: bool,

    /// Output format: text (default), json
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Debug, Serialize)]
struct NodeOutput {
    id: String,
    name: String,
    version: Option<String>,
}

#[derive(Debug, Serialize)]
struct EdgeOutput {
    name: String,
    #[serde(rename = "type")]
    dep_type: &'static str,
    spec: String,
    from: String,
    to: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResponseOutput {
    nodes: Vec<NodeOutput>,
    edges: Vec<EdgeOutput>,
}

impl From<&QueryResponse> for ResponseOutput {
    fn from(response: &QueryResponse) -> Self {
        Self {
            nodes: response
                .nodes
                .iter()
                .map(|node| NodeOutput {
                    id: node.id.to_string(),
                    name: node.name.clone(),
                    version: node.version.clone(),
                })
                .collect(),
            edges: response
                .edges
                .iter()
                .map(|edge| EdgeOutput {
                    name: edge.name().to_string(),
                    dep_type: edge.dep_type().as_str(),
                    spec: edge.spec().bare_spec.clone(),
                    from: edge.from().id.to_string(),
                    to: edge.to().map(|node| node.id.to_string()),
                })
                .collect(),
        }
    }
}

/// Execute the query command
pub async fn execute(args: QueryArgs, global: GlobalOptions, config: DepQueryConfig) -> Result<()> {
    let graph = load_graph(&args.graph)?;
    debug!(
        "Loaded graph with {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    let registry = RegistryClient::new(config.registry.timeout())
        .context("Failed to create registry client")?
        .with_retries(config.registry.retries)
        .with_retry_delay(config.registry.retry_delay());

    let mut options = QueryOptions::new(graph)
        .with_spec_options(config.registry.spec_options())
        .with_registry(registry)
        .with_loose(args.loose || config.query.loose);

    if let Some(ref path) = args.archive {
        options = options.with_security_archive(Arc::new(load_archive(path)?));
    }

    // Ctrl-C aborts in-flight registry lookups
    let signal = CancellationToken::new();
    let canceller = signal.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let query = Query::new(options);
    let response = query
        .search(&args.selector, Some(signal))
        .await
        .with_context(|| format!("Query failed: {}", args.selector))?;

    match args.output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&ResponseOutput::from(response.as_ref()))
                .context("Failed to serialize results")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            if response.nodes.is_empty() {
                if !global.quiet {
                    eprintln!("No packages matched: {}", args.selector);
                }
            } else {
                for node in &response.nodes {
                    println!(
                        "{}\t{}\t{}",
                        node.name,
                        node.version.as_deref().unwrap_or("-"),
                        node.id
                    );
                }
            }

            if !global.quiet {
                eprintln!(
                    "{} packages, {} edges",
                    response.nodes.len(),
                    response.edges.len()
                );
            }
        }
    }

    Ok(())
}

fn load_graph(path: &Path) -> Result<Arc<DependencyGraph>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read graph document {}", path.display()))?;
    let graph = GraphDocument::from_json(&content)
        .and_then(GraphDocument::into_graph)
        .with_context(|| format!("Invalid graph document {}", path.display()))?;
    Ok(Arc::new(graph))
}

fn load_archive(path: &Path) -> Result<InMemorySecurityArchive> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read security archive {}", path.display()))?;
    InMemorySecurityArchive::from_json(&content)
        .with_context(|| format!("Invalid security archive {}", path.display()))
}
