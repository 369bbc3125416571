use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use qosroute::model::{load_topology, Network, NodeId, Path};
use qosroute::route_compute::{DelayConstrainedMetric, EdgeOnly};
use qosroute::runtime::config::{load_engine_config, EngineConfig};
use qosroute::{QosBounds, Request, RequestKind, Response, Router};
use serde_json::{json, Value};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "qosroute")]
#[command(about = "Compute QoS-constrained routes over a JSON topology")]
struct Args {
    #[arg(long)]
    topology: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    source: String,
    #[arg(long)]
    destination: String,
    /// Ask for the k cheapest simple paths instead of one.
    #[arg(long)]
    k: Option<usize>,
    #[arg(long)]
    max_delay: Option<f64>,
    #[arg(long)]
    min_bandwidth: Option<f64>,
    #[arg(long, default_value = "INFO")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let network = load_topology(&args.topology)?;
    let cfg = match &args.config {
        Some(path) => load_engine_config(path)?,
        None => EngineConfig::default(),
    };
    info!(
        "loaded topology {}: {} nodes, {} edges",
        args.topology.display(),
        network.node_count(),
        network.edge_count()
    );

    let source = resolve_node(&network, &args.source)?;
    let destination = resolve_node(&network, &args.destination)?;
    let kind = match args.k {
        Some(k) => RequestKind::KShortest { k },
        None => RequestKind::Unicast,
    };
    let request = Request::unicast(source, destination)
        .with_qos(QosBounds {
            max_delay: args.max_delay,
            min_bandwidth: args.min_bandwidth,
            ..QosBounds::default()
        })
        .with_kind(kind);

    let mut router = Router::new(&network, EdgeOnly(DelayConstrainedMetric::new()), cfg);
    let response = router.solve(&request)?;
    info!("request {} -> {} feasible={}", source, destination, response.is_feasible());

    let paths: Vec<Value> = match &response {
        Response::Path(path) => vec![path_json(&network, path)],
        Response::Paths(paths) => paths.iter().map(|path| path_json(&network, path)).collect(),
        Response::Infeasible => Vec::new(),
    };
    let payload = json!({
        "source": args.source,
        "destination": args.destination,
        "feasible": response.is_feasible(),
        "paths": paths,
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

/// Looks a node up by name first, then by numeric id.
fn resolve_node(network: &Network, raw: &str) -> Result<NodeId> {
    let raw = raw.trim();
    if let Some(node) = network.node_by_name(raw) {
        return Ok(node);
    }
    raw.parse::<u32>()
        .ok()
        .map(NodeId)
        .filter(|node| network.contains(*node))
        .ok_or_else(|| anyhow!("unknown node: {raw}"))
}

fn path_json(network: &Network, path: &Path) -> Value {
    json!({
        "nodes": network.path_names(path.source, &path.edges),
        "cost": path.cost,
        "constraints": path.constraints,
        "hops": path.hop_count(),
    })
}

fn init_logging(level: &str) -> Result<()> {
    let level = level.parse::<Level>()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .compact()
        .init();
    Ok(())
}
