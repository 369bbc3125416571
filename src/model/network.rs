use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path as FsPath;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Adjacency-map form used by scalar routing code: `from -> (to -> weight)`.
pub type Graph = BTreeMap<u32, BTreeMap<u32, f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl EdgeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkMetrics {
    pub weight: f64,
    pub bandwidth: f64,
    pub delay: f64,
    pub loss: f64,
    pub utilization: f64,
}

impl LinkMetrics {
    pub fn weighted(weight: f64) -> Self {
        Self {
            weight,
            ..Self::default()
        }
    }
}

impl Default for LinkMetrics {
    fn default() -> Self {
        Self {
            weight: 1.0,
            bandwidth: f64::INFINITY,
            delay: 0.0,
            loss: 0.0,
            utilization: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub metrics: LinkMetrics,
}

#[derive(Debug, Clone, PartialEq)]
struct NodeEntry {
    name: String,
    outgoing: Vec<EdgeId>,
    incoming: Vec<EdgeId>,
}

/// Directed multigraph with stable dense identifiers.
///
/// Searches only ever hold a shared borrow, so the topology cannot change
/// underneath a running computation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Network {
    nodes: Vec<NodeEntry>,
    edges: Vec<Edge>,
    names: BTreeMap<String, NodeId>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, or returns the existing one with the same name.
    pub fn add_node(&mut self, name: &str) -> NodeId {
        if let Some(existing) = self.names.get(name) {
            return *existing;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeEntry {
            name: name.to_string(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
        });
        self.names.insert(name.to_string(), id);
        id
    }

    /// Panics if either endpoint was not created by this network.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, metrics: LinkMetrics) -> EdgeId {
        assert!(self.contains(from) && self.contains(to), "edge endpoints must exist");
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            id,
            from,
            to,
            metrics,
        });
        self.nodes[from.index()].outgoing.push(id);
        self.nodes[to.index()].incoming.push(id);
        id
    }

    pub fn add_link(&mut self, a: NodeId, b: NodeId, metrics: LinkMetrics) -> (EdgeId, EdgeId) {
        (self.add_edge(a, b, metrics), self.add_edge(b, a, metrics))
    }

    pub fn contains(&self, node: NodeId) -> bool {
        node.index() < self.nodes.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter()
    }

    pub fn node_name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.index()).map(|entry| entry.name.as_str())
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub fn outgoing(&self, node: NodeId) -> &[EdgeId] {
        self.nodes
            .get(node.index())
            .map(|entry| entry.outgoing.as_slice())
            .unwrap_or(&[])
    }

    pub fn incoming(&self, node: NodeId) -> &[EdgeId] {
        self.nodes
            .get(node.index())
            .map(|entry| entry.incoming.as_slice())
            .unwrap_or(&[])
    }

    pub fn find_edge(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.outgoing(from)
            .iter()
            .copied()
            .find(|edge| self.edge(*edge).to == to)
    }

    /// Node sequence visited by `edges`, starting at `start` when the edge
    /// list is empty.
    pub fn path_nodes(&self, start: NodeId, edges: &[EdgeId]) -> Vec<NodeId> {
        let mut nodes = Vec::with_capacity(edges.len() + 1);
        match edges.first() {
            Some(first) => nodes.push(self.edge(*first).from),
            None => nodes.push(start),
        }
        nodes.extend(edges.iter().map(|edge| self.edge(*edge).to));
        nodes
    }

    pub fn path_names(&self, start: NodeId, edges: &[EdgeId]) -> Vec<String> {
        self.path_nodes(start, edges)
            .into_iter()
            .map(|node| {
                self.node_name(node)
                    .map(str::to_string)
                    .unwrap_or_else(|| node.to_string())
            })
            .collect()
    }

    /// Builds a network from the adjacency-map form. Node names are the
    /// decimal router ids.
    pub fn from_weights(graph: &Graph) -> Self {
        let mut ids: BTreeSet<u32> = BTreeSet::new();
        for (u, neighbors) in graph {
            ids.insert(*u);
            ids.extend(neighbors.keys().copied());
        }

        let mut network = Network::new();
        for id in &ids {
            network.add_node(&id.to_string());
        }
        for (u, neighbors) in graph {
            let from = network.names[&u.to_string()];
            for (v, weight) in neighbors {
                let to = network.names[&v.to_string()];
                network.add_edge(from, to, LinkMetrics::weighted(*weight));
            }
        }
        network
    }
}

#[derive(Debug, Clone, Deserialize)]
struct EdgeInput {
    from: String,
    to: String,
    weight: f64,
    bandwidth: Option<f64>,
    delay: Option<f64>,
    loss: Option<f64>,
    utilization: Option<f64>,
    #[serde(default)]
    bidirectional: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct TopologyInput {
    nodes: Option<Vec<String>>,
    edges: Vec<EdgeInput>,
}

pub fn parse_topology(text: &str) -> Result<Network> {
    let input: TopologyInput =
        serde_json::from_str(text).context("failed to parse topology json")?;

    let mut network = Network::new();
    for name in input.nodes.unwrap_or_default() {
        network.add_node(name.trim());
    }
    for edge in input.edges {
        let from = network.add_node(edge.from.trim());
        let to = network.add_node(edge.to.trim());
        let defaults = LinkMetrics::default();
        let metrics = LinkMetrics {
            weight: edge.weight,
            bandwidth: edge.bandwidth.unwrap_or(defaults.bandwidth),
            delay: edge.delay.unwrap_or(defaults.delay),
            loss: edge.loss.unwrap_or(defaults.loss),
            utilization: edge.utilization.unwrap_or(defaults.utilization),
        };
        if edge.bidirectional {
            network.add_link(from, to, metrics);
        } else {
            network.add_edge(from, to, metrics);
        }
    }
    Ok(network)
}

pub fn load_topology(path: &FsPath) -> Result<Network> {
    let raw_text = fs::read_to_string(path)
        .with_context(|| format!("failed to read topology file {}", path.display()))?;
    parse_topology(&raw_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_weights_keeps_every_router() {
        let graph: Graph = BTreeMap::from([
            (1, BTreeMap::from([(2, 1.0), (3, 1.5)])),
            (2, BTreeMap::from([(4, 1.0)])),
        ]);
        let network = Network::from_weights(&graph);
        assert_eq!(network.node_count(), 4);
        assert_eq!(network.edge_count(), 3);

        let one = network.node_by_name("1").unwrap();
        let three = network.node_by_name("3").unwrap();
        let edge = network.find_edge(one, three).unwrap();
        assert_eq!(network.edge(edge).metrics.weight, 1.5);
        assert!(network.outgoing(three).is_empty());
    }

    #[test]
    fn topology_json_supports_bidirectional_links() {
        let network = parse_topology(
            r#"{
                "nodes": ["a"],
                "edges": [
                    {"from": "a", "to": "b", "weight": 2.0, "delay": 4.0, "bidirectional": true},
                    {"from": "b", "to": "c", "weight": 1.0}
                ]
            }"#,
        )
        .unwrap();

        let a = network.node_by_name("a").unwrap();
        let b = network.node_by_name("b").unwrap();
        let c = network.node_by_name("c").unwrap();
        assert_eq!(network.node_count(), 3);
        assert!(network.find_edge(b, a).is_some());
        assert!(network.find_edge(c, b).is_none());
        let ab = network.find_edge(a, b).unwrap();
        assert_eq!(network.edge(ab).metrics.delay, 4.0);
        assert_eq!(network.edge(ab).metrics.bandwidth, f64::INFINITY);
    }

    #[test]
    fn path_nodes_handles_empty_paths() {
        let mut network = Network::new();
        let a = network.add_node("a");
        let b = network.add_node("b");
        let ab = network.add_edge(a, b, LinkMetrics::weighted(1.0));
        assert_eq!(network.path_nodes(a, &[]), vec![a]);
        assert_eq!(network.path_nodes(a, &[ab]), vec![a, b]);
        assert_eq!(network.path_names(a, &[ab]), vec!["a", "b"]);
    }
}
