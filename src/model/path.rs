use serde::Serialize;

use super::network::{EdgeId, Network, NodeId};

/// A computed route. Independent of any search state once returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Path {
    pub source: NodeId,
    pub destination: NodeId,
    pub edges: Vec<EdgeId>,
    pub cost: f64,
    pub constraints: Vec<f64>,
    pub parameters: Vec<f64>,
}

impl Path {
    pub fn empty(node: NodeId) -> Self {
        Self {
            source: node,
            destination: node,
            edges: Vec::new(),
            cost: 0.0,
            constraints: Vec::new(),
            parameters: Vec::new(),
        }
    }

    pub fn hop_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self, network: &Network) -> Vec<NodeId> {
        network.path_nodes(self.source, &self.edges)
    }

    pub fn is_simple(&self, network: &Network) -> bool {
        let mut nodes = self.nodes(network);
        let len = nodes.len();
        nodes.sort();
        nodes.dedup();
        nodes.len() == len
    }

    /// True when every constraint value is within its bound.
    pub fn satisfies(&self, bounds: &[f64]) -> bool {
        self.constraints
            .iter()
            .zip(bounds)
            .all(|(value, bound)| *value <= *bound)
    }
}
