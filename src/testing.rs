//! Deterministic fixtures shared by the unit tests.

use std::ops::Range;

use crate::model::{EdgeId, LinkMetrics, Network, NodeId};

pub(crate) struct LcgRng {
    state: u64,
}

impl LcgRng {
    pub(crate) fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1);
        self.state
    }

    pub(crate) fn next_f64(&mut self) -> f64 {
        let raw = self.next_u64() >> 11;
        (raw as f64) / ((1_u64 << 53) as f64)
    }

    pub(crate) fn range_f64(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }
}

/// Directed random network whose node `i` is `NodeId(i)` and named `"i"`.
/// Each ordered pair gets an edge with probability `density`.
pub(crate) fn random_network(
    seed: u64,
    nodes: usize,
    density: f64,
    weights: Range<f64>,
) -> Network {
    let mut rng = LcgRng::new(seed);
    let mut network = Network::new();
    for idx in 0..nodes {
        network.add_node(&idx.to_string());
    }
    for from in 0..nodes as u32 {
        for to in 0..nodes as u32 {
            if from == to || rng.next_f64() >= density {
                continue;
            }
            let weight = rng.range_f64(weights.start, weights.end);
            network.add_edge(NodeId(from), NodeId(to), LinkMetrics::weighted(weight));
        }
    }
    network
}

/// Like [`random_network`] but edges only run from lower to higher ids, so
/// negative weights never close a cycle.
pub(crate) fn random_dag(seed: u64, nodes: usize, density: f64, weights: Range<f64>) -> Network {
    let mut rng = LcgRng::new(seed);
    let mut network = Network::new();
    for idx in 0..nodes {
        network.add_node(&idx.to_string());
    }
    for from in 0..nodes as u32 {
        for to in from + 1..nodes as u32 {
            if rng.next_f64() >= density {
                continue;
            }
            let weight = rng.range_f64(weights.start, weights.end);
            network.add_edge(NodeId(from), NodeId(to), LinkMetrics::weighted(weight));
        }
    }
    network
}

/// Every simple path from `source` to `target` with its summed weight.
pub(crate) fn brute_force_paths(
    network: &Network,
    source: NodeId,
    target: NodeId,
) -> Vec<(Vec<EdgeId>, f64)> {
    let mut out = Vec::new();
    let mut visited = vec![false; network.node_count()];
    let mut edges = Vec::new();
    visited[source.index()] = true;
    walk(network, source, target, 0.0, &mut visited, &mut edges, &mut out);
    out
}

fn walk(
    network: &Network,
    at: NodeId,
    target: NodeId,
    cost: f64,
    visited: &mut [bool],
    edges: &mut Vec<EdgeId>,
    out: &mut Vec<(Vec<EdgeId>, f64)>,
) {
    if at == target {
        out.push((edges.clone(), cost));
        return;
    }
    for edge in network.outgoing(at) {
        let link = network.edge(*edge);
        if visited[link.to.index()] {
            continue;
        }
        visited[link.to.index()] = true;
        edges.push(*edge);
        walk(
            network,
            link.to,
            target,
            cost + link.metrics.weight,
            visited,
            edges,
            out,
        );
        edges.pop();
        visited[link.to.index()] = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_networks_are_reproducible() {
        let a = random_network(7, 5, 0.5, 1.0..3.0);
        let b = random_network(7, 5, 0.5, 1.0..3.0);
        assert_eq!(a, b);
        assert_eq!(a.node_by_name("3"), Some(NodeId(3)));
        assert!(a.edges().all(|edge| (1.0..3.0).contains(&edge.metrics.weight)));
    }

    #[test]
    fn random_dags_only_point_forward() {
        let dag = random_dag(11, 6, 0.6, -4.0..4.0);
        assert!(dag.edge_count() > 0);
        assert!(dag.edges().all(|edge| edge.from.index() < edge.to.index()));
    }
}
