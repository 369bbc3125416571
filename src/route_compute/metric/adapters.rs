use std::collections::BTreeSet;

use super::{
    previous_edge, EdgeMetric, Hop, MetricShape, PathMetric, PreviousEdgeMetric, Visibility,
};
use crate::model::{EdgeId, Network, NodeId, Path, Request};

macro_rules! delegate_shape {
    ($ty:ident) => {
        impl<M: MetricShape> MetricShape for $ty<M> {
            fn number_of_constraints(&self) -> usize {
                self.0.number_of_constraints()
            }

            fn number_of_parameters(&self) -> usize {
                self.0.number_of_parameters()
            }

            fn constraints_bounds(&self, request: &Request) -> Vec<f64> {
                self.0.constraints_bounds(request)
            }

            fn guess_for_cost(
                &self,
                network: &Network,
                node: NodeId,
                target: NodeId,
                request: &Request,
            ) -> f64 {
                self.0.guess_for_cost(network, node, target, request)
            }

            fn guess_for_constraint(
                &self,
                network: &Network,
                node: NodeId,
                target: NodeId,
                request: &Request,
                index: usize,
            ) -> f64 {
                self.0
                    .guess_for_constraint(network, node, target, request, index)
            }

            fn may_cost_negative(&self, network: &Network) -> bool {
                self.0.may_cost_negative(network)
            }

            fn register(&mut self, network: &Network, path: &Path) {
                self.0.register(network, path);
            }

            fn deregister(&mut self, network: &Network, path: &Path) {
                self.0.deregister(network, path);
            }
        }
    };
}

/// Lifts an [`EdgeMetric`] onto the full-path interface by ignoring history.
#[derive(Debug, Clone, Default)]
pub struct EdgeOnly<M>(pub M);

/// Lifts a [`PreviousEdgeMetric`] onto the full-path interface by exposing
/// only the last traversed edge.
#[derive(Debug, Clone, Default)]
pub struct PreviousEdgeOnly<M>(pub M);

delegate_shape!(EdgeOnly);
delegate_shape!(PreviousEdgeOnly);

impl<M: EdgeMetric> PathMetric for EdgeOnly<M> {
    fn visibility(&self) -> Visibility {
        Visibility::EdgeOnly
    }

    fn has_access(&self, hop: &Hop<'_>, _history: &[EdgeId]) -> bool {
        self.0.has_access(hop)
    }

    fn cost(&self, hop: &Hop<'_>, _history: &[EdgeId]) -> f64 {
        self.0.cost(hop)
    }

    fn constraints_values(&self, hop: &Hop<'_>, _history: &[EdgeId]) -> Vec<f64> {
        self.0.constraints_values(hop)
    }

    fn new_parameters(&self, hop: &Hop<'_>, _history: &[EdgeId]) -> Vec<f64> {
        self.0.new_parameters(hop)
    }
}

impl<M: PreviousEdgeMetric> PathMetric for PreviousEdgeOnly<M> {
    fn visibility(&self) -> Visibility {
        Visibility::PreviousEdge
    }

    fn has_access(&self, hop: &Hop<'_>, history: &[EdgeId]) -> bool {
        self.0
            .has_access(hop, previous_edge(hop.direction, history))
    }

    fn cost(&self, hop: &Hop<'_>, history: &[EdgeId]) -> f64 {
        self.0.cost(hop, previous_edge(hop.direction, history))
    }

    fn constraints_values(&self, hop: &Hop<'_>, history: &[EdgeId]) -> Vec<f64> {
        self.0
            .constraints_values(hop, previous_edge(hop.direction, history))
    }

    fn new_parameters(&self, hop: &Hop<'_>, history: &[EdgeId]) -> Vec<f64> {
        self.0
            .new_parameters(hop, previous_edge(hop.direction, history))
    }
}

/// Denies a fixed set of edges and of nodes (as traversal heads) on top of
/// another metric. Bookkeeping hooks are not forwarded.
#[derive(Debug)]
pub struct Excluding<'m, M: ?Sized> {
    inner: &'m M,
    banned_edges: BTreeSet<EdgeId>,
    banned_nodes: BTreeSet<NodeId>,
}

impl<'m, M: PathMetric + ?Sized> Excluding<'m, M> {
    pub fn new(inner: &'m M) -> Self {
        Self {
            inner,
            banned_edges: BTreeSet::new(),
            banned_nodes: BTreeSet::new(),
        }
    }

    pub fn ban_edge(&mut self, edge: EdgeId) {
        self.banned_edges.insert(edge);
    }

    pub fn ban_node(&mut self, node: NodeId) {
        self.banned_nodes.insert(node);
    }
}

impl<M: PathMetric + ?Sized> MetricShape for Excluding<'_, M> {
    fn number_of_constraints(&self) -> usize {
        self.inner.number_of_constraints()
    }

    fn number_of_parameters(&self) -> usize {
        self.inner.number_of_parameters()
    }

    fn constraints_bounds(&self, request: &Request) -> Vec<f64> {
        self.inner.constraints_bounds(request)
    }

    fn guess_for_cost(
        &self,
        network: &Network,
        node: NodeId,
        target: NodeId,
        request: &Request,
    ) -> f64 {
        self.inner.guess_for_cost(network, node, target, request)
    }

    fn guess_for_constraint(
        &self,
        network: &Network,
        node: NodeId,
        target: NodeId,
        request: &Request,
        index: usize,
    ) -> f64 {
        self.inner
            .guess_for_constraint(network, node, target, request, index)
    }

    fn may_cost_negative(&self, network: &Network) -> bool {
        self.inner.may_cost_negative(network)
    }
}

impl<M: PathMetric + ?Sized> PathMetric for Excluding<'_, M> {
    fn visibility(&self) -> Visibility {
        self.inner.visibility()
    }

    fn has_access(&self, hop: &Hop<'_>, history: &[EdgeId]) -> bool {
        !self.banned_edges.contains(&hop.edge)
            && !self.banned_nodes.contains(&hop.head())
            && self.inner.has_access(hop, history)
    }

    fn cost(&self, hop: &Hop<'_>, history: &[EdgeId]) -> f64 {
        self.inner.cost(hop, history)
    }

    fn constraints_values(&self, hop: &Hop<'_>, history: &[EdgeId]) -> Vec<f64> {
        self.inner.constraints_values(hop, history)
    }

    fn new_parameters(&self, hop: &Hop<'_>, history: &[EdgeId]) -> Vec<f64> {
        self.inner.new_parameters(hop, history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinkMetrics;
    use crate::route_compute::metric::{Direction, TurnPenaltyMetric, WeightMetric};

    fn line() -> (Network, EdgeId, EdgeId, Request) {
        let mut network = Network::new();
        let a = network.add_node("a");
        let b = network.add_node("b");
        let (ab, ba) = network.add_link(a, b, LinkMetrics::weighted(2.0));
        (network, ab, ba, Request::unicast(a, b))
    }

    #[test]
    fn previous_edge_adapter_sees_only_the_last_edge() {
        let (network, ab, ba, request) = line();
        let metric = PreviousEdgeOnly(TurnPenaltyMetric::new(10.0));
        let hop = Hop {
            network: &network,
            request: &request,
            direction: Direction::Forward,
            edge: ba,
            parameters: &[],
        };
        assert_eq!(metric.visibility(), Visibility::PreviousEdge);
        assert_eq!(metric.cost(&hop, &[]), 2.0);
        assert_eq!(metric.cost(&hop, &[ab]), 12.0);
        assert_eq!(metric.cost(&hop, &[ba, ab]), 12.0);
        assert_eq!(metric.cost(&hop, &[ab, ba]), 2.0);
    }

    #[test]
    fn excluding_blocks_banned_edges_and_heads() {
        let (network, ab, ba, request) = line();
        let base = EdgeOnly(WeightMetric::new());
        let mut metric = Excluding::new(&base);
        metric.ban_edge(ab);
        let hop = |edge| Hop {
            network: &network,
            request: &request,
            direction: Direction::Forward,
            edge,
            parameters: &[],
        };
        assert!(!metric.has_access(&hop(ab), &[]));
        assert!(metric.has_access(&hop(ba), &[]));

        metric.ban_node(request.source);
        assert!(!metric.has_access(&hop(ba), &[]));
        assert_eq!(metric.visibility(), Visibility::EdgeOnly);
    }
}
