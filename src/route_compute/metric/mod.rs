//! Pluggable path metrics.
//!
//! A metric answers, for one candidate edge appended to a partial path,
//! whether the edge may be used and what it contributes to cost, constraint
//! values and the carried parameter vector. Metrics come in three history
//! visibilities; the engine is written once against [`PathMetric`] and the
//! adapters in [`adapters`] lift the narrower kinds onto it.

mod adapters;
mod builtin;
mod replay;

use crate::error::{check_count, Result};
use crate::model::{Edge, EdgeId, Network, NodeId, Path, Request};

pub use adapters::{EdgeOnly, Excluding, PreviousEdgeOnly};
pub use builtin::{
    DelayConstrainedMetric, LoadAwareMetric, LoopFreeMetric, Potentials, TurnPenaltyMetric,
    WeightMetric,
};
pub use replay::replay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Visibility {
    EdgeOnly,
    PreviousEdge,
    FullPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// One candidate traversal.
///
/// In a backward search the candidate edge is prepended to the partial path
/// rather than appended, so "history" is the suffix that follows it.
#[derive(Debug, Clone, Copy)]
pub struct Hop<'a> {
    pub network: &'a Network,
    pub request: &'a Request,
    pub direction: Direction,
    pub edge: EdgeId,
    pub parameters: &'a [f64],
}

impl<'a> Hop<'a> {
    pub fn link(&self) -> &'a Edge {
        self.network.edge(self.edge)
    }

    /// The node the traversal reaches.
    pub fn head(&self) -> NodeId {
        let link = self.link();
        match self.direction {
            Direction::Forward => link.to,
            Direction::Backward => link.from,
        }
    }

    /// The node the traversal leaves.
    pub fn tail(&self) -> NodeId {
        let link = self.link();
        match self.direction {
            Direction::Forward => link.from,
            Direction::Backward => link.to,
        }
    }
}

/// Declarations shared by every visibility level.
pub trait MetricShape {
    fn number_of_constraints(&self) -> usize {
        0
    }

    fn number_of_parameters(&self) -> usize {
        0
    }

    fn constraints_bounds(&self, _request: &Request) -> Vec<f64> {
        Vec::new()
    }

    /// Lower bound on the cost from `node` to `target`. Must never
    /// overestimate, or heuristic searches lose optimality.
    fn guess_for_cost(
        &self,
        _network: &Network,
        _node: NodeId,
        _target: NodeId,
        _request: &Request,
    ) -> f64 {
        0.0
    }

    fn guess_for_constraint(
        &self,
        _network: &Network,
        _node: NodeId,
        _target: NodeId,
        _request: &Request,
        _index: usize,
    ) -> f64 {
        0.0
    }

    /// Whether any hop on `network` can cost less than zero. Single-target
    /// searches only stop early when this is false. The default looks at link
    /// weights; metrics that price hops some other way must override it.
    fn may_cost_negative(&self, network: &Network) -> bool {
        network.edges().any(|edge| edge.metrics.weight < 0.0)
    }

    /// Called when a caller commits a found path.
    fn register(&mut self, _network: &Network, _path: &Path) {}

    /// Called when a caller releases a previously committed path.
    fn deregister(&mut self, _network: &Network, _path: &Path) {}
}

/// Sees only the candidate edge.
pub trait EdgeMetric: MetricShape {
    fn has_access(&self, _hop: &Hop<'_>) -> bool {
        true
    }

    fn cost(&self, hop: &Hop<'_>) -> f64;

    fn constraints_values(&self, _hop: &Hop<'_>) -> Vec<f64> {
        Vec::new()
    }

    fn new_parameters(&self, _hop: &Hop<'_>) -> Vec<f64> {
        Vec::new()
    }
}

/// Additionally sees the edge traversed just before the candidate, or
/// `None` at the start of the path.
pub trait PreviousEdgeMetric: MetricShape {
    fn has_access(&self, _hop: &Hop<'_>, _previous: Option<EdgeId>) -> bool {
        true
    }

    fn cost(&self, hop: &Hop<'_>, previous: Option<EdgeId>) -> f64;

    fn constraints_values(&self, _hop: &Hop<'_>, _previous: Option<EdgeId>) -> Vec<f64> {
        Vec::new()
    }

    fn new_parameters(&self, _hop: &Hop<'_>, _previous: Option<EdgeId>) -> Vec<f64> {
        Vec::new()
    }
}

/// Sees the whole partial path, in forward edge order.
///
/// Implementations that only look at part of `history` should report a
/// narrower [`Visibility`] so the engine can skip rebuilding it.
pub trait PathMetric: MetricShape {
    fn visibility(&self) -> Visibility {
        Visibility::FullPath
    }

    fn has_access(&self, _hop: &Hop<'_>, _history: &[EdgeId]) -> bool {
        true
    }

    fn cost(&self, hop: &Hop<'_>, history: &[EdgeId]) -> f64;

    fn constraints_values(&self, _hop: &Hop<'_>, _history: &[EdgeId]) -> Vec<f64> {
        Vec::new()
    }

    fn new_parameters(&self, _hop: &Hop<'_>, _history: &[EdgeId]) -> Vec<f64> {
        Vec::new()
    }
}

/// The edge traversed immediately before the candidate, in traversal order.
pub fn previous_edge(direction: Direction, history: &[EdgeId]) -> Option<EdgeId> {
    match direction {
        Direction::Forward => history.last().copied(),
        Direction::Backward => history.first().copied(),
    }
}

/// Increments contributed by one accepted hop.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub cost: f64,
    pub constraints: Vec<f64>,
    pub parameters: Vec<f64>,
}

/// Evaluates one hop. `Ok(None)` means the edge is not usable; returned
/// vectors of the wrong length are a configuration error.
pub fn evaluate<M: PathMetric + ?Sized>(
    metric: &M,
    hop: &Hop<'_>,
    history: &[EdgeId],
) -> Result<Option<Step>> {
    if !metric.has_access(hop, history) {
        return Ok(None);
    }
    let cost = metric.cost(hop, history);
    if !cost.is_finite() {
        return Ok(None);
    }

    let constraints = metric.constraints_values(hop, history);
    check_count(
        "constraint values",
        metric.number_of_constraints(),
        constraints.len(),
    )?;
    let parameters = metric.new_parameters(hop, history);
    check_count(
        "new parameters",
        metric.number_of_parameters(),
        parameters.len(),
    )?;

    Ok(Some(Step {
        cost,
        constraints,
        parameters,
    }))
}

/// Bounds for `request`, checked against the declared constraint count.
pub fn checked_bounds<M: PathMetric + ?Sized>(metric: &M, request: &Request) -> Result<Vec<f64>> {
    let bounds = metric.constraints_bounds(request);
    check_count(
        "constraint bounds",
        metric.number_of_constraints(),
        bounds.len(),
    )?;
    Ok(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RoutingError;
    use crate::model::LinkMetrics;

    struct Lopsided;

    impl MetricShape for Lopsided {
        fn number_of_constraints(&self) -> usize {
            2
        }

        fn constraints_bounds(&self, _request: &Request) -> Vec<f64> {
            vec![1.0]
        }
    }

    impl EdgeMetric for Lopsided {
        fn cost(&self, hop: &Hop<'_>) -> f64 {
            hop.link().metrics.weight
        }

        fn constraints_values(&self, _hop: &Hop<'_>) -> Vec<f64> {
            vec![0.0]
        }
    }

    fn two_nodes() -> (Network, EdgeId, Request) {
        let mut network = Network::new();
        let a = network.add_node("a");
        let b = network.add_node("b");
        let ab = network.add_edge(a, b, LinkMetrics::weighted(3.0));
        (network, ab, Request::unicast(a, b))
    }

    #[test]
    fn count_mismatch_fails_fast() {
        let (network, ab, request) = two_nodes();
        let metric = EdgeOnly(Lopsided);
        let hop = Hop {
            network: &network,
            request: &request,
            direction: Direction::Forward,
            edge: ab,
            parameters: &[],
        };

        let err = evaluate(&metric, &hop, &[]).unwrap_err();
        assert_eq!(
            err,
            RoutingError::CountMismatch {
                what: "constraint values",
                expected: 2,
                actual: 1,
            }
        );
        assert!(checked_bounds(&metric, &request).is_err());
    }

    #[test]
    fn hop_orientation_follows_direction() {
        let (network, ab, request) = two_nodes();
        let forward = Hop {
            network: &network,
            request: &request,
            direction: Direction::Forward,
            edge: ab,
            parameters: &[],
        };
        let backward = Hop {
            direction: Direction::Backward,
            ..forward
        };
        assert_eq!(forward.head(), request.destination);
        assert_eq!(backward.head(), request.source);
        assert_eq!(backward.tail(), request.destination);
    }

    #[test]
    fn previous_edge_depends_on_direction() {
        let history = [EdgeId(4), EdgeId(7)];
        assert_eq!(previous_edge(Direction::Forward, &history), Some(EdgeId(7)));
        assert_eq!(previous_edge(Direction::Backward, &history), Some(EdgeId(4)));
        assert_eq!(previous_edge(Direction::Forward, &[]), None);
    }
}
