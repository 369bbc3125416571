use std::collections::{BTreeMap, VecDeque};

use super::{EdgeMetric, Hop, MetricShape, PathMetric, PreviousEdgeMetric, Visibility};
use crate::model::{EdgeId, Network, NodeId, Path, Request};

/// Per-node lower bounds on the remaining cost toward one target.
#[derive(Debug, Clone, PartialEq)]
pub struct Potentials {
    target: NodeId,
    bounds: Vec<f64>,
}

impl Potentials {
    pub fn from_values(target: NodeId, bounds: Vec<f64>) -> Self {
        Self { target, bounds }
    }

    /// Hop distance to `target` times the cheapest non-negative link weight.
    /// Nodes that cannot reach `target` get an infinite bound.
    pub fn hop_scaled(network: &Network, target: NodeId) -> Self {
        let min_weight = network
            .edges()
            .map(|edge| edge.metrics.weight)
            .filter(|weight| weight.is_finite())
            .fold(f64::INFINITY, f64::min)
            .max(0.0);
        let min_weight = if min_weight.is_finite() { min_weight } else { 0.0 };

        let mut hops: Vec<Option<usize>> = vec![None; network.node_count()];
        let mut queue = VecDeque::new();
        if network.contains(target) {
            hops[target.index()] = Some(0);
            queue.push_back(target);
        }
        while let Some(node) = queue.pop_front() {
            let depth = hops[node.index()].unwrap_or(0);
            for edge in network.incoming(node) {
                let pred = network.edge(*edge).from;
                if hops[pred.index()].is_none() {
                    hops[pred.index()] = Some(depth + 1);
                    queue.push_back(pred);
                }
            }
        }

        let bounds = hops
            .into_iter()
            .map(|hop| match hop {
                Some(count) => count as f64 * min_weight,
                None => f64::INFINITY,
            })
            .collect();
        Self { target, bounds }
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn bound(&self, node: NodeId, target: NodeId) -> f64 {
        if target != self.target {
            return 0.0;
        }
        self.bounds.get(node.index()).copied().unwrap_or(0.0)
    }
}

/// Plain administrative weight. Optimal under every engine configuration
/// as long as weights are non-negative.
#[derive(Debug, Clone, Default)]
pub struct WeightMetric {
    potentials: Option<Potentials>,
}

impl WeightMetric {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_potentials(potentials: Potentials) -> Self {
        Self {
            potentials: Some(potentials),
        }
    }
}

impl MetricShape for WeightMetric {
    fn guess_for_cost(
        &self,
        _network: &Network,
        node: NodeId,
        target: NodeId,
        _request: &Request,
    ) -> f64 {
        self.potentials
            .as_ref()
            .map(|potentials| potentials.bound(node, target))
            .unwrap_or(0.0)
    }
}

impl EdgeMetric for WeightMetric {
    fn cost(&self, hop: &Hop<'_>) -> f64 {
        hop.link().metrics.weight
    }
}

const DELAY: usize = 0;
const BOTTLENECK: usize = 1;

/// Weight as cost with delay and loss as additive constraints.
///
/// Parameters are `[accumulated delay, bottleneck bandwidth]`. Links below
/// the requested bandwidth or above the utilization cap are never used, and
/// a link is refused once the carried delay would overrun the bound.
#[derive(Debug, Clone, Default)]
pub struct DelayConstrainedMetric {
    delay_floor: Option<Potentials>,
}

impl DelayConstrainedMetric {
    pub fn new() -> Self {
        Self::default()
    }

    /// `delay_floor` must never exceed the true minimum delay to its target.
    pub fn with_delay_floor(delay_floor: Potentials) -> Self {
        Self {
            delay_floor: Some(delay_floor),
        }
    }

    fn carried_delay(parameters: &[f64]) -> f64 {
        parameters.get(DELAY).copied().unwrap_or(0.0)
    }

    fn carried_bottleneck(parameters: &[f64]) -> f64 {
        parameters.get(BOTTLENECK).copied().unwrap_or(f64::INFINITY)
    }
}

impl MetricShape for DelayConstrainedMetric {
    fn number_of_constraints(&self) -> usize {
        2
    }

    fn number_of_parameters(&self) -> usize {
        2
    }

    fn constraints_bounds(&self, request: &Request) -> Vec<f64> {
        vec![
            request.qos.max_delay.unwrap_or(f64::INFINITY),
            request.qos.max_loss.unwrap_or(f64::INFINITY),
        ]
    }

    fn guess_for_constraint(
        &self,
        _network: &Network,
        node: NodeId,
        target: NodeId,
        _request: &Request,
        index: usize,
    ) -> f64 {
        match (&self.delay_floor, index) {
            (Some(floor), DELAY) => floor.bound(node, target),
            _ => 0.0,
        }
    }
}

impl EdgeMetric for DelayConstrainedMetric {
    fn has_access(&self, hop: &Hop<'_>) -> bool {
        let metrics = hop.link().metrics;
        let qos = hop.request.qos;
        if let Some(min_bw) = qos.min_bandwidth {
            if metrics.bandwidth < min_bw {
                return false;
            }
        }
        if let Some(max_utilization) = qos.max_utilization {
            if metrics.utilization > max_utilization {
                return false;
            }
        }
        if let Some(max_delay) = qos.max_delay {
            if Self::carried_delay(hop.parameters) + metrics.delay > max_delay {
                return false;
            }
        }
        true
    }

    fn cost(&self, hop: &Hop<'_>) -> f64 {
        hop.link().metrics.weight
    }

    fn constraints_values(&self, hop: &Hop<'_>) -> Vec<f64> {
        let metrics = hop.link().metrics;
        vec![metrics.delay, metrics.loss]
    }

    fn new_parameters(&self, hop: &Hop<'_>) -> Vec<f64> {
        let metrics = hop.link().metrics;
        vec![
            Self::carried_delay(hop.parameters) + metrics.delay,
            Self::carried_bottleneck(hop.parameters).min(metrics.bandwidth),
        ]
    }
}

/// Weight plus a fixed penalty for turning straight back over the link
/// just traversed.
#[derive(Debug, Clone)]
pub struct TurnPenaltyMetric {
    penalty: f64,
}

impl TurnPenaltyMetric {
    pub fn new(penalty: f64) -> Self {
        Self { penalty }
    }
}

impl MetricShape for TurnPenaltyMetric {
    fn may_cost_negative(&self, network: &Network) -> bool {
        self.penalty < 0.0 || network.edges().any(|edge| edge.metrics.weight < 0.0)
    }
}

impl PreviousEdgeMetric for TurnPenaltyMetric {
    fn cost(&self, hop: &Hop<'_>, previous: Option<EdgeId>) -> f64 {
        let link = hop.link();
        let u_turn = previous
            .map(|prev| hop.network.edge(prev))
            .map(|prev| prev.from == link.to && prev.to == link.from)
            .unwrap_or(false);
        if u_turn {
            link.metrics.weight + self.penalty
        } else {
            link.metrics.weight
        }
    }
}

/// Refuses any edge whose head is already on the partial path.
#[derive(Debug, Clone, Default)]
pub struct LoopFreeMetric<M>(pub M);

impl<M: PathMetric> MetricShape for LoopFreeMetric<M> {
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

impl<M: PathMetric> PathMetric for LoopFreeMetric<M> {
    fn visibility(&self) -> Visibility {
        Visibility::FullPath
    }

    fn has_access(&self, hop: &Hop<'_>, history: &[EdgeId]) -> bool {
        // An empty history leaves just the tail.
        let visited = hop.network.path_nodes(hop.tail(), history);
        !visited.contains(&hop.head()) && self.0.has_access(hop, history)
    }

    fn cost(&self, hop: &Hop<'_>, history: &[EdgeId]) -> f64 {
        self.0.cost(hop, history)
    }

    fn constraints_values(&self, hop: &Hop<'_>, history: &[EdgeId]) -> Vec<f64> {
        self.0.constraints_values(hop, history)
    }

    fn new_parameters(&self, hop: &Hop<'_>, history: &[EdgeId]) -> Vec<f64> {
        self.0.new_parameters(hop, history)
    }
}

/// Adds `penalty` per committed flow already crossing an edge.
#[derive(Debug, Clone)]
pub struct LoadAwareMetric<M> {
    inner: M,
    penalty: f64,
    flows: BTreeMap<EdgeId, usize>,
}

impl<M: EdgeMetric> LoadAwareMetric<M> {
    pub fn new(inner: M, penalty: f64) -> Self {
        Self {
            inner,
            penalty,
            flows: BTreeMap::new(),
        }
    }

    pub fn flows_on(&self, edge: EdgeId) -> usize {
        self.flows.get(&edge).copied().unwrap_or(0)
    }
}

impl<M: EdgeMetric> MetricShape for LoadAwareMetric<M> {
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
        self.penalty < 0.0 || self.inner.may_cost_negative(network)
    }

    fn register(&mut self, _network: &Network, path: &Path) {
        for edge in &path.edges {
            *self.flows.entry(*edge).or_default() += 1;
        }
    }

    fn deregister(&mut self, _network: &Network, path: &Path) {
        for edge in &path.edges {
            if let Some(count) = self.flows.get_mut(edge) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.flows.remove(edge);
                }
            }
        }
    }
}

impl<M: EdgeMetric> EdgeMetric for LoadAwareMetric<M> {
    fn has_access(&self, hop: &Hop<'_>) -> bool {
        self.inner.has_access(hop)
    }

    fn cost(&self, hop: &Hop<'_>) -> f64 {
        self.inner.cost(hop) + self.penalty * self.flows_on(hop.edge) as f64
    }

    fn constraints_values(&self, hop: &Hop<'_>) -> Vec<f64> {
        self.inner.constraints_values(hop)
    }

    fn new_parameters(&self, hop: &Hop<'_>) -> Vec<f64> {
        self.inner.new_parameters(hop)
    }
}
