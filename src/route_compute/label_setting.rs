use std::str::FromStr;

use tracing::{debug, warn};

use super::frontier::Frontier;
use super::metric::{checked_bounds, evaluate, Direction, Hop, PathMetric, Visibility};
use super::records::{Offer, RecordId, RecordState, SearchRecord, SearchRecords, SlotKey};
use crate::error::{check_count, RoutingError, Result};
use crate::model::{EdgeId, Network, NodeId, Path, Request};
use crate::runtime::config::EngineConfig;

const EPS: f64 = 1e-9;

/// What search records are keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaxationMode {
    /// One set of slots per node. Only sound for edge-only metrics.
    Node,
    /// One set of slots per arriving edge.
    Edge,
    /// `Node` for edge-only metrics, `Edge` otherwise.
    Auto,
}

impl RelaxationMode {
    pub fn resolve(self, visibility: Visibility) -> Result<RelaxationMode> {
        match (self, visibility) {
            (RelaxationMode::Auto, Visibility::EdgeOnly) => Ok(RelaxationMode::Node),
            (RelaxationMode::Auto, _) => Ok(RelaxationMode::Edge),
            (RelaxationMode::Node, Visibility::EdgeOnly) => Ok(RelaxationMode::Node),
            (RelaxationMode::Node, other) => Err(RoutingError::Configuration(format!(
                "node relaxation cannot represent a {other:?} metric"
            ))),
            (RelaxationMode::Edge, _) => Ok(RelaxationMode::Edge),
        }
    }
}

impl FromStr for RelaxationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "node" => Ok(Self::Node),
            "edge" => Ok(Self::Edge),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unsupported relaxation mode: {other}")),
        }
    }
}

/// Starting point of a search: a bare node, or (forward only) an existing
/// prefix whose cost, constraints and parameters the search continues from.
#[derive(Debug, Clone, PartialEq)]
pub struct Seed {
    pub node: NodeId,
    pub edges: Vec<EdgeId>,
    pub cost: f64,
    pub constraints: Vec<f64>,
    pub parameters: Vec<f64>,
}

impl Seed {
    pub fn at(node: NodeId) -> Self {
        Self {
            node,
            edges: Vec::new(),
            cost: 0.0,
            constraints: Vec::new(),
            parameters: Vec::new(),
        }
    }

    pub fn from_path(path: &Path) -> Self {
        Self {
            node: path.destination,
            edges: path.edges.clone(),
            cost: path.cost,
            constraints: path.constraints.clone(),
            parameters: path.parameters.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchQuery<'r> {
    pub request: &'r Request,
    pub direction: Direction,
    pub origin: Seed,
    /// Stop once the target is settled; also what heuristic guesses aim at.
    pub target: Option<NodeId>,
    /// Partial paths whose cost (plus guess) exceeds this are dropped.
    pub border: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSummary {
    pub mode: RelaxationMode,
    pub pops: usize,
    pub records: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone)]
struct Completed {
    direction: Direction,
    origin: NodeId,
    prefix: Vec<EdgeId>,
    prefix_start: NodeId,
}

/// Generalized label-setting search.
///
/// Records from the last search are kept until the next call so that
/// several destinations can be read off one run. The engine is not meant
/// to be shared between concurrent searches.
#[derive(Debug, Clone)]
pub struct LabelSettingEngine {
    config: EngineConfig,
    records: SearchRecords,
    frontier: Frontier,
    last: Option<Completed>,
}

impl LabelSettingEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            records: SearchRecords::new(),
            frontier: Frontier::new(),
            last: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn last_direction(&self) -> Option<Direction> {
        self.last.as_ref().map(|done| done.direction)
    }

    pub fn last_origin(&self) -> Option<NodeId> {
        self.last.as_ref().map(|done| done.origin)
    }

    pub fn search<M: PathMetric + ?Sized>(
        &mut self,
        network: &Network,
        metric: &M,
        query: SearchQuery<'_>,
    ) -> Result<SearchSummary> {
        self.last = None;
        self.frontier.clear();
        self.records.reset(self.config.slots_per_key);

        let SearchQuery {
            request,
            direction,
            origin,
            target,
            border,
        } = query;

        if !network.contains(origin.node) {
            return Err(RoutingError::UnknownNode(origin.node));
        }
        if let Some(target) = target {
            if !network.contains(target) {
                return Err(RoutingError::UnknownNode(target));
            }
        }
        if direction == Direction::Backward && !origin.edges.is_empty() {
            return Err(RoutingError::Configuration(
                "backward searches cannot start from a prefix".to_string(),
            ));
        }

        let visibility = metric.visibility();
        let mode = self.config.relaxation.resolve(visibility)?;
        let constraint_count = metric.number_of_constraints();
        checked_bounds(metric, request)?;

        let origin_constraints = if origin.constraints.is_empty() {
            vec![0.0; constraint_count]
        } else {
            check_count(
                "seed constraints",
                constraint_count,
                origin.constraints.len(),
            )?;
            origin.constraints.clone()
        };

        let prefix_start = origin
            .edges
            .first()
            .map(|edge| network.edge(*edge).from)
            .unwrap_or(origin.node);
        let slots = self.config.slots_per_key.max(1);
        // Without a negative cycle no record chain holds a key more than
        // `slots` times, so deeper records can only come from one.
        let keys = match mode {
            RelaxationMode::Node => network.node_count(),
            _ => network.edge_count() + 1,
        };
        let depth_limit = keys.saturating_mul(slots);
        let heuristic = self.config.heuristic;
        let guess = |node: NodeId| -> f64 {
            match target {
                Some(target) if heuristic => {
                    let value = metric.guess_for_cost(network, node, target, request);
                    if value.is_nan() {
                        0.0
                    } else {
                        value
                    }
                }
                _ => 0.0,
            }
        };

        debug!(
            "search start: origin={} target={:?} direction={:?} mode={:?} heuristic={} border={:?}",
            origin.node, target, direction, mode, heuristic, border
        );

        let origin_priority = origin.cost + guess(origin.node);
        let within_border = border
            .map(|limit| origin_priority <= limit + EPS)
            .unwrap_or(true);
        if within_border && origin_priority.is_finite() {
            let key = match mode {
                RelaxationMode::Node => SlotKey::Node(origin.node),
                _ => SlotKey::Origin,
            };
            if let Offer::Inserted { id, .. } = self.records.offer(SearchRecord {
                key,
                node: origin.node,
                edge: None,
                parent: None,
                depth: 0,
                cost: origin.cost,
                constraints: origin_constraints,
                parameters: origin.parameters.clone(),
                priority: origin_priority,
                state: RecordState::Open,
            }) {
                self.frontier.push(id, origin_priority);
            }
        }

        let mut pops = 0usize;
        let mut settled_at_target = 0usize;
        let mut negative_seen = metric.may_cost_negative(network);
        let mut truncated = false;

        loop {
            if let Some(limit) = self.config.max_pops {
                if pops >= limit {
                    truncated = !self.frontier.is_empty();
                    break;
                }
            }
            let records = &self.records;
            let Some((id, _)) = self.frontier.pop_min(|id| !records.is_open(id)) else {
                break;
            };
            pops += 1;
            self.records.finalize(id);

            let current = self.records.get(id).clone();
            if Some(current.node) == target {
                settled_at_target += 1;
                if settled_at_target >= slots && !negative_seen {
                    break;
                }
                continue;
            }

            let history = match visibility {
                Visibility::EdgeOnly => Vec::new(),
                Visibility::PreviousEdge => current
                    .edge
                    .or_else(|| origin.edges.last().copied())
                    .into_iter()
                    .collect(),
                Visibility::FullPath => self.history(id, direction, &origin.edges),
            };
            let candidates = match direction {
                Direction::Forward => network.outgoing(current.node),
                Direction::Backward => network.incoming(current.node),
            };

            for edge in candidates {
                let hop = Hop {
                    network,
                    request,
                    direction,
                    edge: *edge,
                    parameters: &current.parameters,
                };
                let Some(step) = evaluate(metric, &hop, &history)? else {
                    continue;
                };
                if step.cost < 0.0 {
                    negative_seen = true;
                }

                let next = hop.head();
                let cost = current.cost + step.cost;
                let priority = cost + guess(next);
                if !priority.is_finite() {
                    continue;
                }
                if let Some(limit) = border {
                    if priority > limit + EPS {
                        continue;
                    }
                }

                let constraints = current
                    .constraints
                    .iter()
                    .zip(&step.constraints)
                    .map(|(acc, value)| acc + value)
                    .collect();
                let key = match mode {
                    RelaxationMode::Node => SlotKey::Node(next),
                    _ => SlotKey::Edge(*edge),
                };
                if let Offer::Inserted { id: child, .. } = self.records.offer(SearchRecord {
                    key,
                    node: next,
                    edge: Some(*edge),
                    parent: Some(id),
                    depth: current.depth + 1,
                    cost,
                    constraints,
                    parameters: step.parameters,
                    priority,
                    state: RecordState::Open,
                }) {
                    if current.depth + 1 >= depth_limit {
                        warn!(
                            "negative cycle: origin={} node={} after {} pops",
                            origin.node, next, pops
                        );
                        return Err(RoutingError::Configuration(format!(
                            "negative cycle reachable from {} through {}",
                            origin.node, next
                        )));
                    }
                    self.frontier.push(child, priority);
                }
            }
        }

        if truncated {
            warn!(
                "search truncated after {} pops: origin={} target={:?}",
                pops, origin.node, target
            );
        }
        debug!(
            "search done: origin={} pops={} records={} negative_costs={}",
            origin.node,
            pops,
            self.records.len(),
            negative_seen
        );

        self.last = Some(Completed {
            direction,
            origin: origin.node,
            prefix: origin.edges,
            prefix_start,
        });
        Ok(SearchSummary {
            mode,
            pops,
            records: self.records.len(),
            truncated,
        })
    }

    /// Cheapest settled path between the last search's origin and `node`.
    pub fn best_path(&self, node: NodeId) -> Option<Path> {
        self.paths_at(node).into_iter().next()
    }

    /// Up to `slots_per_key` settled paths for `node`, cheapest first.
    pub fn paths_at(&self, node: NodeId) -> Vec<Path> {
        let Some(done) = self.last.as_ref() else {
            return Vec::new();
        };
        self.records
            .finalized_at(node)
            .into_iter()
            .take(self.config.slots_per_key.max(1))
            .map(|id| self.snapshot(done, id))
            .collect()
    }

    fn history(&self, id: RecordId, direction: Direction, prefix: &[EdgeId]) -> Vec<EdgeId> {
        match direction {
            Direction::Forward => {
                let mut edges = prefix.to_vec();
                edges.extend(self.records.trail(id));
                edges
            }
            Direction::Backward => {
                let mut edges = self.records.trail(id);
                edges.reverse();
                edges
            }
        }
    }

    fn snapshot(&self, done: &Completed, id: RecordId) -> Path {
        let record = self.records.get(id);
        let edges = self.history(id, done.direction, &done.prefix);
        let (source, destination) = match done.direction {
            Direction::Forward => (done.prefix_start, record.node),
            Direction::Backward => (record.node, done.origin),
        };
        Path {
            source,
            destination,
            edges,
            cost: record.cost,
            constraints: record.constraints.clone(),
            parameters: record.parameters.clone(),
        }
    }
}
