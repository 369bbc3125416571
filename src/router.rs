//! Request dispatch on top of the label-setting engine.

use tracing::{debug, warn};

use crate::error::{Result, RoutingError};
use crate::model::{Network, NodeId, Path, Request, RequestKind, Response};
use crate::route_compute::metric::checked_bounds;
use crate::route_compute::{
    replay, Direction, KShortestPaths, LabelSettingEngine, PathMetric, SearchQuery, SearchSummary,
    Seed,
};
use crate::runtime::config::EngineConfig;

const EPS: f64 = 1e-9;

/// Routes typed requests to the engine and checks what comes back.
///
/// Unless the config enables `debug`, every returned path is replayed
/// against the metric and compared with the request's bounds; a violation
/// turns into `Infeasible`. Bulk query results stay available until the
/// next bulk setup call.
pub struct Router<'n, M: PathMetric> {
    network: &'n Network,
    metric: M,
    config: EngineConfig,
    solver: LabelSettingEngine,
    bulk: LabelSettingEngine,
    bulk_request: Option<Request>,
}

impl<'n, M: PathMetric> Router<'n, M> {
    pub fn new(network: &'n Network, metric: M, config: EngineConfig) -> Self {
        Self {
            network,
            metric,
            solver: LabelSettingEngine::new(config.clone()),
            bulk: LabelSettingEngine::new(config.clone()),
            config,
            bulk_request: None,
        }
    }

    pub fn network(&self) -> &'n Network {
        self.network
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }

    pub fn metric_mut(&mut self) -> &mut M {
        &mut self.metric
    }

    pub fn solve(&mut self, request: &Request) -> Result<Response> {
        self.check_nodes(&request.nodes())?;
        debug!(
            "solve: {} -> {} kind={:?}",
            request.source, request.destination, request.kind
        );

        match &request.kind {
            RequestKind::Unicast => {
                let found = self.solve_segments(request, &[request.source, request.destination])?;
                Ok(found.map_or(Response::Infeasible, Response::Path))
            }
            RequestKind::Waypoint { via } => {
                let mut stops = Vec::with_capacity(via.len() + 2);
                stops.push(request.source);
                stops.extend(via.iter().copied());
                stops.push(request.destination);
                let found = self.solve_segments(request, &stops)?;
                Ok(found.map_or(Response::Infeasible, Response::Path))
            }
            RequestKind::Multicast { additional } => {
                let mut destinations = vec![request.destination];
                destinations.extend(additional.iter().copied());
                self.solve_multicast(request, &destinations)
            }
            RequestKind::KShortest { k } => self.solve_k_shortest(request, *k),
        }
    }

    /// Lazy k-shortest simple paths for `request`. Every call starts over.
    pub fn k_shortest(&self, request: &Request) -> Result<KShortestPaths<'_, M>> {
        KShortestPaths::new(self.network, &self.metric, request, &self.config)
    }

    /// Forward one-to-many search; read results with [`Self::path_from_node_to`].
    pub fn compute_paths_to_any_node_from(
        &mut self,
        source: NodeId,
        request: &Request,
        border: Option<f64>,
    ) -> Result<SearchSummary> {
        self.bulk_search(Direction::Forward, source, request, border)
    }

    /// Backward many-to-one search; read results with [`Self::path_to_node_from`].
    pub fn compute_paths_from_any_node_to(
        &mut self,
        destination: NodeId,
        request: &Request,
        border: Option<f64>,
    ) -> Result<SearchSummary> {
        self.bulk_search(Direction::Backward, destination, request, border)
    }

    pub fn path_from_node_to(&self, destination: NodeId) -> Result<Option<Path>> {
        self.bulk_path(Direction::Forward, destination)
    }

    pub fn path_to_node_from(&self, source: NodeId) -> Result<Option<Path>> {
        self.bulk_path(Direction::Backward, source)
    }

    /// Hands a path the caller has provisioned to the metric's bookkeeping.
    pub fn commit(&mut self, path: &Path) {
        self.metric.register(self.network, path);
    }

    pub fn release(&mut self, path: &Path) {
        self.metric.deregister(self.network, path);
    }

    fn check_nodes(&self, nodes: &[NodeId]) -> Result<()> {
        match nodes.iter().find(|node| !self.network.contains(**node)) {
            Some(node) => Err(RoutingError::UnknownNode(*node)),
            None => Ok(()),
        }
    }

    /// Chains single-target searches through `stops`, each one seeded with
    /// the path found so far.
    fn solve_segments(&mut self, request: &Request, stops: &[NodeId]) -> Result<Option<Path>> {
        let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
            return Ok(None);
        };
        if self.ruled_out(request, *first, *last)? {
            return Ok(None);
        }

        let mut found: Option<Path> = None;
        for pair in stops.windows(2) {
            let origin = match &found {
                Some(prefix) => Seed::from_path(prefix),
                None => Seed::at(pair[0]),
            };
            self.solver.search(
                self.network,
                &self.metric,
                SearchQuery {
                    request,
                    direction: Direction::Forward,
                    origin,
                    target: Some(pair[1]),
                    border: None,
                },
            )?;
            match self.solver.best_path(pair[1]) {
                Some(path) => found = Some(path),
                None => {
                    debug!("no path between {} and {}", pair[0], pair[1]);
                    return Ok(None);
                }
            }
        }

        match found {
            Some(path) => self.accept(request, path),
            None => Ok(None),
        }
    }

    fn solve_multicast(&mut self, request: &Request, destinations: &[NodeId]) -> Result<Response> {
        self.solver.search(
            self.network,
            &self.metric,
            SearchQuery {
                request,
                direction: Direction::Forward,
                origin: Seed::at(request.source),
                target: None,
                border: None,
            },
        )?;

        let mut paths = Vec::with_capacity(destinations.len());
        for destination in destinations {
            let leg = request.as_unicast(request.source, *destination);
            if self.ruled_out(&leg, request.source, *destination)? {
                return Ok(Response::Infeasible);
            }
            let Some(path) = self.solver.best_path(*destination) else {
                debug!("multicast member {} is unreachable", destination);
                return Ok(Response::Infeasible);
            };
            match self.accept(&leg, path)? {
                Some(path) => paths.push(path),
                None => return Ok(Response::Infeasible),
            }
        }
        Ok(Response::Paths(paths))
    }

    fn solve_k_shortest(&self, request: &Request, k: usize) -> Result<Response> {
        if k == 0 || self.ruled_out(request, request.source, request.destination)? {
            return Ok(Response::Infeasible);
        }
        let mut paths = Vec::with_capacity(k);
        for path in self.k_shortest(request)? {
            if let Some(path) = self.accept(request, path?)? {
                paths.push(path);
                if paths.len() == k {
                    break;
                }
            }
        }
        if paths.is_empty() {
            Ok(Response::Infeasible)
        } else {
            Ok(Response::Paths(paths))
        }
    }

    fn bulk_search(
        &mut self,
        direction: Direction,
        origin: NodeId,
        request: &Request,
        border: Option<f64>,
    ) -> Result<SearchSummary> {
        self.check_nodes(&[origin])?;
        self.bulk_request = None;
        let summary = self.bulk.search(
            self.network,
            &self.metric,
            SearchQuery {
                request,
                direction,
                origin: Seed::at(origin),
                target: None,
                border,
            },
        )?;
        self.bulk_request = Some(request.clone());
        Ok(summary)
    }

    fn bulk_path(&self, direction: Direction, node: NodeId) -> Result<Option<Path>> {
        let (Some(request), Some(last)) = (self.bulk_request.as_ref(), self.bulk.last_direction())
        else {
            return Err(RoutingError::Usage(format!(
                "no {} bulk search has been run",
                direction_name(direction)
            )));
        };
        if last != direction {
            return Err(RoutingError::Usage(format!(
                "the last bulk search ran {}, not {}",
                direction_name(last),
                direction_name(direction)
            )));
        }
        self.check_nodes(&[node])?;

        let Some(path) = self.bulk.best_path(node) else {
            return Ok(None);
        };
        let leg = request.as_unicast(path.source, path.destination);
        self.accept(&leg, path)
    }

    /// True when the metric's constraint guesses already exceed a bound.
    fn ruled_out(&self, request: &Request, from: NodeId, to: NodeId) -> Result<bool> {
        if self.config.debug {
            return Ok(false);
        }
        let bounds = checked_bounds(&self.metric, request)?;
        for (index, bound) in bounds.iter().enumerate() {
            let guess = self
                .metric
                .guess_for_constraint(self.network, from, to, request, index);
            if guess > bound + EPS {
                debug!(
                    "constraint {} ruled out {} -> {}: guess {} above bound {}",
                    index, from, to, guess, bound
                );
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Replays `path` and checks it against the bounds of `request`.
    fn accept(&self, request: &Request, path: Path) -> Result<Option<Path>> {
        if self.config.debug {
            return Ok(Some(path));
        }
        let replayed = match replay(self.network, &self.metric, request, path.source, &path.edges) {
            Ok(replayed) => replayed,
            Err(RoutingError::AccessDenied { edge }) => {
                warn!(
                    "path {} -> {} rejected: edge {} denied on replay",
                    path.source, path.destination, edge
                );
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        if (replayed.cost - path.cost).abs() > EPS {
            warn!(
                "path {} -> {} rejected: replayed cost {} differs from {}",
                path.source, path.destination, replayed.cost, path.cost
            );
            return Ok(None);
        }
        let bounds = checked_bounds(&self.metric, request)?;
        if !replayed.satisfies(&bounds) {
            warn!(
                "path {} -> {} rejected: constraints {:?} exceed bounds {:?}",
                path.source, path.destination, replayed.constraints, bounds
            );
            return Ok(None);
        }
        Ok(Some(replayed))
    }
}

fn direction_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Forward => "forward",
        Direction::Backward => "backward",
    }
}
