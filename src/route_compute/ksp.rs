use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};

use tracing::debug;

use super::label_setting::{LabelSettingEngine, SearchQuery, Seed};
use super::metric::{replay, Direction, Excluding, PathMetric};
use crate::error::{RoutingError, Result};
use crate::model::{EdgeId, Network, Path, Request};
use crate::runtime::config::EngineConfig;

#[derive(Debug, Clone)]
struct DeviationCandidate {
    path: Path,
    seq: u64,
}

impl PartialEq for DeviationCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DeviationCandidate {}

impl Ord for DeviationCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .path
            .cost
            .total_cmp(&self.path.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for DeviationCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lazy k-shortest simple paths for one request (Yen's deviation search).
///
/// Each pull emits the cheapest remaining candidate; deviations of the path
/// emitted last are only computed on the following pull. `None` means no
/// further distinct simple path exists.
pub struct KShortestPaths<'a, M: PathMetric + ?Sized> {
    network: &'a Network,
    metric: &'a M,
    request: Request,
    engine: LabelSettingEngine,
    emitted: Vec<Path>,
    candidates: BinaryHeap<DeviationCandidate>,
    seen: BTreeSet<Vec<EdgeId>>,
    next_seq: u64,
    started: bool,
    expand_last: bool,
    exhausted: bool,
}

impl<'a, M: PathMetric + ?Sized> KShortestPaths<'a, M> {
    pub fn new(
        network: &'a Network,
        metric: &'a M,
        request: &Request,
        config: &EngineConfig,
    ) -> Result<Self> {
        for node in [request.source, request.destination] {
            if !network.contains(node) {
                return Err(RoutingError::UnknownNode(node));
            }
        }
        let engine = LabelSettingEngine::new(EngineConfig {
            slots_per_key: 1,
            ..config.clone()
        });
        Ok(Self {
            network,
            metric,
            request: request.clone(),
            engine,
            emitted: Vec::new(),
            candidates: BinaryHeap::new(),
            seen: BTreeSet::new(),
            next_seq: 0,
            started: false,
            expand_last: false,
            exhausted: false,
        })
    }

    pub fn emitted(&self) -> &[Path] {
        &self.emitted
    }

    fn offer(&mut self, path: Path) {
        if !path.is_simple(self.network) {
            return;
        }
        if !self.seen.insert(path.edges.clone()) {
            return;
        }
        self.candidates.push(DeviationCandidate {
            path,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    fn shortest_from<E: PathMetric + ?Sized>(
        &mut self,
        seed: Seed,
        metric: &E,
    ) -> Result<Option<Path>> {
        let query = SearchQuery {
            request: &self.request,
            direction: Direction::Forward,
            origin: seed,
            target: Some(self.request.destination),
            border: None,
        };
        self.engine.search(self.network, metric, query)?;
        Ok(self.engine.best_path(self.request.destination))
    }

    fn expand(&mut self) -> Result<()> {
        let Some(last) = self.emitted.last().cloned() else {
            return Ok(());
        };
        let nodes = last.nodes(self.network);

        for spur_idx in 0..last.edges.len() {
            let root = &last.edges[..spur_idx];
            let mut exclusion = Excluding::new(self.metric);
            for path in &self.emitted {
                if path.edges.len() > spur_idx && path.edges[..spur_idx] == *root {
                    exclusion.ban_edge(path.edges[spur_idx]);
                }
            }
            for node in &nodes[..spur_idx] {
                exclusion.ban_node(*node);
            }

            let root_path = replay(
                self.network,
                self.metric,
                &self.request,
                self.request.source,
                root,
            )?;
            if let Some(path) = self.shortest_from(Seed::from_path(&root_path), &exclusion)? {
                self.offer(path);
            }
        }
        debug!(
            "deviation search: expanded path {} into {} pending candidates",
            self.emitted.len(),
            self.candidates.len()
        );
        Ok(())
    }

    fn advance(&mut self) -> Result<Option<Path>> {
        if !self.started {
            self.started = true;
            let seed = Seed::at(self.request.source);
            let metric = self.metric;
            if let Some(path) = self.shortest_from(seed, metric)? {
                self.offer(path);
            }
        } else if self.expand_last {
            self.expand()?;
        }

        let Some(best) = self.candidates.pop() else {
            return Ok(None);
        };
        self.emitted.push(best.path.clone());
        self.expand_last = true;
        Ok(Some(best.path))
    }
}

impl<M: PathMetric + ?Sized> Iterator for KShortestPaths<'_, M> {
    type Item = Result<Path>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        match self.advance() {
            Ok(Some(path)) => Some(Ok(path)),
            Ok(None) => {
                self.exhausted = true;
                None
            }
            Err(err) => {
                self.exhausted = true;
                Some(Err(err))
            }
        }
    }
}
