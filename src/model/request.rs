use super::network::NodeId;
use super::path::Path;

/// Path-level QoS bounds. `max_delay` and `max_loss` bound the sum over the
/// path; `min_bandwidth` and `max_utilization` are checked per link.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QosBounds {
    pub max_delay: Option<f64>,
    pub min_bandwidth: Option<f64>,
    pub max_loss: Option<f64>,
    pub max_utilization: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    Unicast,
    Waypoint { via: Vec<NodeId> },
    Multicast { additional: Vec<NodeId> },
    KShortest { k: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub source: NodeId,
    pub destination: NodeId,
    pub qos: QosBounds,
    pub kind: RequestKind,
}

impl Request {
    pub fn unicast(source: NodeId, destination: NodeId) -> Self {
        Self {
            source,
            destination,
            qos: QosBounds::default(),
            kind: RequestKind::Unicast,
        }
    }

    pub fn with_qos(mut self, qos: QosBounds) -> Self {
        self.qos = qos;
        self
    }

    pub fn with_kind(mut self, kind: RequestKind) -> Self {
        self.kind = kind;
        self
    }

    /// The same endpoints and bounds as a plain unicast request.
    pub fn as_unicast(&self, source: NodeId, destination: NodeId) -> Self {
        Self {
            source,
            destination,
            qos: self.qos,
            kind: RequestKind::Unicast,
        }
    }

    /// Every node the request names, in order of appearance.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes = vec![self.source, self.destination];
        match &self.kind {
            RequestKind::Unicast | RequestKind::KShortest { .. } => {}
            RequestKind::Waypoint { via } => nodes.extend(via.iter().copied()),
            RequestKind::Multicast { additional } => nodes.extend(additional.iter().copied()),
        }
        nodes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Path(Path),
    Paths(Vec<Path>),
    Infeasible,
}

impl Response {
    pub fn is_feasible(&self) -> bool {
        !matches!(self, Response::Infeasible)
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Response::Path(path) => Some(path),
            Response::Paths(paths) => paths.first(),
            Response::Infeasible => None,
        }
    }
}
