pub mod network;
pub mod path;
pub mod request;

pub use network::{load_topology, parse_topology, Edge, EdgeId, Graph, LinkMetrics, Network, NodeId};
pub use path::Path;
pub use request::{QosBounds, Request, RequestKind, Response};
