pub mod error;
pub mod model;
pub mod route_compute;
pub mod router;
pub mod runtime;

#[cfg(test)]
mod testing;

pub use error::{Result, RoutingError};
pub use model::{Network, NodeId, Path, QosBounds, Request, RequestKind, Response};
pub use router::Router;
pub use runtime::config::EngineConfig;
