use thiserror::Error;

use crate::model::{EdgeId, NodeId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{what}: declared {expected} values but got {actual}")]
    CountMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("node {0} is not part of the network")]
    UnknownNode(NodeId),

    #[error("usage error: {0}")]
    Usage(String),

    #[error("metric denied access to edge {edge} while replaying a path")]
    AccessDenied { edge: EdgeId },
}

pub type Result<T> = std::result::Result<T, RoutingError>;

pub(crate) fn check_count(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(RoutingError::CountMismatch {
            what,
            expected,
            actual,
        })
    }
}
