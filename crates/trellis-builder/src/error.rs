use thiserror::Error;
use trellis_core::{NodeId, NodeKind};

/// Failure of one sub-computation, carrying the identity of the failing
/// input and the underlying plugin error.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("entry discovery failed for '{specifier}'")]
    Entry {
        specifier: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("target resolution failed for '{file}'")]
    Target {
        file: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("path resolution failed for '{specifier}' from '{from}'")]
    Resolve {
        specifier: String,
        from: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("transform failed for '{file}'")]
    Transform {
        file: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Failure of a build pass. A pass fails with exactly one underlying cause;
/// later concurrent failures are logged and dropped.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("graph has no root node")]
    MissingRoot,

    #[error("node {0:?} disappeared during traversal")]
    MissingNode(NodeId),

    #[error("node kind {0:?} reached dispatch but has no request")]
    UnexpectedNode(NodeKind),

    #[error("{request} request settled with a mismatched result")]
    MismatchedResult { request: &'static str },

    #[error(transparent)]
    Request(#[from] RequestError),
}
