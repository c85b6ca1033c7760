//! Trellis Builder — incremental graph-construction orchestrator

pub mod error;
pub mod orchestrator;
pub mod plugins;
pub mod queue;
pub mod requests;
pub mod tracker;


#[cfg(test)]
pub mod test_utils;

pub use error::{BuildError, RequestError};
pub use orchestrator::{BuildInput, BuildPassResult, GraphBuilder, cache_key};
pub use plugins::{Plugins, Resolver, Transformer};
pub use queue::TaskQueue;
pub use requests::{
    AssetRequest, EntryRequest, PathRequest, Request, RequestResult, TargetRequest,
};
pub use tracker::{RequestTracker, StoredPass};
