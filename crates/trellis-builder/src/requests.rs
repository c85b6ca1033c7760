//! Request descriptors for the four computable node kinds
//!
//! Each descriptor is an immutable, stably-hashable value: repeated builds
//! construct identical descriptors for identical inputs, so the tracker
//! recognizes them as the same request.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use trellis_core::{
    AssetGroup, BuildOptions, Dependency, Entry, EntryFile, RequestId, Target, TransformedAsset,
};

/// Discover the entry files a user-named specifier refers to.
#[derive(Debug, Clone)]
pub struct EntryRequest {
    pub entry: Entry,
}

impl EntryRequest {
    pub fn new(entry: Entry) -> Self {
        EntryRequest { entry }
    }
}

/// Resolve the build targets of a discovered entry file.
#[derive(Debug, Clone)]
pub struct TargetRequest {
    pub entry_file: EntryFile,
}

impl TargetRequest {
    pub fn new(entry_file: EntryFile) -> Self {
        TargetRequest { entry_file }
    }
}

/// Resolve a dependency specifier to an asset group, if any.
#[derive(Debug, Clone)]
pub struct PathRequest {
    pub dependency: Dependency,
}

impl PathRequest {
    pub fn new(dependency: Dependency) -> Self {
        PathRequest { dependency }
    }
}

/// Transform an asset group into finished assets.
///
/// Carries the shared build options and the logical build name so results
/// are cached per logical target.
#[derive(Debug, Clone)]
pub struct AssetRequest {
    pub asset_group: AssetGroup,
    pub options: Arc<BuildOptions>,
    pub build_name: String,
}

impl AssetRequest {
    pub fn new(asset_group: AssetGroup, options: Arc<BuildOptions>, build_name: String) -> Self {
        AssetRequest {
            asset_group,
            options,
            build_name,
        }
    }
}

/// A dispatchable request descriptor.
#[derive(Debug, Clone)]
pub enum Request {
    Entry(EntryRequest),
    Target(TargetRequest),
    Path(PathRequest),
    Asset(AssetRequest),
}

impl Request {
    /// Stable identity of this request across builds.
    pub fn id(&self) -> RequestId {
        let mut hasher = DefaultHasher::new();
        match self {
            Request::Entry(req) => {
                "entry".hash(&mut hasher);
                req.entry.hash(&mut hasher);
            }
            Request::Target(req) => {
                "target".hash(&mut hasher);
                req.entry_file.hash(&mut hasher);
            }
            Request::Path(req) => {
                "path".hash(&mut hasher);
                req.dependency.hash(&mut hasher);
            }
            Request::Asset(req) => {
                "asset".hash(&mut hasher);
                req.asset_group.hash(&mut hasher);
                req.build_name.hash(&mut hasher);
            }
        }
        RequestId(hasher.finish())
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Request::Entry(_) => "entry",
            Request::Target(_) => "target",
            Request::Path(_) => "path",
            Request::Asset(_) => "asset",
        }
    }
}

/// The settled output of a request, matched to its descriptor kind.
#[derive(Debug, Clone)]
pub enum RequestResult {
    Entries(Vec<EntryFile>),
    Targets(Vec<Target>),
    Resolved(Option<AssetGroup>),
    Assets(Vec<TransformedAsset>),
}
