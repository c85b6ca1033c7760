//! Request tracker — the cache/memoization service
//!
//! Keyed by stable request id: running a request either returns the cached
//! result, when one exists and is still valid, or executes it through the
//! plugins and memoizes the outcome. Validity survives across passes until
//! something invalidates it, which is what makes repeat builds incremental.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use trellis_core::{Asset, AssetGraph, AssetGroup, AssetId, BuildOptions, RequestId};

use crate::error::RequestError;
use crate::plugins::Plugins;
use crate::requests::{Request, RequestResult};

struct CachedRequest {
    result: Arc<RequestResult>,
    valid: bool,
}

/// A committed build pass, stored under its cache key.
///
/// The aggregates are intentionally empty: the commit persists the graph
/// shape only, while the pass's real `changed_assets`/`new_work_items` are
/// returned to the caller and never stored. Downstream reuse depends on the
/// stored shape staying empty.
#[derive(Clone)]
pub struct StoredPass {
    pub graph: Arc<RwLock<AssetGraph>>,
    pub changed_assets: HashMap<AssetId, Asset>,
    pub new_work_items: Vec<AssetGroup>,
}

impl StoredPass {
    pub fn new(graph: Arc<RwLock<AssetGraph>>) -> Self {
        StoredPass {
            graph,
            changed_assets: HashMap::new(),
            new_work_items: Vec::new(),
        }
    }
}

/// Memoizing request executor shared across build passes.
pub struct RequestTracker {
    requests: DashMap<RequestId, CachedRequest>,
    passes: DashMap<String, StoredPass>,
}

impl RequestTracker {
    pub fn new() -> Self {
        RequestTracker {
            requests: DashMap::new(),
            passes: DashMap::new(),
        }
    }

    /// Execute a request, or return its memoized result when still valid.
    pub async fn run(
        &self,
        request: &Request,
        plugins: &Plugins,
        options: &BuildOptions,
    ) -> Result<Arc<RequestResult>, RequestError> {
        let id = request.id();
        if let Some(cached) = self.requests.get(&id) {
            if cached.valid {
                tracing::debug!("request {} cached: {:?}", request.kind_name(), id);
                return Ok(Arc::clone(&cached.result));
            }
        }

        let result = Arc::new(self.execute(request, plugins, options).await?);
        self.requests.insert(
            id,
            CachedRequest {
                result: Arc::clone(&result),
                valid: true,
            },
        );
        Ok(result)
    }

    async fn execute(
        &self,
        request: &Request,
        plugins: &Plugins,
        options: &BuildOptions,
    ) -> Result<RequestResult, RequestError> {
        match request {
            Request::Entry(req) => plugins
                .resolver
                .resolve_entries(&req.entry, options)
                .await
                .map(RequestResult::Entries)
                .map_err(|source| RequestError::Entry {
                    specifier: req.entry.specifier.clone(),
                    source,
                }),
            Request::Target(req) => plugins
                .resolver
                .resolve_targets(&req.entry_file, options)
                .await
                .map(RequestResult::Targets)
                .map_err(|source| RequestError::Target {
                    file: req.entry_file.file_path.display().to_string(),
                    source,
                }),
            Request::Path(req) => plugins
                .resolver
                .resolve_path(&req.dependency, options)
                .await
                .map(RequestResult::Resolved)
                .map_err(|source| RequestError::Resolve {
                    specifier: req.dependency.specifier.clone(),
                    from: req.dependency.resolve_from.display().to_string(),
                    source,
                }),
            Request::Asset(req) => plugins
                .transformer
                .transform(&req.asset_group, &req.options)
                .await
                .map(RequestResult::Assets)
                .map_err(|source| RequestError::Transform {
                    file: req.asset_group.file_path.display().to_string(),
                    source,
                }),
        }
    }

    /// Whether a prior computation's result can still be used as-is.
    pub fn is_still_valid(&self, id: RequestId) -> bool {
        self.requests.get(&id).map(|c| c.valid).unwrap_or(false)
    }

    /// Mark one request's result stale.
    pub fn invalidate(&self, id: RequestId) {
        if let Some(mut cached) = self.requests.get_mut(&id) {
            cached.valid = false;
        }
    }

    /// Mark every memoized result stale.
    pub fn invalidate_all(&self) {
        for mut cached in self.requests.iter_mut() {
            cached.valid = false;
        }
    }

    /// Mark stale every request whose result mentions the given file. The
    /// coarse counterpart of a filesystem-event feed.
    pub fn invalidate_path(&self, path: &Path) {
        for mut cached in self.requests.iter_mut() {
            let touches = match cached.result.as_ref() {
                RequestResult::Entries(files) => files.iter().any(|f| f.file_path == path),
                RequestResult::Targets(_) => false,
                RequestResult::Resolved(group) => {
                    group.as_ref().is_some_and(|g| g.file_path == path)
                }
                RequestResult::Assets(assets) => {
                    assets.iter().any(|a| a.asset.file_path == path)
                }
            };
            if touches {
                cached.valid = false;
            }
        }
    }

    /// Commit a pass result under its cache key.
    pub fn store_pass(&self, cache_key: &str, pass: StoredPass) {
        self.passes.insert(cache_key.to_string(), pass);
    }

    /// The committed pass for a cache key, if one exists. Its graph is the
    /// starting structure for the next pass with the same key.
    pub fn stored_pass(&self, cache_key: &str) -> Option<StoredPass> {
        self.passes.get(cache_key).map(|pass| pass.value().clone())
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}
