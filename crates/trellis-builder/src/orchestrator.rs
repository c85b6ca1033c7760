//! Graph builder orchestrator
//!
//! Drives one incremental build pass: walks the asset graph from its root,
//! decides per node whether work is needed, dispatches the matching request
//! through the tracker, folds results back into the graph, and commits the
//! pass under its cache key.
//!
//! The traversal is two mutually-chained phases, `visit` and
//! `visit_children`, expressed as units submitted to the task queue rather
//! than language-level recursion: dispatch suspends, and a node's children
//! may only be walked after its own request has settled and mutated the
//! graph. Sibling subtrees interleave freely; the pass is over when the
//! queue fully drains.

use std::collections::{HashMap, HashSet};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Arc, Mutex};

use tokio::sync::RwLock;
use tracing::{debug, info};
use trellis_core::{
    Asset, AssetGraph, AssetGroup, AssetId, BuildOptions, Entry, GraphNode, NodeData, NodeId,
    NodeKind,
};

use crate::error::BuildError;
use crate::plugins::Plugins;
use crate::queue::TaskQueue;
use crate::requests::{AssetRequest, EntryRequest, PathRequest, Request, RequestResult, TargetRequest};
use crate::tracker::{RequestTracker, StoredPass};

/// Input of one build pass.
#[derive(Debug, Clone)]
pub struct BuildInput {
    pub entries: Vec<String>,
    /// Asset groups carried into the pass in addition to what the entries
    /// reach, e.g. work items discovered by a previous pass.
    pub seed_groups: Vec<AssetGroup>,
    /// Logical build name, scoping asset caching per target.
    pub build_name: String,
    pub options: Arc<BuildOptions>,
}

impl BuildInput {
    pub fn new(entries: Vec<String>, options: Arc<BuildOptions>) -> Self {
        BuildInput {
            entries,
            seed_groups: Vec::new(),
            build_name: "default".to_string(),
            options,
        }
    }
}

/// The committed outcome of a successful pass.
#[derive(Debug)]
pub struct BuildPassResult {
    pub graph: Arc<RwLock<AssetGraph>>,
    pub changed_assets: HashMap<AssetId, Asset>,
    pub new_work_items: Vec<AssetGroup>,
    pub cache_key: String,
}

/// Cache key gating top-level reuse: configuration version + logical build
/// name + entry list.
pub fn cache_key(input: &BuildInput) -> String {
    let mut hasher = DefaultHasher::new();
    input.entries.hash(&mut hasher);
    format!(
        "{}:{}:{:016x}",
        env!("CARGO_PKG_VERSION"),
        input.build_name,
        hasher.finish()
    )
}

/// One-pass graph builder over a shared tracker and plugin set.
pub struct GraphBuilder {
    input: BuildInput,
    tracker: Arc<RequestTracker>,
    plugins: Plugins,
}

impl GraphBuilder {
    pub fn new(input: BuildInput, tracker: Arc<RequestTracker>, plugins: Plugins) -> Self {
        GraphBuilder {
            input,
            tracker,
            plugins,
        }
    }

    /// Run one build pass.
    ///
    /// On repeat invocations with the same cache key the previous pass's
    /// graph is the traversal base; nodes whose requests are still valid are
    /// skipped. The pass fails with the first recorded sub-computation
    /// error; the graph itself stays committed so failed nodes can be
    /// retried by a later pass.
    pub async fn build(&self) -> Result<BuildPassResult, BuildError> {
        let cache_key = cache_key(&self.input);
        let graph = match self.tracker.stored_pass(&cache_key) {
            Some(prior) => {
                debug!("reusing graph from prior pass for {}", cache_key);
                prior.graph
            }
            None => Arc::new(RwLock::new(AssetGraph::new())),
        };

        let entries: Vec<Entry> = self
            .input
            .entries
            .iter()
            .map(|specifier| Entry::new(specifier.clone()))
            .collect();

        let root = {
            let mut graph = graph.write().await;
            graph.set_root_connections(&entries, &self.input.seed_groups);
            graph.sweep_invalidated(|id| self.tracker.is_still_valid(id));
            let root = graph.root();
            if graph.node(root).is_none() {
                return Err(BuildError::MissingRoot);
            }
            root
        };

        let pass = Arc::new(BuildPass {
            graph: Arc::clone(&graph),
            visited: Mutex::new(HashSet::from([root])),
            changed_assets: Mutex::new(HashMap::new()),
            new_work_items: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            queue: TaskQueue::new(self.input.options.concurrency),
            tracker: Arc::clone(&self.tracker),
            plugins: self.plugins.clone(),
            options: Arc::clone(&self.input.options),
            build_name: self.input.build_name.clone(),
        });

        pass.schedule_visit(root);
        // Dispatch is asynchronous: a subtree's children may be scheduled
        // long after the root unit returned, so the pass is only over once
        // the queue is empty
        pass.queue.drain().await;

        // Commit the graph shape under the cache key. The aggregates are
        // stored empty on purpose; see StoredPass
        self.tracker
            .store_pass(&cache_key, StoredPass::new(Arc::clone(&graph)));

        let mut errors = std::mem::take(&mut *lock(&pass.errors));
        if !errors.is_empty() {
            for dropped in errors.iter().skip(1) {
                debug!("dropping later concurrent error: {}", dropped);
            }
            return Err(errors.remove(0));
        }

        let changed_assets = std::mem::take(&mut *lock(&pass.changed_assets));
        let new_work_items = std::mem::take(&mut *lock(&pass.new_work_items));

        {
            let graph = graph.read().await;
            info!(
                "pass complete: {} nodes, {} edges, {} changed assets",
                graph.node_count(),
                graph.edge_count(),
                changed_assets.len()
            );
        }

        Ok(BuildPassResult {
            graph,
            changed_assets,
            new_work_items,
            cache_key,
        })
    }
}

enum Decision {
    Skip,
    Dispatch(Request),
    Fatal(BuildError),
}

/// Pass state is still consistent when a unit panicked mid-update, so a
/// poisoned lock is recovered rather than propagated.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// State owned by the orchestrator for the duration of one pass.
struct BuildPass {
    graph: Arc<RwLock<AssetGraph>>,
    visited: Mutex<HashSet<NodeId>>,
    changed_assets: Mutex<HashMap<AssetId, Asset>>,
    new_work_items: Mutex<Vec<AssetGroup>>,
    /// Sub-computation failures in settlement order. The first is the
    /// pass's failure; the rest are dropped after logging.
    errors: Mutex<Vec<BuildError>>,
    queue: TaskQueue,
    tracker: Arc<RequestTracker>,
    plugins: Plugins,
    options: Arc<BuildOptions>,
    build_name: String,
}

impl BuildPass {
    fn halted(&self) -> bool {
        !lock(&self.errors).is_empty()
    }

    fn record_error(&self, error: BuildError) {
        debug!("recording build error: {}", error);
        lock(&self.errors).push(error);
    }

    fn schedule_visit(self: &Arc<Self>, node_id: NodeId) {
        let pass = Arc::clone(self);
        // Settlement is observed through drain, not per-unit receivers
        let _ = self.queue.submit(async move { pass.visit(node_id).await });
    }

    /// Phase one: decide whether this node needs computation, dispatch when
    /// it does, and walk its children once its own request has settled.
    async fn visit(self: Arc<Self>, node_id: NodeId) {
        // A recorded error stops new work; in-flight units still settle
        if self.halted() {
            return;
        }

        let decision = {
            let graph = self.graph.read().await;
            match graph.node(node_id) {
                Some(node) => self.decide(node),
                None => Decision::Fatal(BuildError::MissingNode(node_id)),
            }
        };

        match decision {
            Decision::Skip => self.visit_children(node_id).await,
            Decision::Dispatch(request) => {
                if let Request::Asset(asset_request) = &request {
                    // Recorded before dispatch so the work item is tracked
                    // even when the transform fails
                    lock(&self.new_work_items).push(asset_request.asset_group.clone());
                }
                match self.tracker.run(&request, &self.plugins, &self.options).await {
                    Ok(result) => {
                        if let Err(error) = self.fold(&request, &result).await {
                            self.record_error(error);
                            return;
                        }
                        self.visit_children(node_id).await;
                    }
                    Err(error) => self.record_error(BuildError::Request(error)),
                }
            }
            Decision::Fatal(error) => self.record_error(error),
        }
    }

    /// The skip predicate: a node's computation is skipped when it is
    /// already complete, when its kind is not requestable, or when the
    /// tracker reports its prior result still valid.
    fn decide(&self, node: &GraphNode) -> Decision {
        if node.complete {
            return Decision::Skip;
        }
        if !matches!(
            node.kind(),
            NodeKind::EntrySpecifier | NodeKind::EntryFile | NodeKind::Dependency | NodeKind::AssetGroup
        ) {
            return Decision::Skip;
        }
        if let Some(request_id) = node.request_id {
            if self.tracker.is_still_valid(request_id) {
                return Decision::Skip;
            }
        }
        match self.request_for(node) {
            Ok(request) => Decision::Dispatch(request),
            Err(error) => Decision::Fatal(error),
        }
    }

    /// The dispatch table: node kind → request kind, 1:1. Reaching this with
    /// any other kind is a contract violation, not a recoverable error.
    fn request_for(&self, node: &GraphNode) -> Result<Request, BuildError> {
        match &node.data {
            NodeData::EntrySpecifier(entry) => {
                Ok(Request::Entry(EntryRequest::new(entry.clone())))
            }
            NodeData::EntryFile(file) => Ok(Request::Target(TargetRequest::new(file.clone()))),
            NodeData::Dependency(dep) => Ok(Request::Path(PathRequest::new((**dep).clone()))),
            NodeData::AssetGroup(group) => Ok(Request::Asset(AssetRequest::new(
                group.clone(),
                Arc::clone(&self.options),
                self.build_name.clone(),
            ))),
            other => Err(BuildError::UnexpectedNode(other.kind())),
        }
    }

    /// Fold a settled request's result back into the graph.
    async fn fold(&self, request: &Request, result: &RequestResult) -> Result<(), BuildError> {
        let request_id = request.id();
        let mut graph = self.graph.write().await;
        match (request, result) {
            (Request::Entry(req), RequestResult::Entries(files)) => {
                graph.resolve_entry(&req.entry, files, request_id);
            }
            (Request::Target(req), RequestResult::Targets(targets)) => {
                graph.resolve_targets(&req.entry_file, targets, request_id);
            }
            (Request::Path(req), RequestResult::Resolved(group)) => {
                graph.resolve_dependency(&req.dependency, group.as_ref(), request_id);
            }
            (Request::Asset(req), RequestResult::Assets(assets)) => {
                graph.resolve_asset_group(&req.asset_group, assets, request_id);
                drop(graph);
                let mut changed = lock(&self.changed_assets);
                for transformed in assets {
                    changed.insert(transformed.asset.id, transformed.asset.clone());
                }
            }
            _ => {
                return Err(BuildError::MismatchedResult {
                    request: request.kind_name(),
                });
            }
        }
        Ok(())
    }

    /// Phase two: walk this node's children through the visited set and the
    /// graph's visitation gate, scheduling a visit for each admitted child.
    async fn visit_children(self: &Arc<Self>, node_id: NodeId) {
        if self.halted() {
            return;
        }

        let admitted = {
            let mut graph = self.graph.write().await;
            let children = graph.children_of(node_id);
            let mut visited = lock(&self.visited);
            let mut admitted = Vec::new();
            for child in children {
                let revisit = graph
                    .node(child)
                    .map(|node| node.has_pending_deferral)
                    .unwrap_or(false);
                if visited.contains(&child) && !revisit {
                    continue;
                }
                if graph.should_visit_child(node_id, child) {
                    visited.insert(child);
                    admitted.push(child);
                }
            }
            admitted
        };

        for child in admitted {
            self.schedule_visit(child);
        }
    }
}
