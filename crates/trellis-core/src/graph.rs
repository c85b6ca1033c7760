//! Asset graph over petgraph::StableDiGraph with content-derived node ids
//!
//! The graph is shared across build passes and mutated only through
//! `set_root_connections` and the four resolution operations. Each operation
//! folds a sub-computation's result back into the graph: it marks the origin
//! node complete, records the request that produced the result, and inserts
//! children idempotently by content id.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};

use crate::model::*;

/// The mutable dependency graph of a build.
pub struct AssetGraph {
    pub(crate) inner: StableDiGraph<GraphNode, ()>,
    /// Content id → storage index. Lets equivalent nodes across passes and
    /// importers collapse to one node.
    index: HashMap<NodeId, NodeIndex>,
    root: NodeId,
}

impl std::fmt::Debug for AssetGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetGraph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl AssetGraph {
    pub fn new() -> Self {
        let mut graph = AssetGraph {
            inner: StableDiGraph::new(),
            index: HashMap::new(),
            root: NodeId::default(),
        };
        graph.root = graph.add_or_get(NodeData::Root);
        graph
    }

    /// The root node every traversal starts from.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a node by id.
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.index.get(&id).and_then(|idx| self.inner.node_weight(*idx))
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        let idx = *self.index.get(&id)?;
        self.inner.node_weight_mut(idx)
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Iterate over all nodes.
    pub fn all_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.inner.node_weights()
    }

    /// Insert a node, or return the existing node with the same content id.
    fn add_or_get(&mut self, data: NodeData) -> NodeId {
        let node = GraphNode::new(data);
        let id = node.id;
        if !self.index.contains_key(&id) {
            let idx = self.inner.add_node(node);
            self.index.insert(id, idx);
        }
        id
    }

    /// Add an edge unless it already exists.
    fn ensure_edge(&mut self, source: NodeId, target: NodeId) {
        if let (Some(&a), Some(&b)) = (self.index.get(&source), self.index.get(&target)) {
            self.inner.update_edge(a, b, ());
        }
    }

    /// Children reachable by outgoing edges, in edge insertion order.
    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        let Some(&idx) = self.index.get(&id) else {
            return Vec::new();
        };
        // petgraph yields outgoing neighbors most-recent-first
        let mut children: Vec<NodeId> = self
            .inner
            .neighbors_directed(idx, Direction::Outgoing)
            .filter_map(|n| self.inner.node_weight(n))
            .map(|n| n.id)
            .collect();
        children.reverse();
        children
    }

    /// Domain gate consulted before descending into a child.
    ///
    /// Deferred dependency nodes are excluded from traversal. A deferred node
    /// with a pending deferral is re-admitted: the flags are cleared and the
    /// child is visited again even though it is already in the visited set.
    pub fn should_visit_child(&mut self, _parent: NodeId, child: NodeId) -> bool {
        let Some(node) = self.node_mut(child) else {
            return false;
        };
        if node.kind() != NodeKind::Dependency || !node.deferred {
            return true;
        }
        if node.has_pending_deferral {
            node.deferred = false;
            node.has_pending_deferral = false;
            return true;
        }
        false
    }

    /// Flag a deferred dependency node for re-evaluation on the next
    /// traversal that reaches it.
    pub fn mark_deferral_pending(&mut self, id: NodeId) {
        if let Some(node) = self.node_mut(id) {
            if node.deferred {
                node.has_pending_deferral = true;
            }
        }
    }

    /// Seed the graph with the pass's entries and any carried-over work
    /// items. Idempotent: re-seeding with the same input changes nothing.
    pub fn set_root_connections(&mut self, entries: &[Entry], seed_groups: &[AssetGroup]) {
        for entry in entries {
            let id = self.add_or_get(NodeData::EntrySpecifier(entry.clone()));
            self.ensure_edge(self.root, id);
        }
        for group in seed_groups {
            let id = self.add_or_get(NodeData::AssetGroup(group.clone()));
            self.ensure_edge(self.root, id);
        }
    }

    /// Reset completeness for nodes whose producing request is no longer
    /// valid, so the next traversal recomputes them.
    pub fn sweep_invalidated(&mut self, is_valid: impl Fn(RequestId) -> bool) {
        for node in self.inner.node_weights_mut() {
            if let Some(request_id) = node.request_id {
                if !is_valid(request_id) {
                    node.complete = false;
                }
            }
        }
    }

    fn mark_resolved(&mut self, id: NodeId, request_id: RequestId) {
        if let Some(node) = self.node_mut(id) {
            node.complete = true;
            node.request_id = Some(request_id);
        }
    }

    /// Fold discovered entry files under their entry specifier.
    pub fn resolve_entry(&mut self, entry: &Entry, files: &[EntryFile], request_id: RequestId) {
        let origin = NodeData::EntrySpecifier(entry.clone()).id();
        for file in files {
            let child = self.add_or_get(NodeData::EntryFile(file.clone()));
            self.ensure_edge(origin, child);
        }
        self.mark_resolved(origin, request_id);
    }

    /// Fold resolved build targets under their entry file. Each target
    /// becomes an entry dependency on the file, resolved from its package.
    pub fn resolve_targets(&mut self, file: &EntryFile, targets: &[Target], request_id: RequestId) {
        let origin = NodeData::EntryFile(file.clone()).id();
        for target in targets {
            let dep = Dependency::entry(
                file.file_path.display().to_string(),
                file.package_path.clone(),
                target.clone(),
            );
            let child = self.add_or_get(NodeData::Dependency(Box::new(dep)));
            self.ensure_edge(origin, child);
        }
        self.mark_resolved(origin, request_id);
    }

    /// Fold a path resolution result under its dependency. `None` records a
    /// legitimate non-match: the node completes with no children.
    pub fn resolve_dependency(
        &mut self,
        dep: &Dependency,
        group: Option<&AssetGroup>,
        request_id: RequestId,
    ) {
        let origin = NodeData::Dependency(Box::new(dep.clone())).id();
        match group {
            Some(group) => {
                let child = self.add_or_get(NodeData::AssetGroup(group.clone()));
                self.ensure_edge(origin, child);
            }
            None => {
                tracing::warn!("dependency {:?} did not resolve", dep.specifier);
            }
        }
        self.mark_resolved(origin, request_id);
    }

    /// Fold transformed assets under their asset group, and each asset's
    /// declared dependencies under the asset.
    ///
    /// A weak dependency of a side-effect-free group is inserted deferred.
    /// When a strong importer later reaches an already-deferred node, the
    /// node is flagged for re-evaluation instead of staying excluded.
    pub fn resolve_asset_group(
        &mut self,
        group: &AssetGroup,
        assets: &[TransformedAsset],
        request_id: RequestId,
    ) {
        let origin = NodeData::AssetGroup(group.clone()).id();
        for transformed in assets {
            let asset_id = self.add_or_get(NodeData::Asset(Box::new(transformed.asset.clone())));
            self.ensure_edge(origin, asset_id);

            for dep in &transformed.dependencies {
                let defer = dep.is_weak && !group.side_effects;
                let data = NodeData::Dependency(Box::new(dep.clone()));
                let dep_id = data.id();
                if self.index.contains_key(&dep_id) {
                    if !defer {
                        self.mark_deferral_pending(dep_id);
                    }
                } else {
                    self.add_or_get(data);
                    if defer {
                        if let Some(node) = self.node_mut(dep_id) {
                            node.deferred = true;
                        }
                    }
                }
                self.ensure_edge(asset_id, dep_id);
            }
        }
        self.mark_resolved(origin, request_id);
    }
}

impl Default for AssetGraph {
    fn default() -> Self {
        Self::new()
    }
}
