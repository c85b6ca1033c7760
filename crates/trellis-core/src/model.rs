//! Core data structures for the asset graph

use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Unique, stable identifier for a graph node.
///
/// Derived from the node's payload so that equivalent nodes across builds
/// collapse to the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct NodeId(pub u64);

/// Identity of the sub-computation that produced (or will produce) a node's
/// result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct RequestId(pub u64);

/// Unique, content-derived identifier for a finished asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct AssetId(pub u64);

fn hash_fields(tag: &str, fields: &[&dyn std::fmt::Display]) -> u64 {
    let mut hasher = DefaultHasher::new();
    tag.hash(&mut hasher);
    for field in fields {
        field.to_string().hash(&mut hasher);
    }
    hasher.finish()
}

/// An entry point as named by the user, before discovery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Entry {
    pub specifier: String,
}

impl Entry {
    pub fn new(specifier: impl Into<String>) -> Self {
        Entry {
            specifier: specifier.into(),
        }
    }
}

/// A discovered entry file with the package it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EntryFile {
    pub file_path: PathBuf,
    pub package_path: PathBuf,
}

/// A build target an entry file resolves to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Target {
    pub name: String,
    pub dist_dir: PathBuf,
}

/// A module dependency as declared by an importer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Dependency {
    /// The specifier as written in source (`./util`, `lodash`, …).
    pub specifier: String,
    /// The importing file. `None` for entry dependencies.
    pub source_path: Option<PathBuf>,
    /// Directory the specifier is resolved relative to.
    pub resolve_from: PathBuf,
    pub is_entry: bool,
    /// A re-export-only edge, eligible for deferral when the importing
    /// group has no side effects.
    pub is_weak: bool,
    /// Set on entry dependencies produced by target resolution.
    pub target: Option<Target>,
}

impl Dependency {
    /// A dependency declared by a source file.
    pub fn new(specifier: impl Into<String>, source_path: PathBuf) -> Self {
        let resolve_from = source_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        Dependency {
            specifier: specifier.into(),
            source_path: Some(source_path),
            resolve_from,
            is_entry: false,
            is_weak: false,
            target: None,
        }
    }

    /// The entry dependency created for a resolved target.
    pub fn entry(specifier: impl Into<String>, resolve_from: PathBuf, target: Target) -> Self {
        Dependency {
            specifier: specifier.into(),
            source_path: None,
            resolve_from,
            is_entry: true,
            is_weak: false,
            target: Some(target),
        }
    }

    pub fn weak(mut self) -> Self {
        self.is_weak = true;
        self
    }
}

/// A resolved file awaiting transformation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AssetGroup {
    pub file_path: PathBuf,
    /// Whether evaluating this group can have observable side effects.
    /// Weak dependencies of side-effect-free groups may be deferred.
    pub side_effects: bool,
}

impl AssetGroup {
    pub fn new(file_path: PathBuf) -> Self {
        AssetGroup {
            file_path,
            side_effects: true,
        }
    }
}

/// A transformed module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Asset {
    pub id: AssetId,
    pub file_path: PathBuf,
    pub asset_type: String,
    pub code: String,
}

impl Asset {
    pub fn new(file_path: PathBuf, asset_type: impl Into<String>, code: impl Into<String>) -> Self {
        let code = code.into();
        let asset_type = asset_type.into();
        let id = AssetId(hash_fields(
            "asset",
            &[&file_path.display(), &asset_type, &code],
        ));
        Asset {
            id,
            file_path,
            asset_type,
            code,
        }
    }
}

/// An asset together with the dependencies it declares.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformedAsset {
    pub asset: Asset,
    pub dependencies: Vec<Dependency>,
}

/// Discriminates what a graph node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Root,
    EntrySpecifier,
    EntryFile,
    Dependency,
    AssetGroup,
    Asset,
}

/// Kind-specific payload of a graph node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum NodeData {
    Root,
    EntrySpecifier(Entry),
    EntryFile(EntryFile),
    Dependency(Box<Dependency>),
    AssetGroup(AssetGroup),
    Asset(Box<Asset>),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Root => NodeKind::Root,
            NodeData::EntrySpecifier(_) => NodeKind::EntrySpecifier,
            NodeData::EntryFile(_) => NodeKind::EntryFile,
            NodeData::Dependency(_) => NodeKind::Dependency,
            NodeData::AssetGroup(_) => NodeKind::AssetGroup,
            NodeData::Asset(_) => NodeKind::Asset,
        }
    }

    /// Content-derived node id. Equivalent payloads hash to the same id, so
    /// re-folding the same result cannot create duplicate nodes.
    pub fn id(&self) -> NodeId {
        let hash = match self {
            NodeData::Root => hash_fields("root", &[]),
            NodeData::EntrySpecifier(entry) => hash_fields("entry-specifier", &[&entry.specifier]),
            NodeData::EntryFile(file) => hash_fields("entry-file", &[&file.file_path.display()]),
            NodeData::Dependency(dep) => {
                let source = dep
                    .source_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                hash_fields(
                    "dependency",
                    &[&dep.specifier, &source, &dep.is_entry],
                )
            }
            NodeData::AssetGroup(group) => {
                hash_fields("asset-group", &[&group.file_path.display()])
            }
            NodeData::Asset(asset) => hash_fields("asset", &[&asset.id.0]),
        };
        NodeId(hash)
    }
}

/// A single node in the asset graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    pub id: NodeId,
    pub data: NodeData,
    /// Whether this node's computation already produced a result that need
    /// not be redone.
    pub complete: bool,
    /// The request that produced (or will produce) this node's result, used
    /// to query cache validity.
    pub request_id: Option<RequestId>,
    /// Dependency nodes only: excluded from traversal until an importer with
    /// side effects (or a strong import) reaches it.
    pub deferred: bool,
    /// Dependency nodes only: a previously-skipped edge to this node must be
    /// re-evaluated.
    pub has_pending_deferral: bool,
}

impl GraphNode {
    pub fn new(data: NodeData) -> Self {
        GraphNode {
            id: data.id(),
            data,
            complete: false,
            request_id: None,
            deferred: false,
            has_pending_deferral: false,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }
}

impl std::fmt::Display for GraphNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.data {
            NodeData::Root => write!(f, "root"),
            NodeData::EntrySpecifier(entry) => write!(f, "entry: {}", entry.specifier),
            NodeData::EntryFile(file) => write!(f, "entry file: {}", file.file_path.display()),
            NodeData::Dependency(dep) => write!(f, "dep: {}", dep.specifier),
            NodeData::AssetGroup(group) => write!(f, "group: {}", group.file_path.display()),
            NodeData::Asset(asset) => write!(f, "asset: {}", asset.file_path.display()),
        }
    }
}

/// Options shared across a build, passed by reference into asset requests so
/// caching is scoped per logical target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildOptions {
    pub project_root: PathBuf,
    pub dist_dir: PathBuf,
    /// Upper bound on concurrently running requests.
    pub concurrency: usize,
}

impl BuildOptions {
    pub fn new(project_root: PathBuf) -> Self {
        let dist_dir = project_root.join("dist");
        BuildOptions {
            project_root,
            dist_dir,
            concurrency: 8,
        }
    }
}
