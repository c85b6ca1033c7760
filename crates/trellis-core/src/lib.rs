//! Trellis Core — Asset graph data model and resolution operations

pub mod cache;
pub mod dot;
pub mod graph;
pub mod model;


pub use cache::{
    CACHE_DIR, PASS_MARKER, PassMarker, cache_dir, clear_cache, ensure_cache_dir, load_pass_marker,
    pass_marker_path, save_pass_marker,
};
pub use dot::to_dot;
pub use graph::AssetGraph;
pub use model::{
    Asset, AssetGroup, AssetId, BuildOptions, Dependency, Entry, EntryFile, GraphNode, NodeData,
    NodeId, NodeKind, RequestId, Target, TransformedAsset,
};
