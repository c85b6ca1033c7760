//! Integration tests for Trellis
//!
//! These tests drive a whole build pass through the JS plugins against real
//! files on disk.

use std::path::Path;
use std::sync::Arc;

use trellis_builder::{BuildInput, GraphBuilder, RequestTracker};
use trellis_core::{BuildOptions, NodeKind};

fn write(root: &Path, rel: &str, code: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, code).unwrap();
}

fn input(root: &Path, entries: &[&str]) -> BuildInput {
    BuildInput::new(
        entries.iter().map(|e| e.to_string()).collect(),
        Arc::new(BuildOptions::new(root.to_path_buf())),
    )
}

/// One entry, one import chain, one import that does not resolve: the pass
/// succeeds, the resolved modules become changed assets, and the unresolved
/// dependency is simply a leaf.
#[tokio::test]
async fn test_build_pass_over_real_files() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/index.js",
        "import { greet } from './util';\nimport missing from './missing';\ngreet();\n",
    );
    write(dir.path(), "src/util.js", "export function greet() {}\n");

    let tracker = Arc::new(RequestTracker::new());
    let builder = GraphBuilder::new(
        input(dir.path(), &["src/index.js"]),
        Arc::clone(&tracker),
        trellis_js::plugins(),
    );
    let result = builder.build().await.unwrap();

    let changed: Vec<_> = result
        .changed_assets
        .values()
        .map(|asset| asset.file_path.clone())
        .collect();
    assert_eq!(changed.len(), 2);
    assert!(changed.contains(&dir.path().join("src/index.js")));
    assert!(changed.contains(&dir.path().join("src/util.js")));

    // './missing' resolved to nothing: a complete dependency leaf
    let graph = result.graph.read().await;
    let unresolved = graph
        .all_nodes()
        .filter(|node| node.kind() == NodeKind::Dependency)
        .filter(|node| node.complete)
        .filter(|node| graph.children_of(node.id).is_empty())
        .count();
    assert_eq!(unresolved, 1);
}

/// A repeat pass over unchanged files re-uses every memoized request and
/// reports no changed assets.
#[tokio::test]
async fn test_repeat_pass_is_incremental() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/index.js", "import './util';\n");
    write(dir.path(), "src/util.js", "export {};\n");

    let tracker = Arc::new(RequestTracker::new());
    let plugins = trellis_js::plugins();

    let first = GraphBuilder::new(
        input(dir.path(), &["src/index.js"]),
        Arc::clone(&tracker),
        plugins.clone(),
    )
    .build()
    .await
    .unwrap();
    assert_eq!(first.changed_assets.len(), 2);
    let nodes_after_first = first.graph.read().await.node_count();

    let second = GraphBuilder::new(
        input(dir.path(), &["src/index.js"]),
        Arc::clone(&tracker),
        plugins,
    )
    .build()
    .await
    .unwrap();

    assert!(second.changed_assets.is_empty());
    assert!(second.new_work_items.is_empty());
    assert_eq!(second.graph.read().await.node_count(), nodes_after_first);
    // Same underlying graph instance threaded between the passes
    assert!(Arc::ptr_eq(&first.graph, &second.graph));
}

/// Invalidating an edited file recomputes its transform and yields exactly
/// that asset as changed.
#[tokio::test]
async fn test_edited_file_rebuilds_only_its_asset() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/index.js", "import './util';\n");
    write(dir.path(), "src/util.js", "export {};\n");

    let tracker = Arc::new(RequestTracker::new());
    let plugins = trellis_js::plugins();

    GraphBuilder::new(
        input(dir.path(), &["src/index.js"]),
        Arc::clone(&tracker),
        plugins.clone(),
    )
    .build()
    .await
    .unwrap();

    write(dir.path(), "src/util.js", "export const changed = true;\n");
    tracker.invalidate_path(&dir.path().join("src/util.js"));

    let second = GraphBuilder::new(
        input(dir.path(), &["src/index.js"]),
        Arc::clone(&tracker),
        plugins,
    )
    .build()
    .await
    .unwrap();

    assert_eq!(second.changed_assets.len(), 1);
    let asset = second.changed_assets.values().next().unwrap();
    assert_eq!(asset.file_path, dir.path().join("src/util.js"));
    assert!(asset.code.contains("changed"));
}

/// A missing entry fails the whole pass.
#[tokio::test]
async fn test_missing_entry_fails_pass() {
    let dir = tempfile::tempdir().unwrap();

    let tracker = Arc::new(RequestTracker::new());
    let builder = GraphBuilder::new(
        input(dir.path(), &["src/absent.js"]),
        tracker,
        trellis_js::plugins(),
    );

    let error = builder.build().await.unwrap_err();
    assert!(error.to_string().contains("entry discovery failed"));
}

/// The DOT export of a finished pass names the modules it contains.
#[tokio::test]
async fn test_dot_export_after_build() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/index.js", "export {};\n");

    let tracker = Arc::new(RequestTracker::new());
    let builder = GraphBuilder::new(
        input(dir.path(), &["src/index.js"]),
        tracker,
        trellis_js::plugins(),
    );
    let result = builder.build().await.unwrap();

    let graph = result.graph.read().await;
    let dot = trellis_core::to_dot(&graph);
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("index.js"));
}
