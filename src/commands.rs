//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;

use trellis_builder::{BuildInput, GraphBuilder, RequestTracker};
use trellis_core::BuildOptions;

pub async fn build(
    root: PathBuf,
    entries: Vec<String>,
    name: String,
    dist_dir: Option<PathBuf>,
    concurrency: usize,
    dot: Option<PathBuf>,
) -> anyhow::Result<()> {
    anyhow::ensure!(!entries.is_empty(), "at least one entry is required");

    let mut options = BuildOptions::new(root.clone());
    if let Some(dist_dir) = dist_dir {
        options.dist_dir = dist_dir;
    }
    options.concurrency = concurrency;

    let mut input = BuildInput::new(entries, Arc::new(options));
    input.build_name = name;

    let tracker = Arc::new(RequestTracker::new());
    let builder = GraphBuilder::new(input, tracker, trellis_js::plugins());
    let result = builder.build().await?;

    let graph = result.graph.read().await;
    tracing::info!(
        "Built {} nodes, {} edges, {} changed assets",
        graph.node_count(),
        graph.edge_count(),
        result.changed_assets.len()
    );

    trellis_core::save_pass_marker(
        &root,
        &result.cache_key,
        graph.node_count(),
        graph.edge_count(),
    )?;

    if let Some(dot_path) = dot {
        std::fs::write(&dot_path, trellis_core::to_dot(&graph))?;
        tracing::info!("Graph written to {}", dot_path.display());
    }

    Ok(())
}

pub fn clear(root: PathBuf) -> anyhow::Result<()> {
    tracing::info!("Clearing cache for: {}", root.display());

    trellis_core::clear_cache(&root)?;

    tracing::info!("Cache cleared");
    Ok(())
}
