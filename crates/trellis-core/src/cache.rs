//! On-disk pass cache
//!
//! Incremental reuse happens through the in-memory request tracker; this
//! module only persists a pass marker so tooling can tell whether (and when)
//! a directory was last built.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Cache directory: .trellis/
pub const CACHE_DIR: &str = ".trellis";

/// Pass marker file
pub const PASS_MARKER: &str = "pass.json";

/// Summary of a committed build pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PassMarker {
    pub version: String,
    pub cache_key: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub cached_at: String,
}

/// Get cache directory path
pub fn cache_dir(root: &Path) -> PathBuf {
    root.join(CACHE_DIR)
}

/// Get pass marker file path
pub fn pass_marker_path(root: &Path) -> PathBuf {
    root.join(CACHE_DIR).join(PASS_MARKER)
}

/// Ensure cache directory exists
pub fn ensure_cache_dir(root: &Path) -> std::io::Result<()> {
    let cache = cache_dir(root);
    if !cache.exists() {
        std::fs::create_dir_all(&cache)?;
    }
    Ok(())
}

/// Write the marker for a committed pass.
pub fn save_pass_marker(
    root: &Path,
    cache_key: &str,
    node_count: usize,
    edge_count: usize,
) -> anyhow::Result<()> {
    ensure_cache_dir(root)?;
    let path = pass_marker_path(root);

    let marker = PassMarker {
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache_key: cache_key.to_string(),
        node_count,
        edge_count,
        cached_at: chrono::Utc::now().to_rfc3339(),
    };

    let json_str = serde_json::to_string_pretty(&marker)?;
    std::fs::write(&path, json_str)?;

    tracing::debug!("Pass marker saved: {}", path.display());
    Ok(())
}

/// Load the marker of the most recent pass, if one exists.
pub fn load_pass_marker(root: &Path) -> anyhow::Result<Option<PassMarker>> {
    let path = pass_marker_path(root);
    if !path.exists() {
        return Ok(None);
    }

    let json_str = std::fs::read_to_string(&path)?;
    let marker: PassMarker = serde_json::from_str(&json_str)?;

    tracing::debug!("Pass marker loaded from: {}", path.display());
    Ok(Some(marker))
}

/// Clear cache directory
pub fn clear_cache(root: &Path) -> std::io::Result<()> {
    let cache = cache_dir(root);
    if cache.exists() {
        std::fs::remove_dir_all(&cache)?;
    }
    Ok(())
}
