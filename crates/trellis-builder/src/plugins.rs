//! Plugin seams for resolution and transformation
//!
//! The module-resolution algorithm and the transform pipeline live outside
//! this crate; the builder consumes them through these traits.

use std::sync::Arc;

use async_trait::async_trait;
use trellis_core::{AssetGroup, BuildOptions, Dependency, Entry, EntryFile, Target, TransformedAsset};

/// Resolution plugin: entry discovery, target resolution, and path
/// resolution.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Discover the entry files a user-named specifier refers to.
    async fn resolve_entries(
        &self,
        entry: &Entry,
        options: &BuildOptions,
    ) -> anyhow::Result<Vec<EntryFile>>;

    /// Resolve the build targets of an entry file.
    async fn resolve_targets(
        &self,
        entry_file: &EntryFile,
        options: &BuildOptions,
    ) -> anyhow::Result<Vec<Target>>;

    /// Resolve a dependency to the file it refers to. `Ok(None)` is a
    /// legitimate non-match (an excluded or external module), not an error.
    async fn resolve_path(
        &self,
        dependency: &Dependency,
        options: &BuildOptions,
    ) -> anyhow::Result<Option<AssetGroup>>;
}

/// Transform plugin: turns a resolved asset group into finished assets,
/// each declaring its own dependencies.
#[async_trait]
pub trait Transformer: Send + Sync {
    async fn transform(
        &self,
        group: &AssetGroup,
        options: &BuildOptions,
    ) -> anyhow::Result<Vec<TransformedAsset>>;
}

/// The plugin set one build runs with.
#[derive(Clone)]
pub struct Plugins {
    pub resolver: Arc<dyn Resolver>,
    pub transformer: Arc<dyn Transformer>,
}

impl Plugins {
    pub fn new(resolver: Arc<dyn Resolver>, transformer: Arc<dyn Transformer>) -> Self {
        Plugins {
            resolver,
            transformer,
        }
    }
}
