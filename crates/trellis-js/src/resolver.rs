//! Filesystem resolver for JavaScript modules
//!
//! Relative specifiers are joined against the importer's directory and
//! probed with the usual extension and index conventions. Bare specifiers
//! are treated as external and resolve to nothing, which is a legitimate
//! non-match rather than an error.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use trellis_builder::Resolver;
use trellis_core::{AssetGroup, BuildOptions, Dependency, Entry, EntryFile, Target};

pub struct JsResolver;

const EXTENSIONS: &[&str] = &["js", "mjs", "cjs"];

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Probe a joined path the way Node does: as written, with each known
/// extension appended, then as a directory with an index file.
async fn probe(base: PathBuf) -> Option<PathBuf> {
    if is_file(&base).await {
        return Some(base);
    }
    if base.extension().is_none() {
        for ext in EXTENSIONS {
            let candidate = base.with_extension(ext);
            if is_file(&candidate).await {
                return Some(candidate);
            }
        }
        for ext in EXTENSIONS {
            let candidate = base.join(format!("index.{ext}"));
            if is_file(&candidate).await {
                return Some(candidate);
            }
        }
    }
    None
}

#[async_trait]
impl Resolver for JsResolver {
    async fn resolve_entries(
        &self,
        entry: &Entry,
        options: &BuildOptions,
    ) -> anyhow::Result<Vec<EntryFile>> {
        let file_path = options.project_root.join(&entry.specifier);
        let metadata = tokio::fs::metadata(&file_path)
            .await
            .with_context(|| format!("entry '{}' does not exist", entry.specifier))?;
        anyhow::ensure!(
            metadata.is_file(),
            "entry '{}' is not a file",
            entry.specifier
        );
        Ok(vec![EntryFile {
            file_path,
            package_path: options.project_root.clone(),
        }])
    }

    async fn resolve_targets(
        &self,
        _entry_file: &EntryFile,
        options: &BuildOptions,
    ) -> anyhow::Result<Vec<Target>> {
        Ok(vec![Target {
            name: "default".to_string(),
            dist_dir: options.dist_dir.clone(),
        }])
    }

    async fn resolve_path(
        &self,
        dependency: &Dependency,
        _options: &BuildOptions,
    ) -> anyhow::Result<Option<AssetGroup>> {
        // Entry dependencies name their file directly
        if dependency.is_entry {
            let file_path = PathBuf::from(&dependency.specifier);
            return Ok(is_file(&file_path).await.then(|| AssetGroup::new(file_path)));
        }

        if !dependency.specifier.starts_with('.') {
            tracing::debug!("bare specifier '{}' is external", dependency.specifier);
            return Ok(None);
        }

        let joined = dependency.resolve_from.join(&dependency.specifier);
        match probe(joined).await {
            Some(file_path) => Ok(Some(AssetGroup::new(file_path))),
            None => {
                tracing::warn!(
                    "'{}' did not resolve from {}",
                    dependency.specifier,
                    dependency.resolve_from.display()
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, code: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, code).unwrap();
    }

    fn options(root: &Path) -> BuildOptions {
        BuildOptions::new(root.to_path_buf())
    }

    #[tokio::test]
    async fn test_entry_discovery_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.js", "");

        let resolver = JsResolver;
        let found = resolver
            .resolve_entries(&Entry::new("src/index.js"), &options(dir.path()))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].package_path, dir.path());

        assert!(
            resolver
                .resolve_entries(&Entry::new("src/missing.js"), &options(dir.path()))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_relative_specifier_probes_extensions_and_index() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/app.js", "");
        write(dir.path(), "src/util.js", "");
        write(dir.path(), "src/lib/index.js", "");

        let resolver = JsResolver;
        let opts = options(dir.path());

        let dep = Dependency::new("./util", dir.path().join("src/app.js"));
        let group = resolver.resolve_path(&dep, &opts).await.unwrap().unwrap();
        assert_eq!(group.file_path, dir.path().join("src/util.js"));

        let dep = Dependency::new("./lib", dir.path().join("src/app.js"));
        let group = resolver.resolve_path(&dep, &opts).await.unwrap().unwrap();
        assert_eq!(group.file_path, dir.path().join("src/lib/index.js"));
    }

    #[tokio::test]
    async fn test_bare_and_missing_specifiers_resolve_to_none() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/app.js", "");

        let resolver = JsResolver;
        let opts = options(dir.path());

        let bare = Dependency::new("lodash", dir.path().join("src/app.js"));
        assert!(resolver.resolve_path(&bare, &opts).await.unwrap().is_none());

        let missing = Dependency::new("./nope", dir.path().join("src/app.js"));
        assert!(resolver.resolve_path(&missing, &opts).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_default_target_uses_dist_dir() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.js", "");

        let resolver = JsResolver;
        let opts = options(dir.path());
        let entry_file = EntryFile {
            file_path: dir.path().join("src/index.js"),
            package_path: dir.path().to_path_buf(),
        };
        let targets = resolver.resolve_targets(&entry_file, &opts).await.unwrap();
        assert_eq!(targets, vec![Target {
            name: "default".to_string(),
            dist_dir: opts.dist_dir.clone(),
        }]);
    }
}
