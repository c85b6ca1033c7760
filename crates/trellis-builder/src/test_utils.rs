//! Mock plugins for builder tests

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use trellis_core::{
    AssetGroup, BuildOptions, Dependency, Entry, EntryFile, Target, TransformedAsset,
};

use crate::plugins::{Resolver, Transformer};

/// Shared, ordered log of plugin events for ordering assertions.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

fn push(log: &Option<EventLog>, event: String) {
    if let Some(log) = log {
        log.lock().unwrap().push(event);
    }
}

/// Resolver backed by in-memory maps.
#[derive(Default)]
pub struct MockResolver {
    /// entry specifier → entry file paths
    entries: HashMap<String, Vec<PathBuf>>,
    /// dependency specifier → resolved file
    paths: HashMap<String, PathBuf>,
    /// resolved files whose groups carry no side effects
    side_effect_free: HashSet<PathBuf>,
    failing_paths: HashSet<String>,
    log: Option<EventLog>,
    calls: Option<Arc<AtomicUsize>>,
}

impl MockResolver {
    pub fn with_entry(mut self, specifier: &str, file: &str) -> Self {
        self.entries
            .entry(specifier.to_string())
            .or_default()
            .push(PathBuf::from(file));
        self
    }

    pub fn with_path(mut self, specifier: &str, file: &str) -> Self {
        self.paths.insert(specifier.to_string(), PathBuf::from(file));
        self
    }

    pub fn with_side_effect_free(mut self, file: &str) -> Self {
        self.side_effect_free.insert(PathBuf::from(file));
        self
    }

    pub fn with_failing_path(mut self, specifier: &str) -> Self {
        self.failing_paths.insert(specifier.to_string());
        self
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_call_counter(mut self, calls: Arc<AtomicUsize>) -> Self {
        self.calls = Some(calls);
        self
    }

    fn count(&self) {
        if let Some(calls) = &self.calls {
            calls.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Resolver for MockResolver {
    async fn resolve_entries(
        &self,
        entry: &Entry,
        _options: &BuildOptions,
    ) -> anyhow::Result<Vec<EntryFile>> {
        self.count();
        push(&self.log, format!("entries:{}", entry.specifier));
        let files = self
            .entries
            .get(&entry.specifier)
            .ok_or_else(|| anyhow::anyhow!("no such entry: {}", entry.specifier))?;
        Ok(files
            .iter()
            .map(|file_path| EntryFile {
                file_path: file_path.clone(),
                package_path: PathBuf::from("."),
            })
            .collect())
    }

    async fn resolve_targets(
        &self,
        entry_file: &EntryFile,
        options: &BuildOptions,
    ) -> anyhow::Result<Vec<Target>> {
        self.count();
        push(
            &self.log,
            format!("targets:{}", entry_file.file_path.display()),
        );
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
        self.count();
        push(&self.log, format!("resolve:{}", dependency.specifier));
        if self.failing_paths.contains(&dependency.specifier) {
            anyhow::bail!("resolver crashed on {}", dependency.specifier);
        }
        // Entry dependencies name the file directly
        if dependency.is_entry {
            return Ok(Some(AssetGroup::new(PathBuf::from(&dependency.specifier))));
        }
        Ok(self.paths.get(&dependency.specifier).map(|file| AssetGroup {
            file_path: file.clone(),
            side_effects: !self.side_effect_free.contains(file),
        }))
    }
}

/// What a mock module declares.
#[derive(Default, Clone)]
pub struct MockModule {
    /// (specifier, is_weak) pairs
    pub deps: Vec<(String, bool)>,
}

/// Transformer backed by an in-memory module table.
#[derive(Default)]
pub struct MockTransformer {
    modules: HashMap<PathBuf, MockModule>,
    failing: HashSet<PathBuf>,
    delay: Option<Duration>,
    delays: HashMap<PathBuf, Duration>,
    log: Option<EventLog>,
    calls: Option<Arc<AtomicUsize>>,
}

impl MockTransformer {
    pub fn with_module(mut self, file: &str, deps: &[(&str, bool)]) -> Self {
        self.modules.insert(
            PathBuf::from(file),
            MockModule {
                deps: deps
                    .iter()
                    .map(|(specifier, weak)| (specifier.to_string(), *weak))
                    .collect(),
            },
        );
        self
    }

    pub fn with_failing(mut self, file: &str) -> Self {
        self.failing.insert(PathBuf::from(file));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_delay_for(mut self, file: &str, delay: Duration) -> Self {
        self.delays.insert(PathBuf::from(file), delay);
        self
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_call_counter(mut self, calls: Arc<AtomicUsize>) -> Self {
        self.calls = Some(calls);
        self
    }
}

#[async_trait]
impl Transformer for MockTransformer {
    async fn transform(
        &self,
        group: &AssetGroup,
        _options: &BuildOptions,
    ) -> anyhow::Result<Vec<TransformedAsset>> {
        if let Some(calls) = &self.calls {
            calls.fetch_add(1, Ordering::SeqCst);
        }
        if let Some(delay) = self.delays.get(&group.file_path).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        push(&self.log, format!("transform:{}", group.file_path.display()));
        if self.failing.contains(&group.file_path) {
            anyhow::bail!("transform crashed on {}", group.file_path.display());
        }

        let module = self.modules.get(&group.file_path).cloned().unwrap_or_default();
        let asset = trellis_core::Asset::new(
            group.file_path.clone(),
            "js",
            format!("code for {}", group.file_path.display()),
        );
        let dependencies = module
            .deps
            .iter()
            .map(|(specifier, weak)| {
                let dep = Dependency::new(specifier.clone(), group.file_path.clone());
                if *weak { dep.weak() } else { dep }
            })
            .collect();
        Ok(vec![TransformedAsset {
            asset,
            dependencies,
        }])
    }
}
