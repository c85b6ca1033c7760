//! Regex-based JavaScript transformer
//!
//! Reads a module and scans it for the specifiers it imports. This stands in
//! for a real compiler pipeline: the builder only needs each asset plus its
//! declared dependencies.

use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use trellis_builder::Transformer;
use trellis_core::{Asset, AssetGroup, BuildOptions, Dependency, TransformedAsset};

pub struct JsTransformer {
    /// `import … from '…'` and side-effect `import '…'`
    import_re: Regex,
    /// `export … from '…'` — a re-export-only (weak) edge
    reexport_re: Regex,
    /// `require('…')` and dynamic `import('…')`
    call_re: Regex,
}

impl JsTransformer {
    pub fn new() -> Self {
        JsTransformer {
            import_re: Regex::new(
                r#"(?m)^\s*import\s+(?:[\w$*\s{},]+\s+from\s+)?["']([^"']+)["']"#,
            )
            .expect("import pattern is valid"),
            reexport_re: Regex::new(
                r#"(?m)^\s*export\s+(?:\*|\{[^}]*\})\s+from\s+["']([^"']+)["']"#,
            )
            .expect("re-export pattern is valid"),
            call_re: Regex::new(r#"(?:\brequire|\bimport)\s*\(\s*["']([^"']+)["']\s*\)"#)
                .expect("call pattern is valid"),
        }
    }

    /// Scan code for (specifier, is_weak) pairs, strongest form first so a
    /// specifier imported both ways stays strong.
    fn scan(&self, code: &str) -> Vec<(String, bool)> {
        let mut deps: Vec<(String, bool)> = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for captures in self.import_re.captures_iter(code) {
            let specifier = captures[1].to_string();
            if seen.insert(specifier.clone()) {
                deps.push((specifier, false));
            }
        }
        for captures in self.call_re.captures_iter(code) {
            let specifier = captures[1].to_string();
            if seen.insert(specifier.clone()) {
                deps.push((specifier, false));
            }
        }
        for captures in self.reexport_re.captures_iter(code) {
            let specifier = captures[1].to_string();
            if seen.insert(specifier.clone()) {
                deps.push((specifier, true));
            }
        }

        deps
    }
}

impl Default for JsTransformer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transformer for JsTransformer {
    async fn transform(
        &self,
        group: &AssetGroup,
        _options: &BuildOptions,
    ) -> anyhow::Result<Vec<TransformedAsset>> {
        let code = tokio::fs::read_to_string(&group.file_path)
            .await
            .with_context(|| format!("cannot read {}", group.file_path.display()))?;

        let asset_type = group
            .file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("js")
            .to_string();

        let dependencies = self
            .scan(&code)
            .into_iter()
            .map(|(specifier, weak)| {
                let dep = Dependency::new(specifier, group.file_path.clone());
                if weak { dep.weak() } else { dep }
            })
            .collect();

        tracing::debug!(
            "transformed {}: {} bytes",
            group.file_path.display(),
            code.len()
        );

        Ok(vec![TransformedAsset {
            asset: Asset::new(group.file_path.clone(), asset_type, code),
            dependencies,
        }])
    }
}
