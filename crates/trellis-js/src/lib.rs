//! Trellis JS — filesystem resolver and import-scanning transformer

pub mod resolver;
pub mod transformer;

use std::sync::Arc;

use trellis_builder::Plugins;

pub use resolver::JsResolver;
pub use transformer::JsTransformer;

/// The default plugin set for JavaScript projects.
pub fn plugins() -> Plugins {
    Plugins::new(Arc::new(JsResolver), Arc::new(JsTransformer::new()))
}
