//! Graphviz export for debugging
//!
//! Purely observational: the rendered graph has no effect on build
//! correctness.

use petgraph::dot::{Config, Dot};

use crate::graph::AssetGraph;

/// Render the graph in DOT format, one labelled node per graph node.
pub fn to_dot(graph: &AssetGraph) -> String {
    let dot = Dot::with_attr_getters(
        &graph.inner,
        &[Config::EdgeNoLabel, Config::NodeNoLabel],
        &|_, _| String::new(),
        &|_, (_, node)| {
            let shape = if node.complete { "box" } else { "ellipse" };
            format!("label=\"{}\" shape={}", node, shape)
        },
    );
    format!("{:?}", dot)
}
