//! Dependency graph of the top-level declarations of a Go package.
//!
//! A [`frontend`] loads a package into a resolved model, [`analyze`] turns
//! that model into a [`graph::Graph`] whose nodes are declarations and whose
//! edges point from a declaration to the same-package named types its
//! definition mentions, and [`render`] prints it.

pub mod analyze;
pub mod frontend;
pub mod graph;
pub mod render;
pub mod types;

use std::path::Path;

use anyhow::Result;

use frontend::go::{GoLoader, LoadConfig};
use frontend::Frontend;
use graph::Graph;

/// Load the Go package in `dir` and build its declaration graph.
///
/// Returns the package name along with the graph.
pub fn analyze_dir(dir: &Path, config: &LoadConfig) -> Result<(String, Graph)> {
    let mut loader = GoLoader::with_config(config.clone());
    let pkg = loader.load(dir)?;
    let name = pkg
        .package_data(pkg.package())
        .map(|p| p.name.clone())
        .unwrap_or_default();
    Ok((name, analyze::analyze(&pkg)))
}
