//! Criterion benchmarks for package loading and graph construction.
//!
//! Loads the Go benchmark fixture, then measures the loader, the analysis
//! pass on a pre-loaded package, and rendering.
//!
//! Run with: `cargo bench --bench analyze`

use criterion::{criterion_group, criterion_main, Criterion};
use std::path::{Path, PathBuf};

use go_indeps::analyze::analyze;
use go_indeps::frontend::go::GoLoader;
use go_indeps::render::to_dot;

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("benchmarks")
        .join("fixtures")
        .join("inventory")
}

fn bench_load(c: &mut Criterion) {
    let dir = fixture_dir();

    c.bench_function("load_inventory", |b| {
        b.iter(|| GoLoader::new().load_dir(&dir).unwrap())
    });
}

fn bench_analyze(c: &mut Criterion) {
    let pkg = GoLoader::new()
        .load_dir(&fixture_dir())
        .expect("load fixture");

    c.bench_function("analyze_inventory", |b| b.iter(|| analyze(&pkg)));

    c.bench_function("prune_inventory", |b| {
        b.iter(|| {
            let mut graph = analyze(&pkg);
            graph.remove_disconnected_nodes();
            graph
        })
    });
}

fn bench_render(c: &mut Criterion) {
    let pkg = GoLoader::new()
        .load_dir(&fixture_dir())
        .expect("load fixture");
    let graph = analyze(&pkg);

    c.bench_function("render_dot", |b| b.iter(|| to_dot(&graph)));
}

criterion_group!(benches, bench_load, bench_analyze, bench_render);
criterion_main!(benches);
