//! Benchmarks for path resolution against wide folders.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use localweb_provider::{IdScheme, MemoryProvider};
use localweb_serve::{DirectoryIdCache, FolderContext, PathResolver};

/// `depth` nested folders, each holding `width` files.
fn wide_tree(width: usize, depth: usize) -> (MemoryProvider, String) {
    let mut p = MemoryProvider::new("bench", "primary:").with_id_scheme(IdScheme::Opaque);
    let mut dir = String::from("site");
    p.mkdir(&dir).unwrap();
    for level in 0..depth {
        dir.push_str(&format!("/d{level}"));
        p.mkdir(&dir).unwrap();
        for i in 0..width {
            p.write(&format!("{dir}/file_{i}.js"), b"x").unwrap();
        }
    }
    let leaf = format!("{}/file_{}.js", dir.trim_start_matches("site/"), width - 1);
    (p, leaf)
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for width in [100, 1_000] {
        let (p, leaf) = wide_tree(width, 4);
        let ctx = FolderContext::new("bench", "primary:", p.document_id("site").unwrap());

        group.bench_function(BenchmarkId::new("uncached", width), |b| {
            b.iter(|| {
                let cache = DirectoryIdCache::new(ctx.base_document_id());
                PathResolver::new(&p, &ctx, &cache).resolve(&leaf)
            });
        });

        let cache = DirectoryIdCache::new(ctx.base_document_id());
        let resolver = PathResolver::new(&p, &ctx, &cache);
        resolver.resolve(&leaf);
        group.bench_function(BenchmarkId::new("cached", width), |b| {
            b.iter(|| resolver.resolve(&leaf));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
