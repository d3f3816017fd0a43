//! # hce-03 Conflict Resolver Benchmarks

use std::sync::Arc;

use criterion::{black_box, Criterion};
use hce_01_filter_index::FilterTable;
use hce_02_service_registry::CatalogSnapshot;
use hce_03_conflict_resolver::ConflictResolver;
use shared_types::{categories, AidGroup, ComponentName, ServiceDescriptor, ServiceKind};

fn catalog(size: usize) -> Arc<CatalogSnapshot> {
    let services: Vec<Arc<ServiceDescriptor>> = (0..size)
        .map(|i| {
            let component = ComponentName::new(format!("com.bench.app{i}"), "Service");
            Arc::new(
                ServiceDescriptor::new(component, ServiceKind::OnHost, 0, 10_000 + i as u32)
                    .with_aid_group(AidGroup::new(
                        categories::OTHER,
                        [format!("F0{:010X}", i), format!("F1{:06X}*", i)],
                    )),
            )
        })
        .collect();
    let filters = Arc::new(FilterTable::build(&services));
    Arc::new(CatalogSnapshot {
        user_id: 0,
        services,
        filters,
        has_unknown_default: false,
    })
}

pub fn bench_resolver(c: &mut Criterion) {
    let mut group = c.benchmark_group("hce-03-conflict-resolver");

    let snapshot = catalog(500);
    group.bench_function("index_build_500", |b| {
        b.iter(|| black_box(ConflictResolver::new(Arc::clone(&snapshot))))
    });

    let resolver = ConflictResolver::new(snapshot);
    let preferred = ComponentName::new("com.bench.app42", "Service");
    group.bench_function("select_exact", |b| {
        b.iter(|| black_box(resolver.resolve_aid(black_box("F0000000002A"), None)))
    });
    group.bench_function("select_prefix_with_preferred", |b| {
        b.iter(|| {
            black_box(resolver.resolve_aid(black_box("F100002A0102"), Some(&preferred)))
        })
    });
    group.bench_function("select_miss", |b| {
        b.iter(|| black_box(resolver.resolve_aid(black_box("A0000000041010"), None)))
    });

    group.finish();
}
