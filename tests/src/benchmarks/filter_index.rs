//! # hce-01 Filter Index Benchmarks
//!
//! Conditions:
//! - 1,000 services with one exact filter each
//! - Up to 500 pattern filters scanned on a miss

use std::sync::Arc;

use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use hce_01_filter_index::FilterTable;
use shared_types::{
    ComponentName, PatternFilter, PollingLoopFilter, ServiceDescriptor, ServiceKind,
};

pub fn services(exact: usize, patterns: usize) -> Vec<Arc<ServiceDescriptor>> {
    (0..exact.max(patterns))
        .map(|i| {
            let component = ComponentName::new(format!("com.bench.app{i}"), "Service");
            let mut service = ServiceDescriptor::new(component, ServiceKind::OnHost, 0, 10_000 + i as u32);
            if i < exact {
                service = service.with_polling_loop_filter(PollingLoopFilter::new(
                    format!("{:08X}", i),
                    i % 7 == 0,
                ));
            }
            if i < patterns {
                service = service.with_pattern_filter(PatternFilter::new(format!("AB{:04X}.*", i), false));
            }
            Arc::new(service)
        })
        .collect()
}

pub fn bench_filter_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("hce-01-filter-index");

    let table = FilterTable::build(&services(1_000, 0));
    group.bench_function("exact_hit", |b| {
        b.iter(|| black_box(table.lookup(black_box("000001F3"))))
    });
    group.bench_function("exact_miss", |b| {
        b.iter(|| black_box(table.lookup(black_box("FFFFFFFF"))))
    });

    for patterns in [10, 100, 500] {
        let table = FilterTable::build(&services(0, patterns));
        group.throughput(Throughput::Elements(patterns as u64));
        group.bench_with_input(
            BenchmarkId::new("pattern_scan_miss", patterns),
            &table,
            |b, table| b.iter(|| black_box(table.lookup(black_box("CDCDCDCD")))),
        );
    }

    group.bench_function("build_1000", |b| {
        let services = services(1_000, 100);
        b.iter(|| black_box(FilterTable::build(&services)))
    });

    group.finish();
}
