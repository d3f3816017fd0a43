//! # HCE Routing Benchmarks
//!
//! ```bash
//! cargo bench -p hce-tests
//! ```

use criterion::{criterion_group, criterion_main};
use hce_tests::benchmarks::{conflict_resolver, filter_index};

criterion_group!(
    benches,
    filter_index::bench_filter_table,
    conflict_resolver::bench_resolver,
);

criterion_main!(benches);
