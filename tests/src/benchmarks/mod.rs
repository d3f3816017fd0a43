//! # Routing Benchmarks
//!
//! Criterion groups per component, driven by `benches/routing_benchmarks.rs`.
//!
//! | Component | Claim | Target |
//! |-----------|-------|--------|
//! | hce-01 Filter Index | Exact lookup is a hash probe | < 1µs |
//! | hce-01 Filter Index | Pattern scan is linear in patterns | < 50µs at 500 |
//! | hce-03 Conflict Resolver | SELECT resolution | < 5µs |

pub mod conflict_resolver;
pub mod filter_index;
