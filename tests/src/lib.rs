//! # HCE Routing Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Services, platforms and a started context
//! ├── benchmarks/       # Criterion groups per component
//! │   ├── filter_index.rs
//! │   └── conflict_resolver.rs
//! │
//! └── integration/      # Registry → resolver → dispatcher scenarios
//!     ├── flows.rs
//!     ├── persistence.rs
//!     └── resolution.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p hce-tests
//!
//! # By category
//! cargo test -p hce-tests integration::persistence
//!
//! # Benchmarks
//! cargo bench -p hce-tests
//! ```

pub mod benchmarks;
pub mod fixtures;
pub mod integration;
