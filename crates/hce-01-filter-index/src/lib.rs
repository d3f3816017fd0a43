//! # HCE-01 Filter Index
//!
//! Per-user polling-loop filter tables used to route polling frames that
//! arrive before (or outside) a card session.
//!
//! ## Architecture
//!
//! Pure domain crate; no ports, no I/O.
//!
//! - `FilterTable`: exact filter → services (hash lookup) and ordered
//!   pattern filters → services (full-match regular expressions)
//! - `FilterIndex`: one `Arc<FilterTable>` per user, rebuilt from a catalog
//! - `normalize_*`: canonical uppercase-hex forms used as keys
//!
//! ## Matching
//!
//! ```text
//!  frame payload ──hex──▶ "66696C746572"
//!                              │
//!            ┌─────────────────┴──────────────────┐
//!            ▼                                    ▼
//!     exact table (O(1))              patterns in registration order
//!     every service listed            first accepting pattern only
//!            │                                    │
//!            └─────────────────┬──────────────────┘
//!                              ▼
//!                 FilterMatch { exact, pattern }
//! ```
//!
//! Exact candidates outrank pattern candidates for the same payload.

pub mod domain;
pub mod error;

pub use domain::{
    compile_pattern, normalize_exact_filter, normalize_pattern, FilterCandidate, FilterIndex,
    FilterMatch, FilterTable, MatchKind,
};
pub use error::FilterError;
