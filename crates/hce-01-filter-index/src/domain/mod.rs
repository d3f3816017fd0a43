//! Domain layer: filter normalization and per-user lookup tables.

pub mod index;
pub mod normalize;
pub mod table;

pub use index::FilterIndex;
pub use normalize::{compile_pattern, normalize_exact_filter, normalize_pattern};
pub use table::{FilterCandidate, FilterMatch, FilterTable, MatchKind};
