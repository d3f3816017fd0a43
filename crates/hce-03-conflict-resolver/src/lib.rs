//! # Conflict Resolver (hce-03)
//!
//! Decides which service handles a SELECT or a polling frame.
//!
//! ## Rules
//!
//! ```text
//! candidates ──→ preferred present? ──yes──→ Resolved(preferred)
//!                     │ no
//!                     ↓
//!                one candidate? ──yes──→ Resolved(it)
//!                     │ no
//!                     ↓
//!                none? ──yes──→ NoMatch
//!                     │ no
//!                     ↓
//!                Ambiguous(all)
//! ```
//!
//! For polling frames, candidates are the exact-filter matches when there are
//! any and the first accepting pattern's services otherwise.
//!
//! ## Crate Structure
//!
//! - `domain/` - AID index, outcomes, the pure rules
//! - `service.rs` - `ConflictResolver` over one catalog snapshot

pub mod domain;
pub mod service;

pub use domain::{
    resolve_aid_conflict, resolve_polling_loop_filter_conflict, AidCandidate, AidIndex,
    AidMatchKind, Candidate, Resolution,
};
pub use service::ConflictResolver;
