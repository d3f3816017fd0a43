//! Resolver domain: AID index, resolution outcomes and the pure conflict rules.

pub mod aid_index;
pub mod outcome;
pub mod rules;

pub use aid_index::{AidCandidate, AidIndex, AidMatchKind};
pub use outcome::{Candidate, Resolution};
pub use rules::{resolve_aid_conflict, resolve_polling_loop_filter_conflict};
