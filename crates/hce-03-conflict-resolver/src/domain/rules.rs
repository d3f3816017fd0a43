//! The two arbitration rules.
//!
//! Both are pure: the outcome depends only on the candidates and the
//! preferred component. Neither ever picks one of several equal candidates.

use hce_01_filter_index::{FilterCandidate, FilterMatch};
use shared_types::ComponentName;

use super::aid_index::AidCandidate;
use super::outcome::{Candidate, Resolution};

fn resolve<C: Candidate>(candidates: &[C], preferred: Option<&ComponentName>) -> Resolution<C> {
    if let Some(preferred) = preferred {
        if let Some(c) = candidates.iter().find(|c| c.component() == preferred) {
            return Resolution::Resolved(c.clone());
        }
    }
    match candidates {
        [] => Resolution::NoMatch,
        [only] => Resolution::Resolved(only.clone()),
        many => Resolution::Ambiguous(many.to_vec()),
    }
}

/// Picks the service for a SELECT: the preferred service when it registered
/// the AID, else the only candidate, else `Ambiguous`.
pub fn resolve_aid_conflict(
    candidates: &[AidCandidate],
    preferred: Option<&ComponentName>,
) -> Resolution<AidCandidate> {
    resolve(candidates, preferred)
}

/// Picks the service for a polling frame. Exact matches outrank pattern
/// matches; a preferred service only wins within the set that takes part.
pub fn resolve_polling_loop_filter_conflict(
    matched: &FilterMatch,
    preferred: Option<&ComponentName>,
) -> Resolution<FilterCandidate> {
    resolve(matched.effective(), preferred)
}
