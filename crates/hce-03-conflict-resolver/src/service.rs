//! # Conflict Resolver
//!
//! Binds the pure rules to one catalog snapshot. A resolver is rebuilt
//! whenever the registry publishes; it never changes afterwards, so the same
//! (snapshot, preferred, payload) always yields the same outcome.

use std::sync::Arc;

use hce_01_filter_index::FilterCandidate;
use hce_02_service_registry::CatalogSnapshot;
use shared_types::{ComponentName, PollingFrame, UserId};
use tracing::debug;

use crate::domain::{
    resolve_aid_conflict, resolve_polling_loop_filter_conflict, AidCandidate, AidIndex, Resolution,
};

#[derive(Debug, Clone)]
pub struct ConflictResolver {
    snapshot: Arc<CatalogSnapshot>,
    aids: AidIndex,
}

impl ConflictResolver {
    pub fn new(snapshot: Arc<CatalogSnapshot>) -> Self {
        let aids = AidIndex::from_snapshot(&snapshot);
        Self { snapshot, aids }
    }

    /// Resolver over an empty catalog; resolves nothing.
    pub fn empty(user_id: UserId) -> Self {
        Self::new(Arc::new(CatalogSnapshot::empty(user_id)))
    }

    #[must_use]
    pub fn snapshot(&self) -> &Arc<CatalogSnapshot> {
        &self.snapshot
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.snapshot.user_id
    }

    /// Resolves a selected AID.
    pub fn resolve_aid(
        &self,
        aid: &str,
        preferred: Option<&ComponentName>,
    ) -> Resolution<AidCandidate> {
        let candidates = self.aids.lookup(aid);
        let outcome = resolve_aid_conflict(&candidates, preferred);
        if outcome.is_ambiguous() {
            debug!(aid, candidates = candidates.len(), "AID is ambiguous");
        }
        outcome
    }

    /// Resolves one polling frame by its payload.
    pub fn resolve_polling_frame(
        &self,
        frame: &PollingFrame,
        preferred: Option<&ComponentName>,
    ) -> Resolution<FilterCandidate> {
        let matched = self.snapshot.filters.lookup_frame(frame);
        resolve_polling_loop_filter_conflict(&matched, preferred)
    }
}
