//! Per-user collection of filter tables.
//!
//! Tables are rebuilt wholesale from a catalog and published as `Arc`s, so
//! a lookup in flight keeps the table it started with.

use std::collections::HashMap;
use std::sync::Arc;

use shared_types::{ServiceDescriptor, UserId};
use tracing::debug;

use super::table::{FilterMatch, FilterTable};

#[derive(Debug, Default)]
pub struct FilterIndex {
    tables: HashMap<UserId, Arc<FilterTable>>,
}

impl FilterIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the user's table with one built from `services`.
    pub fn rebuild(&mut self, user_id: UserId, services: &[Arc<ServiceDescriptor>]) -> Arc<FilterTable> {
        let table = Arc::new(FilterTable::build(services));
        debug!(
            user_id,
            exact = table.exact_filter_count(),
            patterns = table.pattern_filter_count(),
            "Filter table rebuilt"
        );
        self.tables.insert(user_id, table.clone());
        table
    }

    pub fn remove_user(&mut self, user_id: UserId) -> bool {
        self.tables.remove(&user_id).is_some()
    }

    #[must_use]
    pub fn table(&self, user_id: UserId) -> Option<Arc<FilterTable>> {
        self.tables.get(&user_id).cloned()
    }

    /// Lookup in the user's table; unknown users match nothing.
    #[must_use]
    pub fn lookup(&self, user_id: UserId, payload_hex: &str) -> FilterMatch {
        self.tables
            .get(&user_id)
            .map(|t| t.lookup(payload_hex))
            .unwrap_or_default()
    }

    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.tables.keys().copied()
    }
}
