//! AID lookup over one catalog.
//!
//! Registrations come in three shapes:
//!
//! | Registered | Matches a SELECT of |
//! |------------|---------------------|
//! | `A0000000041010` | exactly that AID |
//! | `A000000004*` | any AID starting with `A000000004` |
//! | `A0000000041010FF#` | any prefix of `A0000000041010FF` |

use std::collections::HashMap;
use std::sync::Arc;

use hce_02_service_registry::CatalogSnapshot;
use shared_types::{categories, ServiceDescriptor};
use tracing::trace;

/// How a SELECT matched a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AidMatchKind {
    Exact,
    Prefix,
    Subset,
}

/// A service that registered the selected AID.
#[derive(Debug, Clone)]
pub struct AidCandidate {
    pub service: Arc<ServiceDescriptor>,
    pub category: String,
    pub kind: AidMatchKind,
}

#[derive(Debug, Clone)]
struct AidEntry {
    /// Position in the catalog; keeps candidate order stable.
    rank: usize,
    service: Arc<ServiceDescriptor>,
    category: String,
}

#[derive(Debug, Clone, Default)]
pub struct AidIndex {
    exact: HashMap<String, Vec<AidEntry>>,
    prefix: Vec<(String, AidEntry)>,
    subset: Vec<(String, AidEntry)>,
}

impl AidIndex {
    /// Indexes every effective AID group of an ordered catalog. Services
    /// switched off for the "other" category contribute no "other" AIDs.
    pub fn build(services: &[Arc<ServiceDescriptor>]) -> Self {
        let mut index = Self::default();
        for (rank, service) in services.iter().enumerate() {
            for group in service.aid_groups() {
                if group.category == categories::OTHER && !service.category_other_enabled {
                    trace!(component = %service.component, "Skipping disabled other-category AIDs");
                    continue;
                }
                for aid in &group.aids {
                    let entry = AidEntry {
                        rank,
                        service: service.clone(),
                        category: group.category.clone(),
                    };
                    let aid = aid.to_ascii_uppercase();
                    if let Some(stem) = aid.strip_suffix('*') {
                        index.prefix.push((stem.to_string(), entry));
                    } else if let Some(stem) = aid.strip_suffix('#') {
                        index.subset.push((stem.to_string(), entry));
                    } else {
                        index.exact.entry(aid).or_default().push(entry);
                    }
                }
            }
        }
        index
    }

    #[must_use]
    pub fn from_snapshot(snapshot: &CatalogSnapshot) -> Self {
        Self::build(&snapshot.services)
    }

    /// Every service that registered `aid`, once each, in catalog order.
    /// When a service matches several ways the exact match is reported.
    pub fn lookup(&self, aid: &str) -> Vec<AidCandidate> {
        let aid = aid.to_ascii_uppercase();
        if aid.is_empty() {
            return Vec::new();
        }

        let exact = self
            .exact
            .get(&aid)
            .into_iter()
            .flatten()
            .map(|e| (e, AidMatchKind::Exact));
        let prefix = self
            .prefix
            .iter()
            .filter(|(stem, _)| aid.starts_with(stem.as_str()))
            .map(|(_, e)| (e, AidMatchKind::Prefix));
        let subset = self
            .subset
            .iter()
            .filter(|(stem, _)| stem.starts_with(aid.as_str()))
            .map(|(_, e)| (e, AidMatchKind::Subset));

        let mut hits: Vec<(&AidEntry, AidMatchKind)> = Vec::new();
        for (entry, kind) in exact.chain(prefix).chain(subset) {
            if !hits
                .iter()
                .any(|(e, _)| e.service.component == entry.service.component)
            {
                hits.push((entry, kind));
            }
        }
        hits.sort_by_key(|(e, _)| e.rank);
        hits.into_iter()
            .map(|(e, kind)| AidCandidate {
                service: e.service.clone(),
                category: e.category.clone(),
                kind,
            })
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefix.is_empty() && self.subset.is_empty()
    }
}
