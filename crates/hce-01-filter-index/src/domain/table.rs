//! Per-user polling-loop filter table.
//!
//! INVARIANTS:
//! - A service appears at most once in the list of any single filter.
//! - List order is registration order (catalog order at build time).
//! - Exact matches outrank pattern matches for the same payload.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use shared_types::{ComponentName, PollingFrame, ServiceDescriptor};
use tracing::warn;

use super::normalize::{compile_pattern, normalize_exact_filter};
use crate::error::FilterError;

/// How a candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    Exact,
    Pattern,
}

/// A service registered under a filter, with that filter's auto-transact flag.
#[derive(Debug, Clone)]
struct FilterEntry {
    service: Arc<ServiceDescriptor>,
    auto_transact: bool,
}

#[derive(Debug, Clone)]
struct PatternEntry {
    source: String,
    regex: Regex,
    entries: Vec<FilterEntry>,
}

/// A service that matched a payload.
#[derive(Debug, Clone)]
pub struct FilterCandidate {
    pub service: Arc<ServiceDescriptor>,
    pub kind: MatchKind,
    /// Auto-transact flag of the filter that matched, not of the service.
    pub auto_transact: bool,
}

impl FilterCandidate {
    #[must_use]
    pub fn component(&self) -> &ComponentName {
        &self.service.component
    }
}

/// Result of a table lookup.
#[derive(Debug, Clone, Default)]
pub struct FilterMatch {
    pub exact: Vec<FilterCandidate>,
    pub pattern: Vec<FilterCandidate>,
}

impl FilterMatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.pattern.is_empty()
    }

    /// Candidates that take part in resolution: the exact set when it is
    /// non-empty, otherwise the pattern set.
    #[must_use]
    pub fn effective(&self) -> &[FilterCandidate] {
        if self.exact.is_empty() {
            &self.pattern
        } else {
            &self.exact
        }
    }

    /// All candidates, exact first.
    pub fn all(&self) -> impl Iterator<Item = &FilterCandidate> {
        self.exact.iter().chain(self.pattern.iter())
    }
}

/// Exact-filter and pattern-filter lookup for one user.
#[derive(Debug, Clone, Default)]
pub struct FilterTable {
    exact: HashMap<String, Vec<FilterEntry>>,
    patterns: Vec<PatternEntry>,
}

impl FilterTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table from an ordered catalog.
    ///
    /// Filters were validated when registered; anything that still fails to
    /// normalize (for example a malformed static declaration) is skipped.
    pub fn build<'a, I>(services: I) -> Self
    where
        I: IntoIterator<Item = &'a Arc<ServiceDescriptor>>,
    {
        let mut table = Self::new();
        for service in services {
            for filter in &service.polling_loop_filters {
                if let Err(e) =
                    table.insert_exact(&filter.filter, service.clone(), filter.auto_transact)
                {
                    warn!(component = %service.component, error = %e, "Skipping polling loop filter");
                }
            }
            for pattern in &service.polling_loop_pattern_filters {
                if let Err(e) =
                    table.insert_pattern(&pattern.pattern, service.clone(), pattern.auto_transact)
                {
                    warn!(component = %service.component, error = %e, "Skipping pattern filter");
                }
            }
        }
        table
    }

    /// Registers `service` under an exact filter. Re-registering updates the
    /// auto-transact flag in place.
    pub fn insert_exact(
        &mut self,
        filter: &str,
        service: Arc<ServiceDescriptor>,
        auto_transact: bool,
    ) -> Result<(), FilterError> {
        let key = normalize_exact_filter(filter)?;
        upsert(self.exact.entry(key).or_default(), service, auto_transact);
        Ok(())
    }

    /// Registers `service` under a pattern filter. Patterns keep the order
    /// in which they were first registered.
    pub fn insert_pattern(
        &mut self,
        pattern: &str,
        service: Arc<ServiceDescriptor>,
        auto_transact: bool,
    ) -> Result<(), FilterError> {
        let source = pattern.to_ascii_uppercase();
        if let Some(existing) = self.patterns.iter_mut().find(|p| p.source == source) {
            upsert(&mut existing.entries, service, auto_transact);
            return Ok(());
        }
        let regex = compile_pattern(&source)?;
        self.patterns.push(PatternEntry {
            source,
            regex,
            entries: vec![FilterEntry {
                service,
                auto_transact,
            }],
        });
        Ok(())
    }

    /// Drops every registration of `component`. Empty filters disappear.
    pub fn remove_service(&mut self, component: &ComponentName) {
        self.exact.retain(|_, entries| {
            entries.retain(|e| &e.service.component != component);
            !entries.is_empty()
        });
        self.patterns.retain_mut(|p| {
            p.entries.retain(|e| &e.service.component != component);
            !p.entries.is_empty()
        });
    }

    /// Looks up an uppercase-hex payload.
    ///
    /// Exact candidates come from a hash lookup. Patterns are tried in
    /// registration order and only the first one that accepts the payload
    /// contributes candidates.
    #[must_use]
    pub fn lookup(&self, payload_hex: &str) -> FilterMatch {
        if payload_hex.is_empty() {
            return FilterMatch::default();
        }
        let exact = self
            .exact
            .get(payload_hex)
            .map(|entries| candidates(entries, MatchKind::Exact))
            .unwrap_or_default();
        let pattern = self
            .patterns
            .iter()
            .find(|p| p.regex.is_match(payload_hex))
            .map(|p| candidates(&p.entries, MatchKind::Pattern))
            .unwrap_or_default();
        FilterMatch { exact, pattern }
    }

    /// Looks up a frame by its payload. Frames without data never match.
    #[must_use]
    pub fn lookup_frame(&self, frame: &PollingFrame) -> FilterMatch {
        if !frame.has_data() {
            return FilterMatch::default();
        }
        self.lookup(&frame.data_hex())
    }

    #[must_use]
    pub fn exact_filter_count(&self) -> usize {
        self.exact.len()
    }

    #[must_use]
    pub fn pattern_filter_count(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.patterns.is_empty()
    }

    /// Services registered under an exact filter, in registration order.
    pub fn services_for_exact(&self, filter: &str) -> Vec<&ComponentName> {
        let key = filter.to_ascii_uppercase();
        self.exact
            .get(&key)
            .map(|entries| entries.iter().map(|e| &e.service.component).collect())
            .unwrap_or_default()
    }
}

fn upsert(entries: &mut Vec<FilterEntry>, service: Arc<ServiceDescriptor>, auto_transact: bool) {
    match entries
        .iter_mut()
        .find(|e| e.service.component == service.component)
    {
        Some(existing) => {
            existing.service = service;
            existing.auto_transact = auto_transact;
        }
        None => entries.push(FilterEntry {
            service,
            auto_transact,
        }),
    }
}

fn candidates(entries: &[FilterEntry], kind: MatchKind) -> Vec<FilterCandidate> {
    entries
        .iter()
        .map(|e| FilterCandidate {
            service: e.service.clone(),
            kind,
            auto_transact: e.auto_transact,
        })
        .collect()
}
