use std::sync::Arc;

use hce_01_filter_index::FilterCandidate;
use shared_types::{ComponentName, ServiceDescriptor};

use super::aid_index::AidCandidate;

/// Anything the rules can arbitrate between.
pub trait Candidate: Clone {
    fn service(&self) -> &Arc<ServiceDescriptor>;

    fn component(&self) -> &ComponentName {
        &self.service().component
    }
}

impl Candidate for FilterCandidate {
    fn service(&self) -> &Arc<ServiceDescriptor> {
        &self.service
    }
}

impl Candidate for AidCandidate {
    fn service(&self) -> &Arc<ServiceDescriptor> {
        &self.service
    }
}

/// Result of a conflict resolution. Ambiguity is an answer, not an error.
#[derive(Debug, Clone)]
pub enum Resolution<C> {
    /// Exactly one service should handle the input.
    Resolved(C),
    /// Several services qualify and none is preferred. Catalog order.
    Ambiguous(Vec<C>),
    NoMatch,
}

impl<C: Candidate> Resolution<C> {
    #[must_use]
    pub fn winner(&self) -> Option<&C> {
        match self {
            Self::Resolved(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous(_))
    }

    /// Components of every candidate that took part.
    pub fn components(&self) -> Vec<ComponentName> {
        match self {
            Self::Resolved(c) => vec![c.component().clone()],
            Self::Ambiguous(cs) => cs.iter().map(|c| c.component().clone()).collect(),
            Self::NoMatch => Vec::new(),
        }
    }
}
