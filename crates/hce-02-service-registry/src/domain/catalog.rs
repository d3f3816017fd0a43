//! Catalog construction: enumeration + settings → published snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use hce_01_filter_index::FilterTable;
use shared_types::{ComponentName, ServiceDescriptor, Uid, UserId};

use super::settings::UserSettings;

/// Services enumerated for one user that passed the permission check.
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    pub on_host: Vec<ServiceDescriptor>,
    pub off_host: Vec<ServiceDescriptor>,
}

impl Enumeration {
    /// Installed components with their uids.
    #[must_use]
    pub fn installed(&self) -> HashMap<ComponentName, Uid> {
        self.iter().map(|s| (s.component.clone(), s.uid)).collect()
    }

    #[must_use]
    pub fn find(&self, component: &ComponentName) -> Option<&ServiceDescriptor> {
        self.iter().find(|s| &s.component == component)
    }

    /// On-host services first, each list in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.on_host.iter().chain(self.off_host.iter())
    }
}

/// Immutable view of one user's catalog, handed to the resolver and the
/// dispatcher.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub user_id: UserId,
    /// On-host services first, then off-host, each in enumeration order.
    pub services: Vec<Arc<ServiceDescriptor>>,
    pub filters: Arc<FilterTable>,
    /// Set when defaults may reference a service that was just removed.
    pub has_unknown_default: bool,
}

impl CatalogSnapshot {
    /// Snapshot published when a user's catalog is purged.
    #[must_use]
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            services: Vec::new(),
            filters: Arc::new(FilterTable::new()),
            has_unknown_default: false,
        }
    }

    #[must_use]
    pub fn service(&self, component: &ComponentName) -> Option<&Arc<ServiceDescriptor>> {
        self.services.iter().find(|s| &s.component == component)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn components(&self) -> impl Iterator<Item = &ComponentName> {
        self.services.iter().map(|s| &s.component)
    }
}

/// Merges persisted settings into enumerated services.
///
/// Settings apply only when their uid matches the installed service. A
/// component enumerated twice keeps its first (on-host) occurrence.
pub fn merge(enumeration: &Enumeration, settings: Option<&UserSettings>) -> Vec<Arc<ServiceDescriptor>> {
    let mut merged: Vec<Arc<ServiceDescriptor>> = Vec::new();
    for service in enumeration.iter() {
        if merged.iter().any(|s| s.component == service.component) {
            continue;
        }
        let mut service = service.clone();
        if let Some(settings) = settings {
            apply_settings(&mut service, settings);
        }
        merged.push(Arc::new(service));
    }
    merged
}

fn apply_settings(service: &mut ServiceDescriptor, settings: &UserSettings) {
    if let Some(o) = settings
        .overrides
        .get(&service.component)
        .filter(|o| o.uid == service.uid)
    {
        for group in o.aid_groups.values() {
            service.set_dynamic_aid_group(group.clone());
        }
        service.dynamic_off_host_se = o.off_host_se.clone();
        if let Some(default) = o.observe_mode_default() {
            service.should_default_to_observe_mode = default;
        }
        for filter in &o.polling_loop_filters {
            service.add_polling_loop_filter(filter.clone());
        }
        for filter in &o.pattern_filters {
            service.add_pattern_filter(filter.clone());
        }
    }
    if let Some(status) = settings
        .others
        .get(&service.component)
        .filter(|s| s.uid == service.uid)
    {
        service.category_other_enabled = status.checked;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::settings::{DynamicOverride, OtherServiceStatus};
    use shared_types::{categories, AidGroup, PollingLoopFilter, ServiceKind};

    fn descriptor(class: &str, kind: ServiceKind, uid: Uid) -> ServiceDescriptor {
        ServiceDescriptor::new(ComponentName::new("com.example", class), kind, 0, uid)
            .with_aid_group(AidGroup::new(categories::OTHER, ["F0010203040506"]))
    }

    #[test]
    fn test_on_host_before_off_host() {
        let enumeration = Enumeration {
            on_host: vec![descriptor("Host", ServiceKind::OnHost, 1)],
            off_host: vec![
                descriptor("Se", ServiceKind::OffHost, 1),
                descriptor("Host", ServiceKind::OffHost, 1),
            ],
        };
        let merged = merge(&enumeration, None);
        let names: Vec<_> = merged.iter().map(|s| s.component.class()).collect();
        assert_eq!(names, vec!["Host", "Se"]);
        assert!(merged[0].is_on_host());
    }

    #[test]
    fn test_override_applies_only_to_matching_uid() {
        let enumeration = Enumeration {
            on_host: vec![
                descriptor("Match", ServiceKind::OnHost, 7),
                descriptor("Mismatch", ServiceKind::OnHost, 8),
            ],
            off_host: Vec::new(),
        };
        let mut o = DynamicOverride::new(7);
        o.should_default_to_observe_mode = Some("true".into());
        o.aid_groups.insert(
            categories::OTHER.into(),
            AidGroup::new(categories::OTHER, ["F0AABBCCDDEE"]),
        );
        o.polling_loop_filters.push(PollingLoopFilter::new("CAFE", true));

        let mut settings = UserSettings::default();
        settings
            .overrides
            .insert(ComponentName::new("com.example", "Match"), o.clone());
        settings
            .overrides
            .insert(ComponentName::new("com.example", "Mismatch"), o);
        settings.others.insert(
            ComponentName::new("com.example", "Match"),
            OtherServiceStatus {
                uid: 7,
                checked: false,
            },
        );

        let merged = merge(&enumeration, Some(&settings));
        let matched = &merged[0];
        assert!(matched.should_default_to_observe_mode);
        assert_eq!(matched.aids_for_category(categories::OTHER), vec!["F0AABBCCDDEE"]);
        assert_eq!(matched.polling_loop_filters.len(), 1);
        assert!(!matched.category_other_enabled);

        let mismatched = &merged[1];
        assert!(!mismatched.should_default_to_observe_mode);
        assert_eq!(
            mismatched.aids_for_category(categories::OTHER),
            vec!["F0010203040506"]
        );
        assert!(mismatched.category_other_enabled);
    }

    #[test]
    fn test_snapshot_lookup() {
        let services = merge(
            &Enumeration {
                on_host: vec![descriptor("Host", ServiceKind::OnHost, 1)],
                off_host: Vec::new(),
            },
            None,
        );
        let snapshot = CatalogSnapshot {
            user_id: 0,
            filters: Arc::new(FilterTable::build(&services)),
            services,
            has_unknown_default: false,
        };
        assert!(snapshot
            .service(&ComponentName::new("com.example", "Host"))
            .is_some());
        assert_eq!(snapshot.len(), 1);
        assert!(CatalogSnapshot::empty(3).is_empty());
    }
}
