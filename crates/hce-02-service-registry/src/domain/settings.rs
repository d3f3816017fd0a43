//! Persisted per-service settings.
//!
//! Both stores are keyed by component and carry the owning uid, which also
//! identifies the owning user. An entry applies only while its uid matches
//! the installed service; a reinstall under another uid makes it stale.

use std::collections::{BTreeMap, HashMap, HashSet};

use shared_types::{
    user_id_for_uid, AidGroup, ComponentName, PatternFilter, PollingLoopFilter, Uid, UserId,
};

/// Runtime overrides registered by a service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicOverride {
    pub uid: Uid,
    pub off_host_se: Option<String>,
    /// `"true"`/`"false"`; `None` keeps the service's declared default.
    pub should_default_to_observe_mode: Option<String>,
    /// category → group
    pub aid_groups: BTreeMap<String, AidGroup>,
    pub polling_loop_filters: Vec<PollingLoopFilter>,
    pub pattern_filters: Vec<PatternFilter>,
}

impl DynamicOverride {
    #[must_use]
    pub fn new(uid: Uid) -> Self {
        Self {
            uid,
            ..Self::default()
        }
    }

    /// Parsed observe-mode default. Unparseable strings are ignored.
    #[must_use]
    pub fn observe_mode_default(&self) -> Option<bool> {
        match self.should_default_to_observe_mode.as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        }
    }

    /// True when the override no longer changes anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.off_host_se.is_none()
            && self.should_default_to_observe_mode.is_none()
            && self.aid_groups.is_empty()
            && self.polling_loop_filters.is_empty()
            && self.pattern_filters.is_empty()
    }
}

/// Enablement of a service for the "other" category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtherServiceStatus {
    pub uid: Uid,
    pub checked: bool,
}

/// Settings of one user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSettings {
    pub overrides: BTreeMap<ComponentName, DynamicOverride>,
    pub others: BTreeMap<ComponentName, OtherServiceStatus>,
}

impl UserSettings {
    /// Drops entries for components that are not installed under the same
    /// uid. Returns the number of entries removed.
    pub fn prune(&mut self, installed: &HashMap<ComponentName, Uid>) -> usize {
        let before = self.overrides.len() + self.others.len();
        self.overrides
            .retain(|component, o| installed.get(component) == Some(&o.uid));
        self.others
            .retain(|component, s| installed.get(component) == Some(&s.uid));
        before - (self.overrides.len() + self.others.len())
    }

    /// Returns the override for `component`, creating one owned by `uid`.
    /// An entry left behind by a previous install is replaced.
    pub fn override_mut(&mut self, component: &ComponentName, uid: Uid) -> &mut DynamicOverride {
        let entry = self
            .overrides
            .entry(component.clone())
            .or_insert_with(|| DynamicOverride::new(uid));
        if entry.uid != uid {
            *entry = DynamicOverride::new(uid);
        }
        entry
    }

    /// Removes the override when it has become a no-op.
    pub fn drop_if_empty(&mut self, component: &ComponentName) {
        if self.overrides.get(component).is_some_and(DynamicOverride::is_empty) {
            self.overrides.remove(component);
        }
    }
}

/// Settings of every user, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsState {
    users: HashMap<UserId, UserSettings>,
}

impl SettingsState {
    /// Groups flat store entries by the user encoded in their uid.
    pub fn from_entries(
        overrides: Vec<(ComponentName, DynamicOverride)>,
        others: Vec<(ComponentName, OtherServiceStatus)>,
    ) -> Self {
        let mut state = Self::default();
        for (component, o) in overrides {
            state
                .users
                .entry(user_id_for_uid(o.uid))
                .or_default()
                .overrides
                .insert(component, o);
        }
        for (component, s) in others {
            state
                .users
                .entry(user_id_for_uid(s.uid))
                .or_default()
                .others
                .insert(component, s);
        }
        state
    }

    #[must_use]
    pub fn user(&self, user_id: UserId) -> Option<&UserSettings> {
        self.users.get(&user_id)
    }

    pub fn user_mut(&mut self, user_id: UserId) -> &mut UserSettings {
        self.users.entry(user_id).or_default()
    }

    /// All overrides, ordered by user then component.
    pub fn override_entries(&self) -> Vec<(&ComponentName, &DynamicOverride)> {
        let mut users: Vec<_> = self.users.keys().copied().collect();
        users.sort_unstable();
        users
            .into_iter()
            .filter_map(|u| self.users.get(&u))
            .flat_map(|s| s.overrides.iter())
            .collect()
    }

    /// All "other" statuses, ordered by user then component.
    pub fn other_entries(&self) -> Vec<(&ComponentName, &OtherServiceStatus)> {
        let mut users: Vec<_> = self.users.keys().copied().collect();
        users.sort_unstable();
        users
            .into_iter()
            .filter_map(|u| self.users.get(&u))
            .flat_map(|s| s.others.iter())
            .collect()
    }

    pub fn users(&self) -> HashSet<UserId> {
        self.users.keys().copied().collect()
    }
}
