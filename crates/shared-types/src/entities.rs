//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Identity**: `ComponentName`, `UserHandle`, `UserId`, `Uid`
//! - **Capabilities**: `AidGroup`, `PollingLoopFilter`, `PatternFilter`
//! - **Catalog**: `ServiceDescriptor`, `ServiceKind`
//! - **Session**: `EmulationPhase`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::IdentityError;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Platform user identifier (0 is the system/primary user).
pub type UserId = u32;

/// Application uid. Encodes the owning user in its upper range.
pub type Uid = u32;

/// Number of uids reserved per user.
pub const PER_USER_RANGE: Uid = 100_000;

/// Returns the user that owns `uid`.
#[must_use]
pub fn user_id_for_uid(uid: Uid) -> UserId {
    uid / PER_USER_RANGE
}

/// Handle to a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserHandle(pub UserId);

impl UserHandle {
    #[must_use]
    pub fn of(user_id: UserId) -> Self {
        Self(user_id)
    }

    #[must_use]
    pub fn id(self) -> UserId {
        self.0
    }
}

impl fmt::Display for UserHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserHandle{{{}}}", self.0)
    }
}

/// Package + class identity of an emulation service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentName {
    pub package: String,
    pub class: String,
}

impl ComponentName {
    pub fn new(package: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            class: class.into(),
        }
    }

    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Flattened `package/class` form used as the persistence key.
    #[must_use]
    pub fn flatten(&self) -> String {
        format!("{}/{}", self.package, self.class)
    }

    /// Short form: `package/.Class` when the class lives in the package.
    #[must_use]
    pub fn flatten_short(&self) -> String {
        match self.class.strip_prefix(self.package.as_str()) {
            Some(rest) if rest.starts_with('.') => format!("{}/{}", self.package, rest),
            _ => self.flatten(),
        }
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.flatten_short())
    }
}

impl FromStr for ComponentName {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (package, class) = s
            .split_once('/')
            .ok_or_else(|| IdentityError::InvalidComponentName(s.to_string()))?;
        if package.is_empty() || class.is_empty() {
            return Err(IdentityError::InvalidComponentName(s.to_string()));
        }
        let class = if class.starts_with('.') {
            format!("{package}{class}")
        } else {
            class.to_string()
        };
        Ok(Self::new(package, class))
    }
}

// =============================================================================
// CLUSTER B: CAPABILITIES
// =============================================================================

/// AID group categories.
pub mod categories {
    /// Payment applications. At most one is preferred per user.
    pub const PAYMENT: &str = "payment";
    /// Everything else (transit, access, loyalty, ...).
    pub const OTHER: &str = "other";

    #[must_use]
    pub fn is_valid(category: &str) -> bool {
        category == PAYMENT || category == OTHER
    }
}

/// A set of AIDs registered under one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AidGroup {
    pub category: String,
    pub aids: Vec<String>,
}

impl AidGroup {
    /// Creates a group, normalizing every AID to uppercase.
    pub fn new<I, S>(category: impl Into<String>, aids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            category: category.into(),
            aids: aids
                .into_iter()
                .map(|aid| aid.as_ref().to_ascii_uppercase())
                .collect(),
        }
    }
}

/// An exact polling-loop filter (uppercase hex of the frame payload).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PollingLoopFilter {
    pub filter: String,
    #[serde(default)]
    pub auto_transact: bool,
}

impl PollingLoopFilter {
    pub fn new(filter: impl AsRef<str>, auto_transact: bool) -> Self {
        Self {
            filter: filter.as_ref().to_ascii_uppercase(),
            auto_transact,
        }
    }
}

/// A polling-loop pattern filter (regular expression over uppercase hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternFilter {
    pub pattern: String,
    #[serde(default)]
    pub auto_transact: bool,
}

impl PatternFilter {
    pub fn new(pattern: impl AsRef<str>, auto_transact: bool) -> Self {
        Self {
            pattern: pattern.as_ref().to_ascii_uppercase(),
            auto_transact,
        }
    }
}

// =============================================================================
// CLUSTER C: CATALOG
// =============================================================================

/// Where the emulation logic of a service executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    /// Runs on the application processor, reachable through a channel.
    OnHost,
    /// Runs in a secure element; catalogued but never bound.
    OffHost,
}

/// One emulation service as seen by the routing core.
///
/// Static fields come from platform enumeration; `dynamic_*` fields and the
/// filter lists are merged in from persisted overrides on every rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub component: ComponentName,
    pub kind: ServiceKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default)]
    pub uid: Uid,
    #[serde(default)]
    pub static_aid_groups: Vec<AidGroup>,
    #[serde(default)]
    pub dynamic_aid_groups: Vec<AidGroup>,
    #[serde(default)]
    pub polling_loop_filters: Vec<PollingLoopFilter>,
    #[serde(default)]
    pub polling_loop_pattern_filters: Vec<PatternFilter>,
    #[serde(default)]
    pub should_default_to_observe_mode: bool,
    #[serde(default)]
    pub static_off_host_se: Option<String>,
    #[serde(default)]
    pub dynamic_off_host_se: Option<String>,
    #[serde(default = "default_true")]
    pub category_other_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl ServiceDescriptor {
    pub fn new(component: ComponentName, kind: ServiceKind, user_id: UserId, uid: Uid) -> Self {
        Self {
            component,
            kind,
            description: String::new(),
            user_id,
            uid,
            static_aid_groups: Vec::new(),
            dynamic_aid_groups: Vec::new(),
            polling_loop_filters: Vec::new(),
            polling_loop_pattern_filters: Vec::new(),
            should_default_to_observe_mode: false,
            static_off_host_se: None,
            dynamic_off_host_se: None,
            category_other_enabled: true,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_aid_group(mut self, group: AidGroup) -> Self {
        self.static_aid_groups.push(group);
        self
    }

    #[must_use]
    pub fn with_polling_loop_filter(mut self, filter: PollingLoopFilter) -> Self {
        self.add_polling_loop_filter(filter);
        self
    }

    #[must_use]
    pub fn with_pattern_filter(mut self, filter: PatternFilter) -> Self {
        self.add_pattern_filter(filter);
        self
    }

    #[must_use]
    pub fn with_default_observe_mode(mut self, enabled: bool) -> Self {
        self.should_default_to_observe_mode = enabled;
        self
    }

    #[must_use]
    pub fn with_off_host_se(mut self, se: impl Into<String>) -> Self {
        self.static_off_host_se = Some(se.into());
        self
    }

    #[must_use]
    pub fn is_on_host(&self) -> bool {
        self.kind == ServiceKind::OnHost
    }

    /// Effective AID groups: a dynamic group replaces the static group of the
    /// same category.
    pub fn aid_groups(&self) -> Vec<&AidGroup> {
        let mut groups: Vec<&AidGroup> = self
            .static_aid_groups
            .iter()
            .filter(|g| !self.dynamic_aid_groups.iter().any(|d| d.category == g.category))
            .collect();
        groups.extend(self.dynamic_aid_groups.iter());
        groups
    }

    #[must_use]
    pub fn has_category(&self, category: &str) -> bool {
        self.aid_groups().iter().any(|g| g.category == category)
    }

    /// Effective AIDs for one category.
    pub fn aids_for_category(&self, category: &str) -> Vec<&str> {
        self.aid_groups()
            .into_iter()
            .filter(|g| g.category == category)
            .flat_map(|g| g.aids.iter().map(String::as_str))
            .collect()
    }

    /// Category under which `aid` is registered, if any.
    #[must_use]
    pub fn category_for_aid(&self, aid: &str) -> Option<&str> {
        self.aid_groups()
            .into_iter()
            .find(|g| g.aids.iter().any(|a| a.eq_ignore_ascii_case(aid)))
            .map(|g| g.category.as_str())
    }

    /// Effective secure element: the dynamic override wins.
    #[must_use]
    pub fn off_host_se(&self) -> Option<&str> {
        self.dynamic_off_host_se
            .as_deref()
            .or(self.static_off_host_se.as_deref())
    }

    pub fn set_dynamic_aid_group(&mut self, group: AidGroup) {
        self.dynamic_aid_groups.retain(|g| g.category != group.category);
        self.dynamic_aid_groups.push(group);
    }

    pub fn remove_dynamic_aid_group(&mut self, category: &str) -> bool {
        let before = self.dynamic_aid_groups.len();
        self.dynamic_aid_groups.retain(|g| g.category != category);
        before != self.dynamic_aid_groups.len()
    }

    /// Adds or updates an exact filter. Each filter string appears once.
    pub fn add_polling_loop_filter(&mut self, filter: PollingLoopFilter) {
        match self
            .polling_loop_filters
            .iter_mut()
            .find(|f| f.filter == filter.filter)
        {
            Some(existing) => existing.auto_transact = filter.auto_transact,
            None => self.polling_loop_filters.push(filter),
        }
    }

    pub fn remove_polling_loop_filter(&mut self, filter: &str) -> bool {
        let filter = filter.to_ascii_uppercase();
        let before = self.polling_loop_filters.len();
        self.polling_loop_filters.retain(|f| f.filter != filter);
        before != self.polling_loop_filters.len()
    }

    /// Adds or updates a pattern filter. Each pattern appears once.
    pub fn add_pattern_filter(&mut self, filter: PatternFilter) {
        match self
            .polling_loop_pattern_filters
            .iter_mut()
            .find(|f| f.pattern == filter.pattern)
        {
            Some(existing) => existing.auto_transact = filter.auto_transact,
            None => self.polling_loop_pattern_filters.push(filter),
        }
    }

    pub fn remove_pattern_filter(&mut self, pattern: &str) -> bool {
        let pattern = pattern.to_ascii_uppercase();
        let before = self.polling_loop_pattern_filters.len();
        self.polling_loop_pattern_filters
            .retain(|f| f.pattern != pattern);
        before != self.polling_loop_pattern_filters.len()
    }
}

// =============================================================================
// CLUSTER D: SESSION
// =============================================================================

/// Phase of the emulation dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EmulationPhase {
    #[default]
    Idle,
    /// Processing polling frames outside a card session.
    PollingLoop,
    /// Reader field active, waiting for the first SELECT.
    WaitForSelect,
    /// A service is selected and its channel is ready.
    BoundActive,
    /// Session ended, cleanup in progress.
    WaitForDeactivation,
}

impl EmulationPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PollingLoop => "polling_loop",
            Self::WaitForSelect => "wait_for_select",
            Self::BoundActive => "bound_active",
            Self::WaitForDeactivation => "wait_for_deactivation",
        }
    }

    /// True while a reader session is in progress.
    #[must_use]
    pub fn in_session(self) -> bool {
        matches!(self, Self::WaitForSelect | Self::BoundActive)
    }
}

impl fmt::Display for EmulationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet() -> ComponentName {
        ComponentName::new("com.example.wallet", "com.example.wallet.PayService")
    }

    #[test]
    fn test_component_short_form_round_trip() {
        let component = wallet();
        assert_eq!(component.to_string(), "com.example.wallet/.PayService");

        let parsed: ComponentName = "com.example.wallet/.PayService".parse().unwrap();
        assert_eq!(parsed, component);

        let parsed: ComponentName = component.flatten().parse().unwrap();
        assert_eq!(parsed, component);
    }

    #[test]
    fn test_component_rejects_missing_class() {
        assert!("com.example.wallet".parse::<ComponentName>().is_err());
        assert!("com.example.wallet/".parse::<ComponentName>().is_err());
    }

    #[test]
    fn test_user_for_uid() {
        assert_eq!(user_id_for_uid(10_123), 0);
        assert_eq!(user_id_for_uid(1_010_123), 10);
    }

    #[test]
    fn test_dynamic_group_replaces_static_category() {
        let mut service = ServiceDescriptor::new(wallet(), ServiceKind::OnHost, 0, 10_001)
            .with_aid_group(AidGroup::new(categories::PAYMENT, ["a000000004101010"]))
            .with_aid_group(AidGroup::new(categories::OTHER, ["F0010203040506"]));

        service.set_dynamic_aid_group(AidGroup::new(categories::PAYMENT, ["A000000004101011"]));

        assert_eq!(
            service.aids_for_category(categories::PAYMENT),
            vec!["A000000004101011"]
        );
        assert_eq!(
            service.aids_for_category(categories::OTHER),
            vec!["F0010203040506"]
        );
        assert_eq!(
            service.category_for_aid("a000000004101011"),
            Some(categories::PAYMENT)
        );

        assert!(service.remove_dynamic_aid_group(categories::PAYMENT));
        assert_eq!(
            service.aids_for_category(categories::PAYMENT),
            vec!["A000000004101010"]
        );
    }

    #[test]
    fn test_polling_filters_are_unique() {
        let mut service = ServiceDescriptor::new(wallet(), ServiceKind::OnHost, 0, 10_001);
        service.add_polling_loop_filter(PollingLoopFilter::new("aabb", false));
        service.add_polling_loop_filter(PollingLoopFilter::new("AABB", true));

        assert_eq!(service.polling_loop_filters.len(), 1);
        assert!(service.polling_loop_filters[0].auto_transact);
        assert!(service.remove_polling_loop_filter("aabb"));
        assert!(service.polling_loop_filters.is_empty());
    }

    #[test]
    fn test_off_host_se_override() {
        let mut service = ServiceDescriptor::new(wallet(), ServiceKind::OffHost, 0, 10_001)
            .with_off_host_se("eSE1");
        assert_eq!(service.off_host_se(), Some("eSE1"));
        service.dynamic_off_host_se = Some("SIM1".into());
        assert_eq!(service.off_host_se(), Some("SIM1"));
    }

    #[test]
    fn test_descriptor_manifest_defaults() {
        let json = r#"{
            "component": {"package": "p", "class": "p.S"},
            "kind": "OnHost"
        }"#;
        let service: ServiceDescriptor = serde_json::from_str(json).unwrap();
        assert!(service.category_other_enabled);
        assert!(service.static_aid_groups.is_empty());
        assert!(service.is_on_host());
    }
}
