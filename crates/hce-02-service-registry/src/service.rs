//! # Service Registry
//!
//! Durable, per-user catalog of emulation services.
//!
//! ## Architecture
//!
//! This service:
//! 1. Implements `ServiceRegistryApi` for lifecycle, registration and queries
//! 2. Merges persisted settings into every enumeration before publishing
//! 3. Publishes immutable `CatalogSnapshot`s through `ServicesCallback`
//! 4. Uses dependency injection for all external dependencies
//!
//! ## Locking
//!
//! ```text
//! user lock (per user, held for a whole operation)
//!   └── settings mutex (held while mutating + persisting)
//!   └── catalogs RwLock (write only to swap in a new catalog)
//! ```
//!
//! Readers only take the catalogs read lock.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use hce_01_filter_index::{normalize_exact_filter, normalize_pattern, FilterIndex};
use hce_telemetry::{CATALOG_REBUILDS, CATALOG_SERVICES, PERSISTENCE_FAILURES};
use parking_lot::{Mutex, RwLock};
use shared_types::{
    categories, AidGroup, ComponentName, PatternFilter, PollingLoopFilter, ServiceDescriptor,
    ServiceKind, UserHandle, UserId,
};
use tracing::{debug, info, warn};

use crate::domain::codec::{decode_others, decode_overrides, encode_others, encode_overrides};
use crate::domain::validation::{validate_aid_group, validate_category, validate_secure_element};
use crate::domain::{merge, CatalogSnapshot, Enumeration, SettingsState, UserSettings};
use crate::error::{RegistryError, StoreError};
use crate::ports::inbound::ServiceRegistryApi;
use crate::ports::outbound::{ServicePlatform, ServicesCallback, SettingsFile, UserProfiles};

/// Default file name of the dynamic-settings store.
pub const DYNAMIC_SETTINGS_FILE: &str = "dynamic_aids.json";
/// Default file name of the "other" status store.
pub const OTHER_STATUS_FILE: &str = "other_status.json";

/// Why a catalog was rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    Initialize,
    UserUpdate,
    PackageRemoved,
    ExternalStorage,
    Registration,
}

impl RebuildReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::UserUpdate => "user_update",
            Self::PackageRemoved => "package_removed",
            Self::ExternalStorage => "storage",
            Self::Registration => "registration",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Store {
    Dynamic,
    Other,
}

struct UserCatalog {
    enumeration: Enumeration,
    snapshot: Arc<CatalogSnapshot>,
}

/// The Service Registry.
pub struct ServiceRegistry {
    platform: Arc<dyn ServicePlatform>,
    profiles: Arc<dyn UserProfiles>,
    dynamic_store: Arc<dyn SettingsFile>,
    other_store: Arc<dyn SettingsFile>,
    callback: Arc<dyn ServicesCallback>,
    /// Settings of every user, including purged ones.
    settings: Mutex<SettingsState>,
    catalogs: RwLock<HashMap<UserId, UserCatalog>>,
    filter_index: Mutex<FilterIndex>,
    quiet: RwLock<HashSet<UserId>>,
    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl ServiceRegistry {
    pub fn new(
        platform: Arc<dyn ServicePlatform>,
        profiles: Arc<dyn UserProfiles>,
        dynamic_store: Arc<dyn SettingsFile>,
        other_store: Arc<dyn SettingsFile>,
        callback: Arc<dyn ServicesCallback>,
    ) -> Self {
        Self {
            platform,
            profiles,
            dynamic_store,
            other_store,
            callback,
            settings: Mutex::new(SettingsState::default()),
            catalogs: RwLock::new(HashMap::new()),
            filter_index: Mutex::new(FilterIndex::new()),
            quiet: RwLock::new(HashSet::new()),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Users that currently have a published catalog.
    pub fn users(&self) -> Vec<UserId> {
        let mut users: Vec<_> = self.catalogs.read().keys().copied().collect();
        users.sort_unstable();
        users
    }

    pub fn is_quiet(&self, user_id: UserId) -> bool {
        self.quiet.read().contains(&user_id)
    }

    fn user_lock(&self, user_id: UserId) -> Arc<Mutex<()>> {
        self.user_locks.lock().entry(user_id).or_default().clone()
    }

    // =========================================================================
    // SETTINGS I/O
    // =========================================================================

    fn load_settings(&self) {
        let overrides = read_store(self.dynamic_store.as_ref(), decode_overrides);
        let others = read_store(self.other_store.as_ref(), decode_others);
        info!(
            overrides = overrides.len(),
            others = others.len(),
            "Settings loaded"
        );
        *self.settings.lock() = SettingsState::from_entries(overrides, others);
    }

    fn persist(&self, settings: &SettingsState, store: Store) -> Result<(), StoreError> {
        let (file, encoded) = match store {
            Store::Dynamic => (
                &self.dynamic_store,
                encode_overrides(settings.override_entries()),
            ),
            Store::Other => (&self.other_store, encode_others(settings.other_entries())),
        };
        let result = encoded.and_then(|bytes| file.atomic_write(&bytes));
        if let Err(e) = &result {
            PERSISTENCE_FAILURES
                .with_label_values(&[file.name(), "write"])
                .inc();
            warn!(store = file.name(), error = %e, "Failed to persist settings");
        }
        result
    }

    // =========================================================================
    // CATALOG CONSTRUCTION
    // =========================================================================

    /// Enumerates on-host then off-host services, dropping any whose package
    /// lacks the NFC permission.
    fn enumerate(&self, user: UserHandle) -> Result<Enumeration, RegistryError> {
        let mut enumeration = Enumeration::default();
        for kind in [ServiceKind::OnHost, ServiceKind::OffHost] {
            for mut service in self.platform.list_services(user, kind)? {
                let package = service.component.package().to_string();
                match self.platform.has_nfc_permission(&package, user) {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!(
                            user_id = user.id(),
                            component = %service.component,
                            "Skipping service: package lacks NFC permission"
                        );
                        continue;
                    }
                    Err(e) => {
                        warn!(
                            user_id = user.id(),
                            component = %service.component,
                            error = %e,
                            "Skipping service: permission check failed"
                        );
                        continue;
                    }
                }
                service.kind = kind;
                service.user_id = user.id();
                match kind {
                    ServiceKind::OnHost => enumeration.on_host.push(service),
                    ServiceKind::OffHost => enumeration.off_host.push(service),
                }
            }
        }
        Ok(enumeration)
    }

    /// Re-enumerates a user under its lock. On platform failure the previous
    /// catalog stays in place.
    fn rebuild(&self, user_id: UserId, reason: RebuildReason) -> Result<Arc<CatalogSnapshot>, RegistryError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock();

        let enumeration = self.enumerate(UserHandle(user_id)).map_err(|e| {
            warn!(user_id, reason = reason.as_str(), error = %e, "Enumeration failed; keeping previous catalog");
            e
        })?;

        if reason == RebuildReason::PackageRemoved {
            let mut settings = self.settings.lock();
            let pruned = settings.user_mut(user_id).prune(&enumeration.installed());
            if pruned > 0 {
                info!(user_id, pruned, "Pruned settings of removed services");
                // The in-memory prune stands even if a write fails.
                for store in [Store::Dynamic, Store::Other] {
                    if let Err(e) = self.persist(&settings, store) {
                        warn!(user_id, ?store, error = %e, "Pruned settings kept in memory only");
                    }
                }
            }
        }

        Ok(self.publish(
            user_id,
            enumeration,
            reason,
            reason == RebuildReason::PackageRemoved,
        ))
    }

    fn publish(
        &self,
        user_id: UserId,
        enumeration: Enumeration,
        reason: RebuildReason,
        has_unknown_default: bool,
    ) -> Arc<CatalogSnapshot> {
        let services = {
            let settings = self.settings.lock();
            merge(&enumeration, settings.user(user_id))
        };
        let filters = self.filter_index.lock().rebuild(user_id, &services);
        let snapshot = Arc::new(CatalogSnapshot {
            user_id,
            services,
            filters,
            has_unknown_default,
        });

        self.catalogs.write().insert(
            user_id,
            UserCatalog {
                enumeration,
                snapshot: snapshot.clone(),
            },
        );

        CATALOG_REBUILDS.with_label_values(&[reason.as_str()]).inc();
        CATALOG_SERVICES
            .with_label_values(&[user_id.to_string().as_str()])
            .set(snapshot.len() as f64);
        info!(
            user_id,
            services = snapshot.len(),
            has_unknown_default,
            reason = reason.as_str(),
            "Catalog published"
        );

        self.callback.on_services_updated(snapshot.clone());
        snapshot
    }

    /// Runs a settings mutation for one installed service: validate, mutate,
    /// persist, republish. A failed write restores the previous settings.
    fn mutate<F>(
        &self,
        user_id: UserId,
        component: &ComponentName,
        store: Store,
        apply: F,
    ) -> Result<(), RegistryError>
    where
        F: FnOnce(&ServiceDescriptor, &mut UserSettings) -> Result<(), RegistryError>,
    {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock();

        let (enumeration, service) = {
            let catalogs = self.catalogs.read();
            let catalog = catalogs
                .get(&user_id)
                .ok_or(RegistryError::UserUnavailable(user_id))?;
            let service = catalog.snapshot.service(component).cloned().ok_or_else(|| {
                RegistryError::UnknownService {
                    user_id,
                    component: component.clone(),
                }
            })?;
            (catalog.enumeration.clone(), service)
        };

        {
            let mut settings = self.settings.lock();
            let previous = settings.clone();
            if let Err(e) = apply(service.as_ref(), settings.user_mut(user_id)) {
                *settings = previous;
                return Err(e);
            }
            if let Err(e) = self.persist(&settings, store) {
                *settings = previous;
                return Err(e.into());
            }
        }

        debug!(user_id, component = %component, "Settings updated");
        self.publish(user_id, enumeration, RebuildReason::Registration, false);
        Ok(())
    }
}

/// Reads and decodes a store. Missing or malformed documents yield nothing.
fn read_store<T>(
    file: &dyn SettingsFile,
    decode: fn(&[u8]) -> Result<Vec<T>, StoreError>,
) -> Vec<T> {
    if !file.exists() {
        debug!(store = file.name(), "Settings store absent");
        return Vec::new();
    }
    match file.read().and_then(|bytes| decode(&bytes)) {
        Ok(entries) => entries,
        Err(e) => {
            PERSISTENCE_FAILURES
                .with_label_values(&[file.name(), "read"])
                .inc();
            warn!(store = file.name(), error = %e, "Ignoring unreadable settings store");
            Vec::new()
        }
    }
}

impl ServiceRegistryApi for ServiceRegistry {
    fn initialize(&self) -> Result<(), RegistryError> {
        self.load_settings();

        let current = self.profiles.current_user();
        for profile in self.profiles.enabled_profiles(current) {
            if self.profiles.is_quiet_mode(profile) {
                debug!(user_id = profile.id(), "Skipping quiet-mode profile");
                self.quiet.write().insert(profile.id());
                continue;
            }
            if let Err(e) = self.rebuild(profile.id(), RebuildReason::Initialize) {
                warn!(user_id = profile.id(), error = %e, "Profile not initialized");
            }
        }
        Ok(())
    }

    fn update_for_user(&self, user_id: UserId) -> Result<(), RegistryError> {
        if self.is_quiet(user_id) {
            debug!(user_id, "Ignoring update for quiet-mode profile");
            return Ok(());
        }
        self.rebuild(user_id, RebuildReason::UserUpdate).map(|_| ())
    }

    fn on_package_removed(&self, user_id: UserId, package: &str) -> Result<(), RegistryError> {
        if self.is_quiet(user_id) {
            return Ok(());
        }
        info!(user_id, package, "Package removed");
        self.rebuild(user_id, RebuildReason::PackageRemoved).map(|_| ())
    }

    fn on_external_storage_changed(&self) -> Result<(), RegistryError> {
        for user_id in self.users() {
            if let Err(e) = self.rebuild(user_id, RebuildReason::ExternalStorage) {
                warn!(user_id, error = %e, "Rebuild after storage change failed");
            }
        }
        Ok(())
    }

    fn remove_user(&self, user: UserHandle) {
        let user_id = user.id();
        let lock = self.user_lock(user_id);
        let _guard = lock.lock();

        let existed = self.catalogs.write().remove(&user_id).is_some();
        self.filter_index.lock().remove_user(user_id);
        if existed {
            CATALOG_SERVICES
                .with_label_values(&[user_id.to_string().as_str()])
                .set(0.0);
            info!(user_id, "Catalog purged");
            self.callback
                .on_services_updated(Arc::new(CatalogSnapshot::empty(user_id)));
        }
    }

    fn set_quiet_mode(&self, user: UserHandle, quiet: bool) -> Result<(), RegistryError> {
        if quiet {
            self.quiet.write().insert(user.id());
            self.remove_user(user);
            Ok(())
        } else {
            self.quiet.write().remove(&user.id());
            self.rebuild(user.id(), RebuildReason::UserUpdate).map(|_| ())
        }
    }

    fn register_aid_group(
        &self,
        user_id: UserId,
        component: &ComponentName,
        group: AidGroup,
    ) -> Result<(), RegistryError> {
        let group = validate_aid_group(&group)?;
        self.mutate(user_id, component, Store::Dynamic, |service, settings| {
            settings
                .override_mut(component, service.uid)
                .aid_groups
                .insert(group.category.clone(), group);
            Ok(())
        })
    }

    fn remove_aid_group(
        &self,
        user_id: UserId,
        component: &ComponentName,
        category: &str,
    ) -> Result<(), RegistryError> {
        validate_category(category)?;
        self.mutate(user_id, component, Store::Dynamic, |service, settings| {
            let removed = settings
                .overrides
                .get_mut(component)
                .filter(|o| o.uid == service.uid)
                .and_then(|o| o.aid_groups.remove(category))
                .is_some();
            if !removed {
                return Err(RegistryError::AidGroupNotFound {
                    component: component.clone(),
                    category: category.to_string(),
                });
            }
            settings.drop_if_empty(component);
            Ok(())
        })
    }

    fn set_off_host_secure_element(
        &self,
        user_id: UserId,
        component: &ComponentName,
        secure_element: &str,
    ) -> Result<(), RegistryError> {
        let secure_element = validate_secure_element(secure_element)?;
        self.mutate(user_id, component, Store::Dynamic, |service, settings| {
            if service.is_on_host() {
                return Err(RegistryError::NotOffHost(component.clone()));
            }
            settings.override_mut(component, service.uid).off_host_se = Some(secure_element);
            Ok(())
        })
    }

    fn unset_off_host_secure_element(
        &self,
        user_id: UserId,
        component: &ComponentName,
    ) -> Result<(), RegistryError> {
        self.mutate(user_id, component, Store::Dynamic, |service, settings| {
            if service.is_on_host() {
                return Err(RegistryError::NotOffHost(component.clone()));
            }
            if let Some(o) = settings
                .overrides
                .get_mut(component)
                .filter(|o| o.uid == service.uid)
            {
                o.off_host_se = None;
            }
            settings.drop_if_empty(component);
            Ok(())
        })
    }

    fn set_should_default_to_observe_mode(
        &self,
        user_id: UserId,
        component: &ComponentName,
        enabled: bool,
    ) -> Result<(), RegistryError> {
        self.mutate(user_id, component, Store::Dynamic, |service, settings| {
            settings
                .override_mut(component, service.uid)
                .should_default_to_observe_mode = Some(enabled.to_string());
            Ok(())
        })
    }

    fn register_polling_loop_filter(
        &self,
        user_id: UserId,
        component: &ComponentName,
        filter: &str,
        auto_transact: bool,
    ) -> Result<(), RegistryError> {
        let filter = normalize_exact_filter(filter)?;
        self.mutate(user_id, component, Store::Dynamic, |service, settings| {
            let filters = &mut settings
                .override_mut(component, service.uid)
                .polling_loop_filters;
            match filters.iter_mut().find(|f| f.filter == filter) {
                Some(existing) => existing.auto_transact = auto_transact,
                None => filters.push(PollingLoopFilter::new(&filter, auto_transact)),
            }
            Ok(())
        })
    }

    fn remove_polling_loop_filter(
        &self,
        user_id: UserId,
        component: &ComponentName,
        filter: &str,
    ) -> Result<(), RegistryError> {
        let filter = normalize_exact_filter(filter)?;
        self.mutate(user_id, component, Store::Dynamic, |service, settings| {
            let removed = settings
                .overrides
                .get_mut(component)
                .filter(|o| o.uid == service.uid)
                .map(|o| {
                    let before = o.polling_loop_filters.len();
                    o.polling_loop_filters.retain(|f| f.filter != filter);
                    before != o.polling_loop_filters.len()
                })
                .unwrap_or(false);
            if !removed {
                return Err(RegistryError::FilterNotFound {
                    component: component.clone(),
                    filter: filter.clone(),
                });
            }
            settings.drop_if_empty(component);
            Ok(())
        })
    }

    fn register_polling_loop_pattern_filter(
        &self,
        user_id: UserId,
        component: &ComponentName,
        pattern: &str,
        auto_transact: bool,
    ) -> Result<(), RegistryError> {
        let pattern = normalize_pattern(pattern)?;
        self.mutate(user_id, component, Store::Dynamic, |service, settings| {
            let patterns = &mut settings.override_mut(component, service.uid).pattern_filters;
            match patterns.iter_mut().find(|p| p.pattern == pattern) {
                Some(existing) => existing.auto_transact = auto_transact,
                None => patterns.push(PatternFilter::new(&pattern, auto_transact)),
            }
            Ok(())
        })
    }

    fn remove_polling_loop_pattern_filter(
        &self,
        user_id: UserId,
        component: &ComponentName,
        pattern: &str,
    ) -> Result<(), RegistryError> {
        let pattern = normalize_pattern(pattern)?;
        self.mutate(user_id, component, Store::Dynamic, |service, settings| {
            let removed = settings
                .overrides
                .get_mut(component)
                .filter(|o| o.uid == service.uid)
                .map(|o| {
                    let before = o.pattern_filters.len();
                    o.pattern_filters.retain(|p| p.pattern != pattern);
                    before != o.pattern_filters.len()
                })
                .unwrap_or(false);
            if !removed {
                return Err(RegistryError::FilterNotFound {
                    component: component.clone(),
                    filter: pattern.clone(),
                });
            }
            settings.drop_if_empty(component);
            Ok(())
        })
    }

    fn set_service_enabled_for_category_other(
        &self,
        user_id: UserId,
        component: &ComponentName,
        enabled: bool,
    ) -> Result<(), RegistryError> {
        self.mutate(user_id, component, Store::Other, |service, settings| {
            if !service.has_category(categories::OTHER) {
                return Err(RegistryError::NotInCategory {
                    component: component.clone(),
                    category: categories::OTHER.to_string(),
                });
            }
            settings.others.insert(
                component.clone(),
                crate::domain::OtherServiceStatus {
                    uid: service.uid,
                    checked: enabled,
                },
            );
            Ok(())
        })
    }

    fn services(&self, user_id: UserId) -> Vec<Arc<ServiceDescriptor>> {
        self.catalogs
            .read()
            .get(&user_id)
            .map(|c| c.snapshot.services.clone())
            .unwrap_or_default()
    }

    fn service(&self, user_id: UserId, component: &ComponentName) -> Option<Arc<ServiceDescriptor>> {
        self.catalogs
            .read()
            .get(&user_id)
            .and_then(|c| c.snapshot.service(component).cloned())
    }

    fn snapshot(&self, user_id: UserId) -> Option<Arc<CatalogSnapshot>> {
        self.catalogs
            .read()
            .get(&user_id)
            .map(|c| c.snapshot.clone())
    }
}
