//! # Inbound Ports (Driving Ports)
//!
//! The API the platform (package/user events) and applications
//! (registration calls) drive the registry through.

use std::sync::Arc;

use shared_types::{AidGroup, ComponentName, ServiceDescriptor, UserHandle, UserId};

use crate::domain::CatalogSnapshot;
use crate::error::RegistryError;

pub trait ServiceRegistryApi: Send + Sync {
    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Loads both settings stores and builds a catalog for every eligible
    /// profile of the current user.
    fn initialize(&self) -> Result<(), RegistryError>;

    /// Re-enumerates one user and publishes the result.
    fn update_for_user(&self, user_id: UserId) -> Result<(), RegistryError>;

    /// Rebuild after a package was removed; stale settings are pruned.
    fn on_package_removed(&self, user_id: UserId, package: &str) -> Result<(), RegistryError>;

    /// Rebuild every known user.
    fn on_external_storage_changed(&self) -> Result<(), RegistryError>;

    /// Purges the user's catalog. Persisted settings are kept.
    fn remove_user(&self, user: UserHandle);

    /// Quiet profiles are purged and excluded until they resume.
    fn set_quiet_mode(&self, user: UserHandle, quiet: bool) -> Result<(), RegistryError>;

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    fn register_aid_group(
        &self,
        user_id: UserId,
        component: &ComponentName,
        group: AidGroup,
    ) -> Result<(), RegistryError>;

    fn remove_aid_group(
        &self,
        user_id: UserId,
        component: &ComponentName,
        category: &str,
    ) -> Result<(), RegistryError>;

    fn set_off_host_secure_element(
        &self,
        user_id: UserId,
        component: &ComponentName,
        secure_element: &str,
    ) -> Result<(), RegistryError>;

    fn unset_off_host_secure_element(
        &self,
        user_id: UserId,
        component: &ComponentName,
    ) -> Result<(), RegistryError>;

    fn set_should_default_to_observe_mode(
        &self,
        user_id: UserId,
        component: &ComponentName,
        enabled: bool,
    ) -> Result<(), RegistryError>;

    fn register_polling_loop_filter(
        &self,
        user_id: UserId,
        component: &ComponentName,
        filter: &str,
        auto_transact: bool,
    ) -> Result<(), RegistryError>;

    fn remove_polling_loop_filter(
        &self,
        user_id: UserId,
        component: &ComponentName,
        filter: &str,
    ) -> Result<(), RegistryError>;

    fn register_polling_loop_pattern_filter(
        &self,
        user_id: UserId,
        component: &ComponentName,
        pattern: &str,
        auto_transact: bool,
    ) -> Result<(), RegistryError>;

    fn remove_polling_loop_pattern_filter(
        &self,
        user_id: UserId,
        component: &ComponentName,
        pattern: &str,
    ) -> Result<(), RegistryError>;

    fn set_service_enabled_for_category_other(
        &self,
        user_id: UserId,
        component: &ComponentName,
        enabled: bool,
    ) -> Result<(), RegistryError>;

    // =========================================================================
    // QUERIES
    // =========================================================================

    fn services(&self, user_id: UserId) -> Vec<Arc<ServiceDescriptor>>;

    fn service(&self, user_id: UserId, component: &ComponentName) -> Option<Arc<ServiceDescriptor>>;

    fn snapshot(&self, user_id: UserId) -> Option<Arc<CatalogSnapshot>>;
}
