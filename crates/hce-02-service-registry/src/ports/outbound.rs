//! # Outbound Ports (Driven Ports)
//!
//! Dependencies required by the service registry.
//!
//! Production: platform bindings in the runtime, `AtomicSettingsFile`.
//! Testing: in-memory adapters in `crate::adapters::memory`.

use std::sync::Arc;

use shared_types::{PlatformError, ServiceDescriptor, ServiceKind, UserHandle};

use crate::domain::CatalogSnapshot;
use crate::error::StoreError;

/// Enumerates installed emulation services.
pub trait ServicePlatform: Send + Sync {
    /// Services of one kind installed for `user`, in platform order.
    fn list_services(
        &self,
        user: UserHandle,
        kind: ServiceKind,
    ) -> Result<Vec<ServiceDescriptor>, PlatformError>;

    /// Whether `package` holds the NFC permission for `user`.
    fn has_nfc_permission(&self, package: &str, user: UserHandle) -> Result<bool, PlatformError>;
}

/// User and profile enumeration.
pub trait UserProfiles: Send + Sync {
    /// The foreground user.
    fn current_user(&self) -> UserHandle;

    /// Enabled profiles of `user`, including `user` itself.
    fn enabled_profiles(&self, user: UserHandle) -> Vec<UserHandle>;

    fn is_quiet_mode(&self, profile: UserHandle) -> bool;
}

/// A single durable settings document.
pub trait SettingsFile: Send + Sync {
    /// Store name, used in logs and metrics.
    fn name(&self) -> &str;

    fn exists(&self) -> bool;

    fn read(&self) -> Result<Vec<u8>, StoreError>;

    /// Replaces the whole document. Readers never observe a partial write.
    fn atomic_write(&self, bytes: &[u8]) -> Result<(), StoreError>;
}

/// Receives every published catalog.
///
/// Called with the user's mutation lock held; implementations must not call
/// back into a mutating registry operation for the same user.
pub trait ServicesCallback: Send + Sync {
    fn on_services_updated(&self, snapshot: Arc<CatalogSnapshot>);
}

impl<F> ServicesCallback for F
where
    F: Fn(Arc<CatalogSnapshot>) + Send + Sync,
{
    fn on_services_updated(&self, snapshot: Arc<CatalogSnapshot>) {
        self(snapshot)
    }
}
