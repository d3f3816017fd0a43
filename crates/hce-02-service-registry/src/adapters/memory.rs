//! # In-Memory Adapters
//!
//! Constructor-injected fakes for every outbound port. Used by unit tests,
//! the workspace integration suite and the manifest-driven runtime.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use shared_types::{PlatformError, ServiceDescriptor, ServiceKind, UserHandle, UserId};

use crate::domain::CatalogSnapshot;
use crate::error::StoreError;
use crate::ports::outbound::{ServicePlatform, ServicesCallback, SettingsFile, UserProfiles};

// =============================================================================
// SETTINGS
// =============================================================================

/// Settings document held in memory.
#[derive(Debug)]
pub struct MemorySettingsFile {
    name: String,
    contents: Mutex<Option<Vec<u8>>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemorySettingsFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: Mutex::new(None),
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn with_contents(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        let file = Self::new(name);
        *file.contents.lock() = Some(contents.into());
        file
    }

    /// Makes every following write fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.contents.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl SettingsFile for MemorySettingsFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self) -> bool {
        self.contents.lock().is_some()
    }

    fn read(&self) -> Result<Vec<u8>, StoreError> {
        self.contents.lock().clone().ok_or_else(|| StoreError::Io {
            store: self.name.clone(),
            message: "not found".into(),
        })
    }

    fn atomic_write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                store: self.name.clone(),
                message: "write refused".into(),
            });
        }
        *self.contents.lock() = Some(bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// PLATFORM
// =============================================================================

/// Fixed set of installed services.
#[derive(Debug, Default)]
pub struct StaticServicePlatform {
    services: RwLock<HashMap<(UserId, ServiceKind), Vec<ServiceDescriptor>>>,
    denied_packages: RwLock<HashSet<String>>,
    unavailable: AtomicBool,
    list_calls: Mutex<Vec<(UserHandle, ServiceKind)>>,
    permission_checks: Mutex<Vec<String>>,
}

impl StaticServicePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a service for its `user_id` under its kind.
    pub fn install(&self, service: ServiceDescriptor) {
        self.services
            .write()
            .entry((service.user_id, service.kind))
            .or_default()
            .push(service);
    }

    /// Uninstalls every service of `package` for `user_id`.
    pub fn uninstall_package(&self, user_id: UserId, package: &str) {
        for ((user, _), services) in self.services.write().iter_mut() {
            if *user == user_id {
                services.retain(|s| s.component.package() != package);
            }
        }
    }

    pub fn deny_permission(&self, package: impl Into<String>) {
        self.denied_packages.write().insert(package.into());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> Vec<(UserHandle, ServiceKind)> {
        self.list_calls.lock().clone()
    }

    pub fn permission_checks(&self) -> Vec<String> {
        self.permission_checks.lock().clone()
    }
}

impl ServicePlatform for StaticServicePlatform {
    fn list_services(
        &self,
        user: UserHandle,
        kind: ServiceKind,
    ) -> Result<Vec<ServiceDescriptor>, PlatformError> {
        self.list_calls.lock().push((user, kind));
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PlatformError::Unavailable("package manager".into()));
        }
        Ok(self
            .services
            .read()
            .get(&(user.id(), kind))
            .cloned()
            .unwrap_or_default())
    }

    fn has_nfc_permission(&self, package: &str, _user: UserHandle) -> Result<bool, PlatformError> {
        self.permission_checks.lock().push(package.to_string());
        Ok(!self.denied_packages.read().contains(package))
    }
}

// =============================================================================
// USERS
// =============================================================================

/// Fixed current user with a mutable set of profiles.
#[derive(Debug)]
pub struct StaticUserProfiles {
    current: UserHandle,
    profiles: RwLock<Vec<UserHandle>>,
    quiet: RwLock<HashSet<UserId>>,
}

impl StaticUserProfiles {
    /// Only `current` is enabled.
    pub fn new(current: UserHandle) -> Self {
        Self {
            current,
            profiles: RwLock::new(vec![current]),
            quiet: RwLock::new(HashSet::new()),
        }
    }

    #[must_use]
    pub fn with_profile(self, profile: UserHandle) -> Self {
        self.profiles.write().push(profile);
        self
    }

    pub fn set_quiet(&self, profile: UserHandle, quiet: bool) {
        if quiet {
            self.quiet.write().insert(profile.id());
        } else {
            self.quiet.write().remove(&profile.id());
        }
    }
}

impl UserProfiles for StaticUserProfiles {
    fn current_user(&self) -> UserHandle {
        self.current
    }

    fn enabled_profiles(&self, user: UserHandle) -> Vec<UserHandle> {
        if user == self.current {
            self.profiles.read().clone()
        } else {
            vec![user]
        }
    }

    fn is_quiet_mode(&self, profile: UserHandle) -> bool {
        self.quiet.read().contains(&profile.id())
    }
}

// =============================================================================
// CALLBACK
// =============================================================================

/// Records every published snapshot.
#[derive(Debug, Default)]
pub struct CollectingCallback {
    snapshots: Mutex<Vec<Arc<CatalogSnapshot>>>,
}

impl CollectingCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<Arc<CatalogSnapshot>> {
        self.snapshots.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn last_for(&self, user_id: UserId) -> Option<Arc<CatalogSnapshot>> {
        self.snapshots
            .lock()
            .iter()
            .rev()
            .find(|s| s.user_id == user_id)
            .cloned()
    }

    pub fn clear(&self) {
        self.snapshots.lock().clear();
    }
}

impl ServicesCallback for CollectingCallback {
    fn on_services_updated(&self, snapshot: Arc<CatalogSnapshot>) {
        self.snapshots.lock().push(snapshot);
    }
}
