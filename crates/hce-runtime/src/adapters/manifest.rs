//! # Manifest Platform
//!
//! A `ServicePlatform` backed by a JSON document listing installed services:
//!
//! ```json
//! {
//!   "version": 1,
//!   "services": [
//!     {
//!       "component": { "package": "com.example.pay", "class": "com.example.pay.Hce" },
//!       "kind": "OnHost",
//!       "uid": 10123,
//!       "static_aid_groups": [{ "category": "payment", "aids": ["A0000000041010"] }],
//!       "nfc_permission": true
//!     }
//!   ]
//! }
//! ```
//!
//! `user_id` defaults to the user owning `uid`.

use std::fs;
use std::path::Path;

use hce_02_service_registry::ServicePlatform;
use serde::Deserialize;
use shared_types::{user_id_for_uid, PlatformError, ServiceDescriptor, ServiceKind, UserHandle};
use thiserror::Error;
use tracing::debug;

pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {message}")]
    Io { path: String, message: String },

    #[error("Malformed manifest: {0}")]
    Malformed(String),

    #[error("Unsupported manifest version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

#[derive(Debug, Deserialize)]
struct ManifestDocument {
    version: u32,
    #[serde(default)]
    services: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(flatten)]
    service: ServiceDescriptor,
    #[serde(default = "granted")]
    nfc_permission: bool,
}

fn granted() -> bool {
    true
}

/// Installed services read once from a manifest.
#[derive(Debug, Default)]
pub struct ManifestPlatform {
    entries: Vec<ManifestEntry>,
}

impl ManifestPlatform {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let bytes = fs::read(path).map_err(|e| ManifestError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        let document: ManifestDocument =
            serde_json::from_slice(bytes).map_err(|e| ManifestError::Malformed(e.to_string()))?;
        if document.version != MANIFEST_VERSION {
            return Err(ManifestError::UnsupportedVersion {
                found: document.version,
                expected: MANIFEST_VERSION,
            });
        }

        let mut entries = document.services;
        for entry in &mut entries {
            if entry.service.user_id == 0 {
                entry.service.user_id = user_id_for_uid(entry.service.uid);
            }
        }
        debug!(services = entries.len(), "Manifest loaded");
        Ok(Self { entries })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ServicePlatform for ManifestPlatform {
    fn list_services(
        &self,
        user: UserHandle,
        kind: ServiceKind,
    ) -> Result<Vec<ServiceDescriptor>, PlatformError> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.service.user_id == user.id() && e.service.kind == kind)
            .map(|e| e.service.clone())
            .collect())
    }

    fn has_nfc_permission(&self, package: &str, user: UserHandle) -> Result<bool, PlatformError> {
        let mut entries = self
            .entries
            .iter()
            .filter(|e| e.service.user_id == user.id() && e.service.component.package() == package)
            .peekable();
        if entries.peek().is_none() {
            return Err(PlatformError::PackageNotFound(package.to_string()));
        }
        Ok(entries.all(|e| e.nfc_permission))
    }
}
