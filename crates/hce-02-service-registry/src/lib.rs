//! # Service Registry (hce-02)
//!
//! The authoritative, per-user catalog of card-emulation services. Each
//! catalog merges what the platform reports as installed with what services
//! registered at runtime, and is republished as an immutable snapshot after
//! every change.
//!
//! ## Architecture
//!
//! ```text
//! ServicePlatform ──enumerate──→ ┐
//!                                ├──→ merge ──→ CatalogSnapshot ──→ ServicesCallback
//! SettingsFile (x2) ──decode───→ ┘              (services + FilterTable)
//!          ↑
//!          └──── atomic_write ←── registration calls
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Permission | Services whose package lacks the NFC permission never appear |
//! | 2 | Ordering | On-host services precede off-host services |
//! | 3 | Durability | A registration succeeds only once its store is written |
//! | 4 | Ownership | Settings apply only while the owning uid matches |
//! | 5 | Quiet Mode | Quiet profiles have no catalog |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Validation, settings model, codec, catalog merge
//! - `ports/` - Inbound API and outbound SPI
//! - `adapters/` - File-backed settings store and in-memory fakes
//! - `service.rs` - `ServiceRegistry`, implementing the API
//!
//! ## Usage
//!
//! ```ignore
//! use hce_02_service_registry::{ServiceRegistry, ServiceRegistryApi};
//!
//! let registry = ServiceRegistry::new(platform, profiles, dynamic, others, callback);
//! registry.initialize()?;
//! registry.register_aid_group(0, &component, AidGroup::new("payment", ["A000000004101001"]))?;
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::{
    merge, CatalogSnapshot, DynamicOverride, Enumeration, OtherServiceStatus, SettingsState,
    UserSettings,
};
pub use error::{RegistryError, StoreError};
pub use ports::inbound::ServiceRegistryApi;
pub use ports::outbound::{ServicePlatform, ServicesCallback, SettingsFile, UserProfiles};
pub use service::{RebuildReason, ServiceRegistry, DYNAMIC_SETTINGS_FILE, OTHER_STATUS_FILE};

#[cfg(feature = "file-store")]
pub use adapters::AtomicSettingsFile;
pub use adapters::{CollectingCallback, MemorySettingsFile, StaticServicePlatform, StaticUserProfiles};
