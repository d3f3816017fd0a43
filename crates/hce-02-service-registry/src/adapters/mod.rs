//! # Adapters
//!
//! - `file_store`: settings persisted to disk (feature `file-store`)
//! - `memory`: in-memory stores, platform and profiles for tests and demos

#[cfg(feature = "file-store")]
pub mod file_store;
pub mod memory;

#[cfg(feature = "file-store")]
pub use file_store::AtomicSettingsFile;
pub use memory::{
    CollectingCallback, MemorySettingsFile, StaticServicePlatform, StaticUserProfiles,
};
