//! Domain layer: settings model, persistence codec, validation and catalog
//! merge. No I/O.

pub mod catalog;
pub mod codec;
pub mod settings;
pub mod validation;

pub use catalog::{merge, CatalogSnapshot, Enumeration};
pub use settings::{DynamicOverride, OtherServiceStatus, SettingsState, UserSettings};
