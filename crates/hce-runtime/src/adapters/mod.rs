//! Platform adapters for the runtime binary.

pub mod logging;
pub mod manifest;

pub use logging::{LoggingBinder, LoggingObserveMode, LoggingResponder};
pub use manifest::{ManifestError, ManifestPlatform, MANIFEST_VERSION};
