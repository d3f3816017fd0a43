//! # Error Types
//!
//! Errors shared across subsystems.

use thiserror::Error;

/// Errors parsing identities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Not of the form `package/class`.
    #[error("Invalid component name: {0}")]
    InvalidComponentName(String),
}

/// Failures reported by platform collaborators (package manager, user
/// manager, radio controller). Always transient from the core's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The platform service could not be reached.
    #[error("Platform unavailable: {0}")]
    Unavailable(String),

    /// A package disappeared while it was being queried.
    #[error("Package not found: {0}")]
    PackageNotFound(String),

    /// The permission check itself failed (not a denial).
    #[error("Permission check failed for {package}: {reason}")]
    PermissionCheckFailed { package: String, reason: String },
}
