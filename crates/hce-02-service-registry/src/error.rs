//! # Registry Errors
//!
//! - Validation errors reject a registration before anything changes.
//! - Store errors are logged; a failed write rolls the in-memory change back.
//! - Platform errors keep the previous catalog.

use shared_types::{ComponentName, PlatformError, UserId};
use thiserror::Error;

/// Errors from a settings store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Settings I/O error on {store}: {message}")]
    Io { store: String, message: String },

    #[error("Settings store {0} is locked")]
    Locked(String),

    #[error("Malformed settings document: {0}")]
    Malformed(String),

    #[error("Unsupported settings version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Failed to encode settings: {0}")]
    Encode(String),
}

/// Errors returned by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unknown service {component} for user {user_id}")]
    UnknownService {
        user_id: UserId,
        component: ComponentName,
    },

    #[error("Invalid AID: {0}")]
    InvalidAid(String),

    #[error("AID group is empty")]
    EmptyAidGroup,

    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    #[error("Invalid polling loop filter: {0}")]
    InvalidFilter(#[from] hce_01_filter_index::FilterError),

    #[error("Invalid secure element: {0}")]
    InvalidSecureElement(String),

    #[error("Service {0} runs on host; a secure element applies only to off-host services")]
    NotOffHost(ComponentName),

    #[error("No dynamic {category} AID group registered for {component}")]
    AidGroupNotFound {
        component: ComponentName,
        category: String,
    },

    #[error("Filter {filter} is not registered for {component}")]
    FilterNotFound {
        component: ComponentName,
        filter: String,
    },

    #[error("Service {component} has no {category} AID group")]
    NotInCategory {
        component: ComponentName,
        category: String,
    },

    #[error("User {0} is not available (quiet mode or not initialized)")]
    UserUnavailable(UserId),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}
