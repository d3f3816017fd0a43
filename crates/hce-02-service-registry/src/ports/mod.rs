//! # Ports Layer
//!
//! - `inbound`: the registry API driven by the platform and applications
//! - `outbound`: collaborators the host must provide

pub mod inbound;
pub mod outbound;

pub use inbound::ServiceRegistryApi;
pub use outbound::{ServicePlatform, ServicesCallback, SettingsFile, UserProfiles};
