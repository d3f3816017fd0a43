//! # Shared Types Crate
//!
//! Domain entities shared by every card-emulation subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: component identities, user handles, service
//!   descriptors and polling frames are defined once, here.
//! - **Immutable Snapshots**: a `ServiceDescriptor` is never mutated after a
//!   registry rebuild publishes it; consumers hold `Arc` snapshots.
//! - **Uppercase Hex**: every identifier that is derived from raw bytes (AIDs,
//!   polling-loop filters) is normalized to uppercase hex at the boundary.

pub mod entities;
pub mod errors;
pub mod frames;

pub use entities::*;
pub use errors::*;
pub use frames::*;
