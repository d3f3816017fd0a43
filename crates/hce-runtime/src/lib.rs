//! # HCE Runtime
//!
//! Wires the card-emulation routing core into one `CardEmulationContext`.
//!
//! ## Modular Structure
//!
//! - `config.rs` - `RuntimeConfig`, defaults and `HCE_*` overrides
//! - `context.rs` - registry, dispatcher task and event bus, built once
//! - `adapters/` - JSON manifest platform and logging stand-ins for the radio
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (from env)
//! 2. Initialize telemetry
//! 3. Load the service manifest as the platform
//! 4. Spawn the dispatcher, then initialize the registry so the first
//!    catalogs reach it
//! 5. Run until Ctrl+C, then drain the dispatcher queue

pub mod adapters;
pub mod config;
pub mod context;

pub use config::{ConfigError, RuntimeConfig};
pub use context::{file_stores, CardEmulationContext, ContextDependencies};
