//! # Integration Scenarios
//!
//! Each module wires real components together with in-memory or
//! temp-directory adapters; nothing here reaches hardware.

mod flows;
mod persistence;
mod resolution;
