// crates/alert-harness-config/src/lib.rs
// ============================================================================
// Module: Alert Harness Config Library
// Description: Canonical harness configuration model and validation.
// Purpose: Single source of truth for lifecycle flags, endpoints, and credentials.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! `alert-harness-config` defines the configuration consumed by the alert
//! harness. Values come from an optional TOML file and are then overridden by
//! `ALERT_HARNESS_*` environment variables. Loading is strict and fails closed
//! on empty values, invalid UTF-8, malformed URLs, and zero timeouts.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
mod env;

#[cfg(test)]
mod env_tests;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use env::HarnessEnv;
pub use env::parse_bool;
pub use env::parse_timeout_seconds;
pub use env::read_env_nonempty;
pub use env::read_env_strict;
