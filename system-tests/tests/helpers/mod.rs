// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for alert harness system-tests.
// Purpose: Provide the stack harness, seed scenarios, and artifact utilities.
// Dependencies: system-tests, alert-harness-core
// ============================================================================

//! ## Overview
//! Shared helpers for alert harness system-tests.
//! Invariants:
//! - Every suite tears down what it provisioned, including installed rules.
//! - Each test writes a summary even when it panics.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod artifacts;
pub mod harness;
pub mod scenarios;
pub mod timeouts;
