// system-tests/src/lib.rs
// ============================================================================
// Module: Alert Harness System Tests Library
// Description: Shared configuration for end-to-end alert test suites.
// Purpose: Provide common settings for the system-test binaries.
// Dependencies: std
// ============================================================================

//! ## Overview
//! This crate hosts shared configuration used by the alert harness
//! system-test binaries in `system-tests/tests`. The binaries start (or reuse)
//! the full container stack and are compiled only with the `system-tests`
//! feature.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
