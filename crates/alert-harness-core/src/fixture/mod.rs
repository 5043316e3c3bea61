// crates/alert-harness-core/src/fixture/mod.rs
// ============================================================================
// Module: Fixture Lifecycle Manager
// Description: Reuse-aware resource acquisition with a persistent cache.
// Purpose: Give every shared dependency the same acquire/release semantics.
// Dependencies: crate::error
// ============================================================================

//! ## Overview
//! The fixture layer wraps networks, containers, and connections so that a
//! developer can keep them alive between runs (`reuse`) and later release
//! them in a dedicated run (`teardown_only`).

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cache;
pub mod lifecycle;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cache::ResourceCache;
pub use lifecycle::FixtureStack;
pub use lifecycle::LifecycleFlags;
pub use lifecycle::ResourceFactory;
