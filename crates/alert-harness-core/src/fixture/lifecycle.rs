// crates/alert-harness-core/src/fixture/lifecycle.rs
// ============================================================================
// Module: Fixture Lifecycle
// Description: Reuse-aware acquire/release of shared test resources.
// Purpose: Apply one state table to every network, container, and connection.
// Dependencies: async-trait, serde, tracing
// ============================================================================

//! ## Overview
//! [`FixtureStack::wrap`] acquires a resource through a [`ResourceFactory`]
//! according to [`LifecycleFlags`] and records how to release it.
//! [`FixtureStack::teardown`] releases everything in reverse acquisition order.
//!
//! | reuse | teardown_only | setup | teardown |
//! |---|---|---|---|
//! | no  | no  | create | delete |
//! | yes | no  | restore on hit, else create and cache | keep |
//! | no  | yes | empty placeholder | delete cached entry, clear it |
//! | yes | yes | restore on hit, else fail | delete cached entry, clear it |
//!
//! Invariants:
//! - At most one `create` and one `delete` per key and run.
//! - `create` failures propagate; `delete` failures are logged and swallowed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use alert_harness_config::LifecycleConfig;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::HarnessError;
use crate::error::Result;
use crate::fixture::cache::ResourceCache;

// ============================================================================
// SECTION: Flags
// ============================================================================

/// The two lifecycle switches read from the invoking environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleFlags {
    /// Keep resources alive across runs.
    pub reuse: bool,
    /// Only release resources left behind by earlier reuse runs.
    pub teardown_only: bool,
}

impl LifecycleFlags {
    /// Builds flags from explicit values.
    #[must_use]
    pub const fn new(reuse: bool, teardown_only: bool) -> Self {
        Self {
            reuse,
            teardown_only,
        }
    }

    /// Builds flags from harness configuration.
    #[must_use]
    pub const fn from_config(config: &LifecycleConfig) -> Self {
        Self::new(config.reuse, config.teardown_only)
    }

    /// Returns true when resources must outlive this process.
    #[must_use]
    pub const fn persistent(self) -> bool {
        self.reuse || self.teardown_only
    }
}

// ============================================================================
// SECTION: Factory Contract
// ============================================================================

/// Knows how to produce, release, and persist one kind of resource.
#[async_trait]
pub trait ResourceFactory: Send + Sync {
    /// Live resource handle.
    type Resource: Clone + Send + Sync + 'static;
    /// Serializable form stored in the resource cache.
    type Descriptor: Serialize + DeserializeOwned + Send + 'static;

    /// Returns a zero-valued placeholder used when nothing is created.
    fn empty(&self) -> Self::Resource;

    /// Creates a live resource.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the resource cannot be created.
    async fn create(&self) -> Result<Self::Resource>;

    /// Releases a live resource.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the release fails.
    async fn delete(&self, resource: Self::Resource) -> Result<()>;

    /// Rebuilds a handle from a cached descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the descriptor cannot be used.
    async fn restore(&self, descriptor: Self::Descriptor) -> Result<Self::Resource>;

    /// Produces the cache descriptor for a live resource.
    fn describe(&self, resource: &Self::Resource) -> Self::Descriptor;
}

// ============================================================================
// SECTION: Fixture Stack
// ============================================================================

/// Boxed release action.
type TeardownFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Release action registered by [`FixtureStack::wrap`].
struct PendingTeardown {
    /// Cache namespace of the resource.
    key: String,
    /// Deferred release.
    run: Box<dyn FnOnce() -> TeardownFuture + Send>,
}

/// Ordered set of acquired resources for one run.
pub struct FixtureStack {
    /// Lifecycle switches.
    flags: LifecycleFlags,
    /// Descriptor cache shared by every wrapped resource.
    cache: Arc<ResourceCache>,
    /// Release actions in acquisition order.
    pending: Vec<PendingTeardown>,
}

impl FixtureStack {
    /// Creates an empty stack.
    #[must_use]
    pub const fn new(flags: LifecycleFlags, cache: Arc<ResourceCache>) -> Self {
        Self {
            flags,
            cache,
            pending: Vec::new(),
        }
    }

    /// Returns the lifecycle switches.
    #[must_use]
    pub const fn flags(&self) -> LifecycleFlags {
        self.flags
    }

    /// Returns the number of registered release actions.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Acquires the resource for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when creation or restoration fails, or when
    /// reuse plus teardown-only finds no cached entry.
    pub async fn wrap<F>(&mut self, key: &str, factory: Arc<F>) -> Result<F::Resource>
    where
        F: ResourceFactory + 'static,
    {
        let LifecycleFlags {
            reuse,
            teardown_only,
        } = self.flags;
        match (reuse, teardown_only) {
            (false, false) => {
                let resource = factory.create().await?;
                info!(key, "created resource");
                let handle = resource.clone();
                let release = Arc::clone(&factory);
                self.push(key, move |key| {
                    Box::pin(async move {
                        match release.delete(handle).await {
                            Ok(()) => info!(key = %key, "deleted resource"),
                            Err(err) => warn!(key = %key, error = %err, "resource delete failed"),
                        }
                    })
                });
                Ok(resource)
            }
            (true, false) => {
                if let Some(resource) = self.restore_cached(key, factory.as_ref()).await? {
                    info!(key, "reusing cached resource");
                    return Ok(resource);
                }
                let resource = factory.create().await?;
                let descriptor = serde_json::to_value(factory.describe(&resource))?;
                self.cache.set(key, descriptor)?;
                info!(key, "created resource for reuse");
                Ok(resource)
            }
            (false, true) => {
                self.push_cached_teardown(key, Arc::clone(&factory));
                Ok(factory.empty())
            }
            (true, true) => {
                let resource =
                    self.restore_cached(key, factory.as_ref()).await?.ok_or_else(|| {
                        HarnessError::SetupFatal(format!(
                            "no cached resource for {key} in {}",
                            self.cache.path().display()
                        ))
                    })?;
                self.push_cached_teardown(key, factory);
                Ok(resource)
            }
        }
    }

    /// Runs every registered release action in reverse acquisition order.
    /// Failures are logged; nothing is raised.
    pub async fn teardown(&mut self) {
        while let Some(entry) = self.pending.pop() {
            debug!(key = %entry.key, "tearing down resource");
            (entry.run)().await;
        }
    }

    fn push<G>(&mut self, key: &str, make: G)
    where
        G: FnOnce(String) -> TeardownFuture + Send + 'static,
    {
        let owned = key.to_string();
        let for_run = owned.clone();
        self.pending.push(PendingTeardown {
            key: owned,
            run: Box::new(move || make(for_run)),
        });
    }

    async fn restore_cached<F>(&self, key: &str, factory: &F) -> Result<Option<F::Resource>>
    where
        F: ResourceFactory,
    {
        let Some(entry) = self.cache.get(key)? else {
            return Ok(None);
        };
        let descriptor: F::Descriptor = serde_json::from_value(entry)?;
        factory.restore(descriptor).await.map(Some)
    }

    /// Registers "delete whatever the cache holds for `key`, then forget it".
    fn push_cached_teardown<F>(&mut self, key: &str, factory: Arc<F>)
    where
        F: ResourceFactory + 'static,
    {
        let cache = Arc::clone(&self.cache);
        self.push(key, move |key| {
            Box::pin(async move {
                let entry = match cache.get(&key) {
                    Ok(Some(entry)) => entry,
                    Ok(None) => {
                        debug!(key = %key, "nothing cached; skipping delete");
                        return;
                    }
                    Err(err) => {
                        warn!(key = %key, error = %err, "resource cache unreadable");
                        return;
                    }
                };
                let restored = match serde_json::from_value::<F::Descriptor>(entry) {
                    Ok(descriptor) => factory.restore(descriptor).await,
                    Err(err) => Err(err.into()),
                };
                match restored {
                    Ok(resource) => match factory.delete(resource).await {
                        Ok(()) => info!(key = %key, "deleted cached resource"),
                        Err(err) => warn!(key = %key, error = %err, "resource delete failed"),
                    },
                    Err(err) => warn!(key = %key, error = %err, "cached resource not restorable"),
                }
                if let Err(err) = cache.remove(&key) {
                    warn!(key = %key, error = %err, "failed to clear cache entry");
                }
            })
        });
    }
}

impl Drop for FixtureStack {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            warn!(pending = self.pending.len(), "fixture stack dropped before teardown");
        }
    }
}
