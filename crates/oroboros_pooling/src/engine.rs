//! # Pooling Engine
//!
//! Reuses host-created instances per resolved asset instead of creating and
//! destroying them on every spawn/despawn.
//!
//! ## Instance Lifecycle
//!
//! ```text
//!   create ──► Active ──despawn──► Free ──spawn──► Active ──► ...
//!                 │                  │
//!                 │ despawn,         │ clear / cap shrink /
//!                 │ free list full   │ auto-cleanup
//!                 ▼                  ▼
//!              Destroyed          Destroyed
//! ```
//!
//! An instance id is tracked in exactly one place at a time: the active set
//! of its pool, or that pool's free list. Active instances are only destroyed
//! by an explicit clear.
//!
//! ## Ordering
//!
//! - Spawn reuses the most recently freed instance.
//! - Cap shrinking and auto-cleanup destroy the oldest freed instance.
//! - Auto-cleanup drains the pool with the largest free list first; ties go
//!   to the lexicographically smallest pool key.
//!
//! ## Thread Safety
//!
//! One coarse `Mutex` guards the host and every pool. Host creation cost
//! dominates the lock, so nothing finer-grained is needed.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use oroboros_assets::{AssetHandle, RegistryManager, Resolved};

use crate::config::{cap, PoolConfig};
use crate::error::{PoolError, PoolResult};
use crate::host::{InstanceHost, InstanceId, Placement};

/// What happened to a despawned instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DespawnOutcome {
    /// Parked in the free list for reuse.
    Pooled,
    /// Destroyed: the free list was full, or the pool now serves a different asset.
    Destroyed,
}

/// Counters for one pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances handed out and not yet returned.
    pub active: usize,
    /// Instances waiting in the free list.
    pub pooled: usize,
    /// Instances ever created for this pool.
    pub created: u64,
    /// Instances ever destroyed from this pool.
    pub destroyed: u64,
    /// Free-list cap, `None` if uncapped.
    pub max_size: Option<usize>,
}

/// Free list and active set for one resolved asset.
#[derive(Debug)]
struct Pool {
    key: Arc<str>,
    asset: AssetHandle,
    /// Front = oldest freed.
    free: VecDeque<InstanceId>,
    active: HashSet<InstanceId>,
    max_size: Option<usize>,
    created: u64,
    destroyed: u64,
}

impl Pool {
    fn new(key: &str, asset: AssetHandle, max_size: Option<usize>) -> Self {
        Self {
            key: Arc::from(key),
            asset,
            free: VecDeque::new(),
            active: HashSet::new(),
            max_size,
            created: 0,
            destroyed: 0,
        }
    }

    #[inline]
    fn has_room(&self) -> bool {
        self.max_size.map_or(true, |max| self.free.len() < max)
    }

    #[inline]
    fn total(&self) -> usize {
        self.free.len() + self.active.len()
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            active: self.active.len(),
            pooled: self.free.len(),
            created: self.created,
            destroyed: self.destroyed,
            max_size: self.max_size,
        }
    }
}

/// Which pool an instance belongs to and which asset it was built from.
#[derive(Debug)]
struct Owner {
    pool: Arc<str>,
    asset: AssetHandle,
}

/// Everything behind the engine's lock.
struct PoolState<H> {
    host: H,
    config: PoolConfig,
    /// Sorted by key so cleanup order is deterministic.
    pools: BTreeMap<String, Pool>,
    owners: HashMap<InstanceId, Owner>,
    /// Spelling used at spawn/pre-warm time -> pool key. Keeps a pool
    /// reachable by that spelling after it stops resolving.
    aliases: HashMap<String, Arc<str>>,
}

impl<H: InstanceHost> PoolState<H> {
    /// Gets or creates the pool for `resolved`. A pool whose asset changed
    /// (an override was added or removed) drops its stale free instances.
    fn pool_for(&mut self, resolved: &Resolved, requested: &str) -> &mut Pool {
        let asset = resolved.entry.asset();
        let config = &self.config;
        let pool = self.pools.entry(resolved.key.clone()).or_insert_with(|| {
            let max_size = config.max_size_for(&resolved.key, requested);
            tracing::debug!(pool = %resolved.key, ?max_size, "pool created");
            Pool::new(&resolved.key, asset, max_size)
        });

        if pool.asset != asset {
            tracing::debug!(pool = %pool.key, stale = pool.free.len(), "pool asset changed, dropping free instances");
            for instance in pool.free.drain(..) {
                self.host.destroy_instance(instance);
                self.owners.remove(&instance);
                pool.destroyed += 1;
            }
            pool.asset = asset;
        }

        pool
    }

    /// Remembers that `requested` reached the pool under `key`.
    fn remember_alias(&mut self, requested: &str, key: &Arc<str>) {
        if requested == &**key {
            return;
        }
        if self.aliases.get(requested).map_or(true, |known| known != key) {
            self.aliases.insert(requested.to_string(), Arc::clone(key));
        }
    }

    /// Destroys every instance of a pool and forgets it.
    fn destroy_pool(&mut self, key: &str) -> usize {
        let Some(pool) = self.pools.remove(key) else {
            return 0;
        };

        let mut active: Vec<InstanceId> = pool.active.into_iter().collect();
        active.sort_unstable();
        let mut destroyed = 0;
        for instance in pool.free.into_iter().chain(active) {
            self.host.destroy_instance(instance);
            self.owners.remove(&instance);
            destroyed += 1;
        }

        self.aliases.retain(|_, pool| &**pool != key);
        tracing::debug!(pool = %key, destroyed, "pool cleared");
        destroyed
    }

    /// Destroys oldest-freed instances from the largest free lists until the
    /// total is back under the threshold or nothing free is left.
    fn enforce_threshold(&mut self) -> usize {
        let Some(threshold) = self.config.auto_cleanup_threshold else {
            return 0;
        };
        let mut total: usize = self.pools.values().map(Pool::total).sum();
        let mut evicted = 0;

        while total > threshold {
            let Some(pool) = self
                .pools
                .values_mut()
                .filter(|pool| !pool.free.is_empty())
                .min_by_key(|pool| Reverse(pool.free.len()))
            else {
                break;
            };
            let Some(instance) = pool.free.pop_front() else {
                break;
            };

            self.host.destroy_instance(instance);
            self.owners.remove(&instance);
            pool.destroyed += 1;
            total -= 1;
            evicted += 1;
        }

        if evicted > 0 {
            tracing::info!(evicted, total, threshold, "auto-cleanup destroyed pooled instances");
        }
        evicted
    }
}

/// Spawns and despawns pooled instances of registry assets.
pub struct PoolingEngine<H: InstanceHost> {
    manager: Arc<RegistryManager>,
    state: Mutex<PoolState<H>>,
}

impl<H: InstanceHost> PoolingEngine<H> {
    /// Creates an engine with no pools. Call [`PoolingEngine::shutdown`] to
    /// release every instance and get the host back.
    #[must_use]
    pub fn new(manager: Arc<RegistryManager>, host: H, config: PoolConfig) -> Self {
        tracing::info!(
            default_max_size = config.default_max_size,
            auto_cleanup_threshold = ?config.auto_cleanup_threshold,
            "pooling engine started"
        );

        Self {
            manager,
            state: Mutex::new(PoolState {
                host,
                config,
                pools: BTreeMap::new(),
                owners: HashMap::new(),
                aliases: HashMap::new(),
            }),
        }
    }

    /// The registry manager spawn targets are resolved against.
    #[must_use]
    pub fn manager(&self) -> &Arc<RegistryManager> {
        &self.manager
    }

    /// Runs `f` with shared access to the host.
    pub fn with_host<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        f(&self.state.lock().host)
    }

    // ========================================================================
    // Spawn / Despawn
    // ========================================================================

    /// Hands out an instance of `identifier` at `placement`, reusing a
    /// pooled one when available.
    ///
    /// # Errors
    ///
    /// - [`PoolError::AssetNotFound`] if `identifier` does not resolve.
    /// - [`PoolError::InstantiationFailed`] if the host cannot create one.
    pub fn spawn(&self, identifier: &str, placement: &Placement) -> PoolResult<InstanceId> {
        let resolved = self.resolve(identifier)?;
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let fresh = !state.pools.contains_key(&resolved.key);

        let pool = state.pool_for(&resolved, identifier);
        let key = Arc::clone(&pool.key);
        if let Some(instance) = pool.free.pop_back() {
            pool.active.insert(instance);
            state.host.place_instance(instance, placement);
            state.remember_alias(identifier, &key);
            return Ok(instance);
        }

        let asset = pool.asset;
        let instance = match state.host.create_instance(asset, placement) {
            Ok(instance) => instance,
            Err(reason) => {
                if fresh {
                    state.pools.remove(&*key);
                }
                tracing::warn!(identifier = %identifier, %reason, "host failed to create instance");
                return Err(PoolError::InstantiationFailed {
                    identifier: identifier.to_string(),
                    reason,
                });
            }
        };

        if let Some(pool) = state.pools.get_mut(&*key) {
            pool.active.insert(instance);
            pool.created += 1;
        }
        state.remember_alias(identifier, &key);
        state.owners.insert(instance, Owner { pool: key, asset });
        state.enforce_threshold();

        Ok(instance)
    }

    /// Returns an instance to its pool, or destroys it if the pool's free
    /// list is full.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::UnknownInstance`] if the instance is not active
    /// in any pool (never spawned, already despawned, or destroyed).
    pub fn despawn(&self, instance: InstanceId) -> PoolResult<DespawnOutcome> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let Some(owner) = state.owners.get(&instance) else {
            return Err(PoolError::UnknownInstance(instance));
        };
        let Some(pool) = state.pools.get_mut(&*owner.pool) else {
            return Err(PoolError::UnknownInstance(instance));
        };
        if !pool.active.remove(&instance) {
            return Err(PoolError::UnknownInstance(instance));
        }

        let reason = if pool.asset != owner.asset {
            "asset replaced"
        } else if pool.has_room() {
            pool.free.push_back(instance);
            state.host.park_instance(instance);
            return Ok(DespawnOutcome::Pooled);
        } else {
            "free list full"
        };

        tracing::debug!(pool = %pool.key, %instance, reason, "instance destroyed on despawn");
        pool.destroyed += 1;
        state.host.destroy_instance(instance);
        state.owners.remove(&instance);
        Ok(DespawnOutcome::Destroyed)
    }

    /// Creates up to `count` instances straight into the free list, stopping
    /// at the pool's cap and at the auto-cleanup threshold, so nothing
    /// pre-warmed is evicted right away. Returns how many were created.
    ///
    /// # Errors
    ///
    /// - [`PoolError::AssetNotFound`] if `identifier` does not resolve.
    /// - [`PoolError::InstantiationFailed`] if the host fails part-way;
    ///   instances created before the failure stay pooled.
    pub fn pre_warm_pool(&self, identifier: &str, count: usize) -> PoolResult<usize> {
        let resolved = self.resolve(identifier)?;
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let fresh = !state.pools.contains_key(&resolved.key);
        let headroom = state.config.auto_cleanup_threshold.map_or(usize::MAX, |threshold| {
            threshold.saturating_sub(state.pools.values().map(Pool::total).sum())
        });

        let pool = state.pool_for(&resolved, identifier);
        let room = pool
            .max_size
            .map_or(count, |max| max.saturating_sub(pool.free.len()).min(count))
            .min(headroom);
        let asset = pool.asset;
        let key = Arc::clone(&pool.key);

        let mut created = Vec::with_capacity(room);
        let mut failure = None;
        for _ in 0..room {
            match state.host.create_instance(asset, &Placement::IDENTITY) {
                Ok(instance) => {
                    state.host.park_instance(instance);
                    created.push(instance);
                }
                Err(reason) => {
                    failure = Some(reason);
                    break;
                }
            }
        }

        let count_created = created.len();
        if fresh && count_created == 0 {
            state.pools.remove(&*key);
        } else {
            if let Some(pool) = state.pools.get_mut(&*key) {
                pool.created += count_created as u64;
                pool.free.extend(created.iter().copied());
            }
            for instance in created {
                state.owners.insert(instance, Owner { pool: Arc::clone(&key), asset });
            }
            state.remember_alias(identifier, &key);
        }
        tracing::debug!(pool = %key, created = count_created, requested = count, "pool pre-warmed");

        match failure {
            Some(reason) => {
                tracing::warn!(identifier = %identifier, %reason, "pre-warm stopped early");
                Err(PoolError::InstantiationFailed {
                    identifier: identifier.to_string(),
                    reason,
                })
            }
            None => Ok(count_created),
        }
    }

    // ========================================================================
    // Clearing & Limits
    // ========================================================================

    /// Destroys every free and active instance of one pool and forgets the
    /// pool. Returns how many instances were destroyed.
    pub fn clear_pool(&self, identifier: &str) -> usize {
        let key = self.pool_key(identifier);
        self.state.lock().destroy_pool(&key)
    }

    /// Clears every pool. Returns how many instances were destroyed.
    pub fn clear_all_pools(&self) -> usize {
        let mut state = self.state.lock();
        let keys: Vec<String> = state.pools.keys().cloned().collect();
        keys.iter().map(|key| state.destroy_pool(key)).sum()
    }

    /// Changes the free-list cap for `identifier` (0 = uncapped). Applies to
    /// the existing pool and to one created later. Shrinking destroys the
    /// oldest free instances; the count is returned.
    pub fn set_max_size(&self, identifier: &str, max_size: usize) -> usize {
        let key = self.pool_key(identifier);
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.config.max_sizes.insert(key.clone(), max_size);

        let Some(pool) = state.pools.get_mut(&key) else {
            return 0;
        };
        pool.max_size = cap(max_size);

        let mut trimmed = 0;
        while let Some(max) = pool.max_size {
            if pool.free.len() <= max {
                break;
            }
            let Some(instance) = pool.free.pop_front() else {
                break;
            };
            state.host.destroy_instance(instance);
            state.owners.remove(&instance);
            pool.destroyed += 1;
            trimmed += 1;
        }
        trimmed
    }

    /// Runs auto-cleanup now. Returns how many instances were destroyed.
    pub fn run_auto_cleanup(&self) -> usize {
        self.state.lock().enforce_threshold()
    }

    /// Clears every pool and hands the host back.
    pub fn shutdown(self) -> H {
        let mut state = self.state.into_inner();
        let keys: Vec<String> = state.pools.keys().cloned().collect();
        let destroyed: usize = keys.iter().map(|key| state.destroy_pool(key)).sum();
        tracing::info!(destroyed, "pooling engine shut down");
        state.host
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Instances of `identifier` currently handed out.
    #[must_use]
    pub fn active_instance_count(&self, identifier: &str) -> usize {
        self.pool_stats(identifier).map_or(0, |stats| stats.active)
    }

    /// Instances of `identifier` waiting in the free list.
    #[must_use]
    pub fn pooled_instance_count(&self, identifier: &str) -> usize {
        self.pool_stats(identifier).map_or(0, |stats| stats.pooled)
    }

    /// Counters for the pool serving `identifier`.
    #[must_use]
    pub fn pool_stats(&self, identifier: &str) -> Option<PoolStats> {
        let key = self.pool_key(identifier);
        self.state.lock().pools.get(&key).map(Pool::stats)
    }

    /// Number of pools.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.state.lock().pools.len()
    }

    /// Free instances across all pools.
    #[must_use]
    pub fn total_pooled_count(&self) -> usize {
        self.state.lock().pools.values().map(|pool| pool.free.len()).sum()
    }

    /// Free plus active instances across all pools.
    #[must_use]
    pub fn total_instance_count(&self) -> usize {
        self.state.lock().pools.values().map(Pool::total).sum()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn resolve(&self, identifier: &str) -> PoolResult<Resolved> {
        self.manager.resolve(identifier).map_err(|source| {
            if !source.is_absent() {
                tracing::warn!(identifier = %identifier, error = %source, "spawn target does not resolve");
            }
            PoolError::AssetNotFound {
                identifier: identifier.to_string(),
                source,
            }
        })
    }

    /// Finds the pool `identifier` refers to: a literal pool key, then the
    /// key it resolves to now, then the pool it reached when it was last
    /// spawned or pre-warmed. The last step keeps pools reachable after a
    /// bare key turns ambiguous or its entry is removed.
    fn pool_key(&self, identifier: &str) -> String {
        let resolved = self.manager.resolve(identifier).ok().map(|resolved| resolved.key);
        let state = self.state.lock();

        if state.pools.contains_key(identifier) {
            return identifier.to_string();
        }
        if let Some(key) = resolved.filter(|key| state.pools.contains_key(key)) {
            return key;
        }
        state
            .aliases
            .get(identifier)
            .map_or_else(|| identifier.to_string(), ToString::to_string)
    }
}
