//! # Registry Manager
//!
//! Aggregates registries under named buckets and resolves string keys
//! against all of them.
//!
//! ## Resolution Order
//!
//! ```text
//!   key ──► overrides (verbatim) ──hit──► entry
//!            │ miss
//!            ▼
//!   contains '/'? ──yes──► bucket ──► Registry::get_item_by_uid
//!            │ no
//!            ▼
//!   bare index ──► 0 matches: NotFound
//!                  1 match:   entry
//!                  N matches: AmbiguousIdentifier (never guessed)
//! ```
//!
//! ## Thread Safety
//!
//! - The bucket map sits behind a `RwLock`. Only bucket attach/detach write it.
//! - The global index and the override map are immutable snapshots published
//!   through `ArcSwap`. Readers load a snapshot and never see a partial
//!   rebuild; writers build a new map and swap it in.
//! - A generation counter is bumped by bucket attach/detach and by every
//!   mutation of an attached registry. The global index records the
//!   generation it was built at; a lookup that sees a newer one rebuilds it.
//!   Checking is a single atomic load, whatever the number of buckets.
//!
//! Do not call into the manager while holding a guard on one of its
//! registries from the same thread.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::RwLock;

use crate::entry::ItemEntry;
use crate::error::{AssetError, AssetResult};
use crate::handle::{AssetHandle, AssetKind};
use crate::key::{composite_key, validate_bucket_name, AssetKey};
use crate::registry::SharedRegistry;

/// An entry together with the canonical key it was resolved under.
#[derive(Clone, Debug)]
pub struct Resolved {
    /// `bucket/identifier` for registry hits, the key verbatim for overrides.
    pub key: String,
    /// The resolved entry.
    pub entry: Arc<ItemEntry>,
}

/// One bucket's view of an entry.
#[derive(Clone, Debug)]
struct Candidate {
    bucket: Arc<str>,
    entry: Arc<ItemEntry>,
}

/// Derived lookup tables over every bucket.
#[derive(Debug, Default)]
struct GlobalIndex {
    /// Manager generation this index reflects.
    generation: u64,
    buckets: usize,
    /// `bucket/identifier` -> entry.
    composite: HashMap<String, Arc<ItemEntry>>,
    /// identifier -> every bucket holding it, in bucket order.
    bare: HashMap<String, Vec<Candidate>>,
    /// Every entry, bucket order then item order.
    entries: Vec<Candidate>,
}

impl GlobalIndex {
    fn build(buckets: &BTreeMap<String, SharedRegistry>, generation: u64) -> Self {
        let mut index = Self {
            generation,
            buckets: buckets.len(),
            ..Self::default()
        };

        for (bucket, registry) in buckets {
            let registry_guard = registry.read();
            let bucket_name: Arc<str> = Arc::from(bucket.as_str());

            for entry in registry_guard.items() {
                let candidate = Candidate {
                    bucket: Arc::clone(&bucket_name),
                    entry: Arc::clone(entry),
                };
                index
                    .composite
                    .insert(composite_key(bucket, entry.identifier()), Arc::clone(entry));
                index
                    .bare
                    .entry(entry.identifier().to_string())
                    .or_default()
                    .push(candidate.clone());
                index.entries.push(candidate);
            }
        }

        index
    }

    fn ambiguous_count(&self) -> usize {
        self.bare.values().filter(|candidates| candidates.len() > 1).count()
    }

    fn unique(&self, identifier: &str) -> AssetResult<&Candidate> {
        match self.bare.get(identifier).map(Vec::as_slice) {
            None | Some([]) => Err(AssetError::NotFound(identifier.to_string())),
            Some([only]) => Ok(only),
            Some(candidates) => Err(AssetError::AmbiguousIdentifier {
                identifier: identifier.to_string(),
                buckets: candidates.iter().map(|c| c.bucket.to_string()).collect(),
            }),
        }
    }
}

/// Lazy, restartable iterator over every bucketed entry carrying a tag.
///
/// Holds its own index snapshot, so later bucket changes do not affect an
/// iteration in progress.
#[derive(Clone, Debug)]
pub struct TaggedItems {
    index: Arc<GlobalIndex>,
    tag: String,
    position: usize,
}

impl Iterator for TaggedItems {
    type Item = Arc<ItemEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(candidate) = self.index.entries.get(self.position) {
            self.position += 1;
            if candidate.entry.has_tag(&self.tag) {
                return Some(Arc::clone(&candidate.entry));
            }
        }
        None
    }
}

/// Resolves keys across many bucketed registries.
#[derive(Debug, Default)]
pub struct RegistryManager {
    /// bucket name -> registry. Sorted, so bucket order is deterministic.
    buckets: RwLock<BTreeMap<String, SharedRegistry>>,
    /// Derived from `buckets`; rebuilt when stale.
    index: ArcSwap<GlobalIndex>,
    /// Bumped on bucket changes and by attached registries on mutation.
    generation: Arc<AtomicU64>,
    /// Checked before anything else.
    overrides: ArcSwap<HashMap<String, Arc<ItemEntry>>>,
}

impl RegistryManager {
    /// Creates a manager with no buckets and no overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Buckets
    // ========================================================================

    /// Attaches a registry under `name`.
    ///
    /// # Errors
    ///
    /// - [`AssetError::InvalidKey`] if `name` is empty or contains `/`.
    /// - [`AssetError::DuplicateBucket`] if `name` is already used.
    pub fn add_registry_to_bucket(
        &self,
        name: impl Into<String>,
        registry: SharedRegistry,
    ) -> AssetResult<()> {
        let name = name.into();
        validate_bucket_name(&name)?;

        let mut buckets = self.buckets.write();
        if buckets.contains_key(&name) {
            return Err(AssetError::DuplicateBucket(name));
        }
        let items = {
            let mut guard = registry.write();
            guard.watch(&self.generation);
            guard.len()
        };
        tracing::debug!(bucket = %name, items, "bucket attached");
        buckets.insert(name, registry);
        self.generation.fetch_add(1, Ordering::Release);

        Ok(())
    }

    /// Detaches the registry under `name`, returning it.
    pub fn remove_registry_from_bucket(&self, name: &str) -> Option<SharedRegistry> {
        let removed = self.buckets.write().remove(name);
        if removed.is_some() {
            self.generation.fetch_add(1, Ordering::Release);
            tracing::debug!(bucket = %name, "bucket detached");
        }
        removed
    }

    /// The registry under `name`.
    #[must_use]
    pub fn bucket(&self, name: &str) -> Option<SharedRegistry> {
        self.buckets.read().get(name).cloned()
    }

    /// All bucket names, sorted.
    #[must_use]
    pub fn bucket_names(&self) -> Vec<String> {
        self.buckets.read().keys().cloned().collect()
    }

    /// Number of attached buckets.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.read().len()
    }

    /// Number of entries across all buckets (overrides not counted).
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.current_index().entries.len()
    }

    /// Every `bucket/identifier` key backed by a registry entry, sorted.
    #[must_use]
    pub fn composite_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.current_index().composite.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    // ========================================================================
    // Overrides
    // ========================================================================

    /// Shadows `key` with `entry`. The key is matched verbatim, bare or
    /// composite. Returns the override it replaced.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::InvalidKey`] if `key` is empty.
    pub fn add_override(
        &self,
        key: impl Into<String>,
        entry: impl Into<Arc<ItemEntry>>,
    ) -> AssetResult<Option<Arc<ItemEntry>>> {
        let key = key.into();
        if key.is_empty() {
            return Err(AssetError::InvalidKey(key));
        }
        let entry = entry.into();

        let previous = self.overrides.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(key.clone(), Arc::clone(&entry));
            next
        });
        tracing::debug!(key = %key, identifier = %entry.identifier(), "override added");

        Ok(previous.get(&key).cloned())
    }

    /// Removes the override for `key`, restoring normal resolution.
    pub fn remove_override(&self, key: &str) -> Option<Arc<ItemEntry>> {
        if !self.overrides.load().contains_key(key) {
            return None;
        }

        let previous = self.overrides.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.remove(key);
            next
        });
        previous.get(key).cloned()
    }

    /// Drops every override.
    pub fn clear_overrides(&self) {
        self.overrides.store(Arc::new(HashMap::new()));
    }

    /// The override registered for `key`.
    #[must_use]
    pub fn get_override(&self, key: &str) -> Option<Arc<ItemEntry>> {
        self.overrides.load().get(key).cloned()
    }

    /// Number of active overrides.
    #[must_use]
    pub fn override_count(&self) -> usize {
        self.overrides.load().len()
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolves `key` and reports the canonical key it resolved under.
    ///
    /// # Errors
    ///
    /// - [`AssetError::InvalidKey`] for malformed keys.
    /// - [`AssetError::BucketNotFound`] if a composite key names no bucket.
    /// - [`AssetError::NotFound`] if nothing matches.
    /// - [`AssetError::AmbiguousIdentifier`] if a bare identifier lives in
    ///   more than one bucket.
    pub fn resolve(&self, key: &str) -> AssetResult<Resolved> {
        if let Some(entry) = self.get_override(key) {
            return Ok(Resolved { key: key.to_string(), entry });
        }

        match AssetKey::parse(key)? {
            AssetKey::Composite { bucket, identifier } => {
                let registry = self.require_bucket(bucket)?;
                let entry = registry
                    .read()
                    .get_item_by_uid(identifier)
                    .cloned()
                    .ok_or_else(|| AssetError::NotFound(key.to_string()))?;
                Ok(Resolved { key: composite_key(bucket, identifier), entry })
            }
            AssetKey::Bare(identifier) => {
                let index = self.current_index();
                let candidate = index.unique(identifier)?;
                Ok(Resolved {
                    key: composite_key(&candidate.bucket, identifier),
                    entry: Arc::clone(&candidate.entry),
                })
            }
        }
    }

    /// Resolves `key` to its entry. Absence is an error; no fallback applies.
    ///
    /// # Errors
    ///
    /// See [`RegistryManager::resolve`].
    pub fn get_item_by_uid(&self, key: &str) -> AssetResult<Arc<ItemEntry>> {
        self.resolve(key).map(|resolved| resolved.entry)
    }

    /// True if `key` resolves to exactly one entry.
    #[must_use]
    pub fn has_item(&self, key: &str) -> bool {
        self.resolve(key).is_ok()
    }

    /// Resolves `key` to an asset of `kind`.
    ///
    /// Composite keys delegate to the bucket's registry, which substitutes
    /// its fallback asset for unknown identifiers. Bare keys must still
    /// resolve to exactly one entry: with no bucket named there is no
    /// registry whose fallback could apply.
    ///
    /// # Errors
    ///
    /// - [`AssetError::TypeMismatch`] if the resolved asset or the bucket's
    ///   registry is of another kind.
    /// - Everything [`RegistryManager::resolve`] reports, except `NotFound`
    ///   for composite keys into an existing bucket.
    pub fn get_asset_by_uid(&self, key: &str, kind: AssetKind) -> AssetResult<AssetHandle> {
        if let Some(entry) = self.get_override(key) {
            return expect_kind(key, &entry, kind);
        }

        match AssetKey::parse(key)? {
            AssetKey::Composite { bucket, identifier } => {
                let registry = self.require_bucket(bucket)?;
                let guard = registry.read();
                guard.get_asset_by_uid(kind, identifier)
            }
            AssetKey::Bare(identifier) => {
                let index = self.current_index();
                let candidate = index.unique(identifier)?;
                expect_kind(key, &candidate.entry, kind)
            }
        }
    }

    /// Typed getter for prefabs.
    ///
    /// # Errors
    ///
    /// See [`RegistryManager::get_asset_by_uid`].
    pub fn get_prefab_by_uid(&self, key: &str) -> AssetResult<AssetHandle> {
        self.get_asset_by_uid(key, AssetKind::Prefab)
    }

    /// Typed getter for textures.
    ///
    /// # Errors
    ///
    /// See [`RegistryManager::get_asset_by_uid`].
    pub fn get_texture_by_uid(&self, key: &str) -> AssetResult<AssetHandle> {
        self.get_asset_by_uid(key, AssetKind::Texture)
    }

    /// Typed getter for materials.
    ///
    /// # Errors
    ///
    /// See [`RegistryManager::get_asset_by_uid`].
    pub fn get_material_by_uid(&self, key: &str) -> AssetResult<AssetHandle> {
        self.get_asset_by_uid(key, AssetKind::Material)
    }

    /// Typed getter for meshes.
    ///
    /// # Errors
    ///
    /// See [`RegistryManager::get_asset_by_uid`].
    pub fn get_mesh_by_uid(&self, key: &str) -> AssetResult<AssetHandle> {
        self.get_asset_by_uid(key, AssetKind::Mesh)
    }

    /// Typed getter for audio clips.
    ///
    /// # Errors
    ///
    /// See [`RegistryManager::get_asset_by_uid`].
    pub fn get_audio_by_uid(&self, key: &str) -> AssetResult<AssetHandle> {
        self.get_asset_by_uid(key, AssetKind::Audio)
    }

    /// Lazily yields every bucketed entry tagged `tag`, in bucket order.
    /// Overrides are not included.
    #[must_use]
    pub fn get_items_by_tag(&self, tag: &str) -> TaggedItems {
        TaggedItems {
            index: self.current_index(),
            tag: tag.to_string(),
            position: 0,
        }
    }

    /// Finds the registry that owns `key`, applying the same ambiguity rules
    /// as [`RegistryManager::resolve`]. Overrides belong to no registry and
    /// are ignored here.
    ///
    /// # Errors
    ///
    /// `InvalidKey`, `BucketNotFound`, `NotFound` or `AmbiguousIdentifier`.
    pub fn get_registry_for_item(&self, key: &str) -> AssetResult<SharedRegistry> {
        match AssetKey::parse(key)? {
            AssetKey::Composite { bucket, identifier } => {
                let registry = self.require_bucket(bucket)?;
                if registry.read().has_item(identifier) {
                    Ok(registry)
                } else {
                    Err(AssetError::NotFound(key.to_string()))
                }
            }
            AssetKey::Bare(identifier) => {
                let index = self.current_index();
                let candidate = index.unique(identifier)?;
                self.bucket(&candidate.bucket)
                    .ok_or_else(|| AssetError::NotFound(key.to_string()))
            }
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn require_bucket(&self, bucket: &str) -> AssetResult<SharedRegistry> {
        self.bucket(bucket)
            .ok_or_else(|| AssetError::BucketNotFound(bucket.to_string()))
    }

    /// Returns an index matching the current buckets, rebuilding it if any
    /// bucket or attached registry changed since the last build.
    fn current_index(&self) -> Arc<GlobalIndex> {
        let snapshot = self.index.load_full();
        if snapshot.generation == self.generation.load(Ordering::Acquire) {
            return snapshot;
        }

        let buckets = self.buckets.read();
        // Read under the bucket lock: a mutation racing the build bumps the
        // generation past this value and forces another rebuild.
        let generation = self.generation.load(Ordering::Acquire);
        let rebuilt = Arc::new(GlobalIndex::build(&buckets, generation));
        drop(buckets);
        tracing::debug!(
            generation,
            buckets = rebuilt.buckets,
            entries = rebuilt.entries.len(),
            composite_keys = rebuilt.composite.len(),
            ambiguous = rebuilt.ambiguous_count(),
            "global index rebuilt"
        );
        self.index.store(Arc::clone(&rebuilt));
        rebuilt
    }
}

fn expect_kind(key: &str, entry: &ItemEntry, kind: AssetKind) -> AssetResult<AssetHandle> {
    if entry.kind() == kind {
        Ok(entry.asset())
    } else {
        Err(AssetError::TypeMismatch {
            identifier: key.to_string(),
            expected: kind,
            found: entry.kind(),
        })
    }
}
