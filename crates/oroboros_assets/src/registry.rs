//! # Registry
//!
//! An ordered collection of [`ItemEntry`] values locked to one [`AssetKind`].
//!
//! ## Lookup Paths
//!
//! - **Hot**: identifier lookups go through a hash index, O(1).
//! - **Cold**: tag queries scan the item list. They are rare enough that a
//!   second index is not worth keeping in sync.
//!
//! ## Index Lifecycle
//!
//! The item list is the source of truth. The index is derived from it and
//! built lazily on first access. Appends extend an already-built index in
//! place; removals throw it away so the next reader rebuilds it. Because the
//! index lives in a `OnceLock`, a reader observes either no index or a
//! complete one.
//!
//! Every mutation also bumps the generation counters of the managers the
//! registry is attached to, so they can tell a stale global index apart
//! without locking each registry.
//!
//! ## Fallback
//!
//! Every registry owns a fallback entry of its own kind. The generic
//! [`Registry::get_item_by_uid`] reports absence as `None`; the typed getters
//! ([`Registry::get_prefab_by_uid`] and friends) substitute the fallback's
//! asset instead, so they only ever fail on a kind mismatch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;

use crate::entry::ItemEntry;
use crate::error::{AssetError, AssetResult};
use crate::handle::{AssetHandle, AssetKind};

/// A registry shared between its loader and the [`crate::RegistryManager`].
pub type SharedRegistry = Arc<RwLock<Registry>>;

/// An ordered, kind-locked collection of item entries.
#[derive(Debug)]
pub struct Registry {
    /// Label used in logs and errors.
    name: String,
    /// Kind every entry must have.
    kind: AssetKind,
    /// Entries in insertion order.
    items: Vec<Arc<ItemEntry>>,
    /// Returned by typed getters when an identifier is absent.
    fallback: Arc<ItemEntry>,
    /// identifier -> position in `items`. Built on demand.
    index: OnceLock<HashMap<String, usize>>,
    /// Bumped on every mutation.
    revision: u64,
    /// Generation counters of the managers holding this registry.
    watchers: Vec<Weak<AtomicU64>>,
}

impl Registry {
    /// Creates an empty registry.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::TypeMismatch`] if the fallback's asset is not
    /// of `kind`.
    pub fn new(name: impl Into<String>, kind: AssetKind, fallback: ItemEntry) -> AssetResult<Self> {
        check_kind(kind, &fallback)?;

        Ok(Self {
            name: name.into(),
            kind,
            items: Vec::new(),
            fallback: Arc::new(fallback),
            index: OnceLock::new(),
            revision: 0,
            watchers: Vec::new(),
        })
    }

    /// Wraps the registry for sharing with a manager.
    #[must_use]
    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Registry label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The asset kind this registry is locked to.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> AssetKind {
        self.kind
    }

    /// The fallback entry.
    #[must_use]
    pub fn fallback(&self) -> &Arc<ItemEntry> {
        &self.fallback
    }

    /// Mutation counter. Changes whenever items or the fallback change.
    #[inline]
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of items (the fallback is not counted).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no items have been added.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over items in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &Arc<ItemEntry>> + Clone {
        self.items.iter()
    }

    /// Iterates over item identifiers in insertion order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> + Clone {
        self.items.iter().map(|item| item.identifier())
    }

    /// Appends an entry.
    ///
    /// # Errors
    ///
    /// - [`AssetError::TypeMismatch`] if the entry's asset kind differs from
    ///   the registry's.
    /// - [`AssetError::DuplicateIdentifier`] if the identifier is taken. The
    ///   existing entry is left untouched.
    pub fn add_item(&mut self, entry: ItemEntry) -> AssetResult<Arc<ItemEntry>> {
        check_kind(self.kind, &entry)?;
        if self.has_item(entry.identifier()) {
            return Err(AssetError::DuplicateIdentifier(entry.identifier().to_string()));
        }

        let entry = Arc::new(entry);
        let position = self.items.len();
        self.items.push(Arc::clone(&entry));
        if let Some(index) = self.index.get_mut() {
            index.insert(entry.identifier().to_string(), position);
        }
        self.touch();

        Ok(entry)
    }

    /// Removes an entry, preserving the order of the rest.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::NotFound`] if no entry has this identifier.
    pub fn remove_item(&mut self, identifier: &str) -> AssetResult<Arc<ItemEntry>> {
        let position = self
            .position(identifier)
            .ok_or_else(|| AssetError::NotFound(identifier.to_string()))?;

        let removed = self.items.remove(position);
        self.index = OnceLock::new();
        self.touch();

        Ok(removed)
    }

    /// Replaces the fallback entry.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::TypeMismatch`] if the new fallback is of the
    /// wrong kind.
    pub fn set_fallback(&mut self, fallback: ItemEntry) -> AssetResult<()> {
        check_kind(self.kind, &fallback)?;
        self.fallback = Arc::new(fallback);
        self.touch();
        Ok(())
    }

    /// Re-targets an empty registry to another kind.
    ///
    /// # Errors
    ///
    /// - [`AssetError::CategoryLocked`] once any item has been added.
    /// - [`AssetError::TypeMismatch`] if `fallback` is not of `kind`.
    pub fn change_kind(&mut self, kind: AssetKind, fallback: ItemEntry) -> AssetResult<()> {
        if !self.items.is_empty() {
            return Err(AssetError::CategoryLocked {
                registry: self.name.clone(),
                kind: self.kind,
            });
        }
        check_kind(kind, &fallback)?;

        self.kind = kind;
        self.fallback = Arc::new(fallback);
        self.touch();
        Ok(())
    }

    /// Checks whether an identifier is present. O(1).
    #[inline]
    #[must_use]
    pub fn has_item(&self, identifier: &str) -> bool {
        self.index().contains_key(identifier)
    }

    /// Looks up an entry. O(1).
    ///
    /// Returns `None` when the identifier is absent; the fallback is never
    /// substituted here.
    #[inline]
    #[must_use]
    pub fn get_item_by_uid(&self, identifier: &str) -> Option<&Arc<ItemEntry>> {
        self.position(identifier).map(|position| &self.items[position])
    }

    /// Resolves an identifier to an asset of `kind`, using the fallback asset
    /// when the identifier is absent.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::TypeMismatch`] if this registry is not locked
    /// to `kind`.
    pub fn get_asset_by_uid(&self, kind: AssetKind, identifier: &str) -> AssetResult<AssetHandle> {
        if kind != self.kind {
            return Err(AssetError::TypeMismatch {
                identifier: identifier.to_string(),
                expected: kind,
                found: self.kind,
            });
        }

        Ok(self
            .get_item_by_uid(identifier)
            .map_or_else(|| self.fallback.asset(), |entry| entry.asset()))
    }

    /// Typed getter for prefab registries.
    ///
    /// # Errors
    ///
    /// See [`Registry::get_asset_by_uid`].
    pub fn get_prefab_by_uid(&self, identifier: &str) -> AssetResult<AssetHandle> {
        self.get_asset_by_uid(AssetKind::Prefab, identifier)
    }

    /// Typed getter for texture registries.
    ///
    /// # Errors
    ///
    /// See [`Registry::get_asset_by_uid`].
    pub fn get_texture_by_uid(&self, identifier: &str) -> AssetResult<AssetHandle> {
        self.get_asset_by_uid(AssetKind::Texture, identifier)
    }

    /// Typed getter for material registries.
    ///
    /// # Errors
    ///
    /// See [`Registry::get_asset_by_uid`].
    pub fn get_material_by_uid(&self, identifier: &str) -> AssetResult<AssetHandle> {
        self.get_asset_by_uid(AssetKind::Material, identifier)
    }

    /// Typed getter for mesh registries.
    ///
    /// # Errors
    ///
    /// See [`Registry::get_asset_by_uid`].
    pub fn get_mesh_by_uid(&self, identifier: &str) -> AssetResult<AssetHandle> {
        self.get_asset_by_uid(AssetKind::Mesh, identifier)
    }

    /// Typed getter for audio registries.
    ///
    /// # Errors
    ///
    /// See [`Registry::get_asset_by_uid`].
    pub fn get_audio_by_uid(&self, identifier: &str) -> AssetResult<AssetHandle> {
        self.get_asset_by_uid(AssetKind::Audio, identifier)
    }

    /// Lazily yields every item carrying `tag`, in insertion order.
    ///
    /// The iterator is `Clone`, so a query can be restarted without
    /// re-issuing it.
    pub fn get_items_by_tag<'a>(
        &'a self,
        tag: &'a str,
    ) -> impl Iterator<Item = &'a Arc<ItemEntry>> + Clone + 'a {
        self.items.iter().filter(move |item| item.has_tag(tag))
    }

    /// Registers a counter to bump on every mutation. Registering the same
    /// counter twice is a no-op.
    pub(crate) fn watch(&mut self, generation: &Arc<AtomicU64>) {
        self.watchers.retain(|watcher| watcher.strong_count() > 0);
        if !self.watchers.iter().any(|watcher| watcher.as_ptr() == Arc::as_ptr(generation)) {
            self.watchers.push(Arc::downgrade(generation));
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.watchers.retain(|watcher| match watcher.upgrade() {
            Some(generation) => {
                generation.fetch_add(1, Ordering::Release);
                true
            }
            None => false,
        });
    }

    fn position(&self, identifier: &str) -> Option<usize> {
        self.index().get(identifier).copied()
    }

    fn index(&self) -> &HashMap<String, usize> {
        self.index.get_or_init(|| {
            tracing::debug!(registry = %self.name, items = self.items.len(), "rebuilding identifier index");
            self.items
                .iter()
                .enumerate()
                .map(|(position, item)| (item.identifier().to_string(), position))
                .collect()
        })
    }
}

fn check_kind(expected: AssetKind, entry: &ItemEntry) -> AssetResult<()> {
    if entry.kind() == expected {
        Ok(())
    } else {
        Err(AssetError::TypeMismatch {
            identifier: entry.identifier().to_string(),
            expected,
            found: entry.kind(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefab(identifier: &str, raw: u64) -> ItemEntry {
        ItemEntry::new(identifier, AssetHandle::prefab(raw)).unwrap()
    }

    fn enemies() -> Registry {
        Registry::new("enemies", AssetKind::Prefab, prefab("missing", 0)).unwrap()
    }

    #[test]
    fn test_add_then_lookup() {
        let mut registry = enemies();
        let added = registry.add_item(prefab("goblin", 1)).unwrap();

        assert!(registry.has_item("goblin"));
        let found = registry.get_item_by_uid("goblin").unwrap();
        assert!(Arc::ptr_eq(found, &added));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_identifier_keeps_first() {
        let mut registry = enemies();
        registry.add_item(prefab("goblin", 1)).unwrap();

        let err = registry.add_item(prefab("goblin", 2)).unwrap_err();
        assert_eq!(err, AssetError::DuplicateIdentifier("goblin".to_string()));
        assert_eq!(registry.get_item_by_uid("goblin").unwrap().asset().raw(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_type_mismatch_on_add() {
        let mut registry = enemies();
        let texture = ItemEntry::new("skin", AssetHandle::new(AssetKind::Texture, 9)).unwrap();

        let err = registry.add_item(texture).unwrap_err();
        assert!(matches!(err, AssetError::TypeMismatch { expected: AssetKind::Prefab, found: AssetKind::Texture, .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_fallback_must_match_kind() {
        let texture = ItemEntry::new("checker", AssetHandle::new(AssetKind::Texture, 1)).unwrap();
        assert!(Registry::new("enemies", AssetKind::Prefab, texture).is_err());
    }

    #[test]
    fn test_remove_rebuilds_index() {
        let mut registry = enemies();
        registry.add_item(prefab("goblin", 1)).unwrap();
        registry.add_item(prefab("orc", 2)).unwrap();
        registry.add_item(prefab("troll", 3)).unwrap();

        let removed = registry.remove_item("goblin").unwrap();
        assert_eq!(removed.identifier(), "goblin");
        assert!(!registry.has_item("goblin"));
        // Positions shifted; the rebuilt index must still point at the right entries
        assert_eq!(registry.get_item_by_uid("troll").unwrap().asset().raw(), 3);
        assert_eq!(registry.identifiers().collect::<Vec<_>>(), vec!["orc", "troll"]);

        assert_eq!(registry.remove_item("goblin").unwrap_err(), AssetError::NotFound("goblin".to_string()));
    }

    #[test]
    fn test_typed_getter_uses_fallback() {
        let mut registry = enemies();
        assert_eq!(registry.get_prefab_by_uid("goblin").unwrap(), AssetHandle::prefab(0));
        assert!(registry.get_item_by_uid("goblin").is_none());

        registry.add_item(prefab("goblin", 1)).unwrap();
        assert_eq!(registry.get_prefab_by_uid("goblin").unwrap(), AssetHandle::prefab(1));
    }

    #[test]
    fn test_typed_getter_wrong_kind() {
        let registry = enemies();
        let err = registry.get_texture_by_uid("goblin").unwrap_err();
        assert!(matches!(err, AssetError::TypeMismatch { expected: AssetKind::Texture, found: AssetKind::Prefab, .. }));
    }

    #[test]
    fn test_tag_query_is_restartable() {
        let mut registry = enemies();
        registry.add_item(prefab("goblin", 1).with_tag("small")).unwrap();
        registry.add_item(prefab("orc", 2)).unwrap();
        registry.add_item(prefab("imp", 3).with_tag("small")).unwrap();

        let query = registry.get_items_by_tag("small");
        let first: Vec<_> = query.clone().map(|e| e.identifier().to_string()).collect();
        let second: Vec<_> = query.map(|e| e.identifier().to_string()).collect();
        assert_eq!(first, vec!["goblin", "imp"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_kind_locked_after_first_item() {
        let mut registry = enemies();
        let audio_fallback = ItemEntry::new("silence", AssetHandle::new(AssetKind::Audio, 0)).unwrap();
        registry.change_kind(AssetKind::Audio, audio_fallback).unwrap();
        assert_eq!(registry.kind(), AssetKind::Audio);

        registry
            .add_item(ItemEntry::new("roar", AssetHandle::new(AssetKind::Audio, 5)).unwrap())
            .unwrap();
        let err = registry.change_kind(AssetKind::Prefab, prefab("missing", 0)).unwrap_err();
        assert!(matches!(err, AssetError::CategoryLocked { kind: AssetKind::Audio, .. }));
    }

    #[test]
    fn test_mutations_bump_watchers() {
        let mut registry = enemies();
        let generation = Arc::new(AtomicU64::new(0));
        registry.watch(&generation);
        registry.watch(&generation);
        assert_eq!(registry.watchers.len(), 1);

        registry.add_item(prefab("goblin", 1)).unwrap();
        registry.remove_item("goblin").unwrap();
        assert_eq!(generation.load(Ordering::Acquire), 2);

        drop(generation);
        registry.add_item(prefab("orc", 2)).unwrap();
        assert!(registry.watchers.is_empty());
    }

    #[test]
    fn test_revision_tracks_mutations() {
        let mut registry = enemies();
        let start = registry.revision();
        registry.add_item(prefab("goblin", 1)).unwrap();
        let _ = registry.add_item(prefab("goblin", 1));
        assert_eq!(registry.revision(), start + 1);
        registry.remove_item("goblin").unwrap();
        assert_eq!(registry.revision(), start + 2);
    }
}
