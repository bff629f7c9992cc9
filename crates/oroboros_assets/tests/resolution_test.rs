//! Integration tests for bucketed key resolution.
//!
//! Run with: cargo test --package oroboros_assets --test resolution_test

use std::sync::Arc;
use std::thread;

use oroboros_assets::{
    AssetError, AssetHandle, AssetKind, ItemEntry, Registry, RegistryManager, SharedRegistry,
};

fn prefab(identifier: &str, raw: u64) -> ItemEntry {
    ItemEntry::new(identifier, AssetHandle::prefab(raw)).unwrap()
}

fn prefab_registry(name: &str, fallback_raw: u64) -> Registry {
    Registry::new(name, AssetKind::Prefab, prefab("fallback", fallback_raw)).unwrap()
}

fn shared_with(name: &str, items: &[(&str, u64)]) -> SharedRegistry {
    let mut registry = prefab_registry(name, 0);
    for &(identifier, raw) in items {
        registry.add_item(prefab(identifier, raw)).unwrap();
    }
    registry.into_shared()
}

#[test]
fn test_fallback_then_real_entry() {
    // "enemies" has fallback F and no items
    let mut enemies = prefab_registry("enemies", 1000);
    assert_eq!(enemies.get_prefab_by_uid("goblin").unwrap(), AssetHandle::prefab(1000));

    enemies.add_item(prefab("goblin", 7)).unwrap();
    assert_eq!(enemies.get_prefab_by_uid("goblin").unwrap(), AssetHandle::prefab(7));
}

#[test]
fn test_crate_in_two_buckets() {
    let manager = RegistryManager::new();
    manager.add_registry_to_bucket("enemies", shared_with("enemies", &[("crate", 1)])).unwrap();
    manager.add_registry_to_bucket("props", shared_with("props", &[("crate", 2)])).unwrap();

    assert!(matches!(
        manager.get_item_by_uid("crate"),
        Err(AssetError::AmbiguousIdentifier { .. })
    ));
    assert_eq!(manager.get_item_by_uid("enemies/crate").unwrap().asset().raw(), 1);
}

#[test]
fn test_ambiguity_independent_of_insertion_order() {
    for order in [["a", "b"], ["b", "a"]] {
        let manager = RegistryManager::new();
        for bucket in order {
            manager.add_registry_to_bucket(bucket, shared_with(bucket, &[("x", 1)])).unwrap();
        }
        let err = manager.get_item_by_uid("x").unwrap_err();
        assert_eq!(
            err,
            AssetError::AmbiguousIdentifier {
                identifier: "x".to_string(),
                buckets: vec!["a".to_string(), "b".to_string()],
            }
        );
    }
}

#[test]
fn test_add_then_lookup_until_removed() {
    let shared = shared_with("items", &[]);
    let manager = RegistryManager::new();
    manager.add_registry_to_bucket("items", Arc::clone(&shared)).unwrap();

    let added = shared.write().add_item(prefab("sword", 5)).unwrap();
    assert!(shared.read().has_item("sword"));
    assert!(Arc::ptr_eq(&manager.get_item_by_uid("sword").unwrap(), &added));
    assert!(Arc::ptr_eq(&manager.get_item_by_uid("items/sword").unwrap(), &added));

    shared.write().remove_item("sword").unwrap();
    assert!(!manager.has_item("sword"));
    assert!(!manager.has_item("items/sword"));
}

#[test]
fn test_override_shadows_and_restores() {
    let manager = RegistryManager::new();
    manager.add_registry_to_bucket("bucketA", shared_with("a", &[("x", 1)])).unwrap();

    manager.add_override("bucketA/x", prefab("x", 50)).unwrap();
    assert_eq!(manager.get_item_by_uid("bucketA/x").unwrap().asset().raw(), 50);
    assert_eq!(manager.get_prefab_by_uid("bucketA/x").unwrap().raw(), 50);

    manager.remove_override("bucketA/x");
    assert_eq!(manager.get_item_by_uid("bucketA/x").unwrap().asset().raw(), 1);
}

#[test]
fn test_override_kind_is_checked_by_typed_getters() {
    let manager = RegistryManager::new();
    let texture = ItemEntry::new("skin", AssetHandle::new(AssetKind::Texture, 3)).unwrap();
    manager.add_override("hero", texture).unwrap();

    assert_eq!(manager.get_texture_by_uid("hero").unwrap().raw(), 3);
    assert!(matches!(
        manager.get_prefab_by_uid("hero"),
        Err(AssetError::TypeMismatch { expected: AssetKind::Prefab, found: AssetKind::Texture, .. })
    ));
}

#[test]
fn test_readers_never_see_partial_index() {
    let shared = shared_with("enemies", &[]);
    let manager = Arc::new(RegistryManager::new());
    manager.add_registry_to_bucket("enemies", Arc::clone(&shared)).unwrap();
    manager.add_registry_to_bucket("props", shared_with("props", &[("anchor", 1)])).unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                for _ in 0..500 {
                    // "anchor" is never touched by the writer
                    assert_eq!(manager.get_item_by_uid("anchor").unwrap().asset().raw(), 1);
                    let count = manager.item_count();
                    assert!((1..=201).contains(&count));
                }
            })
        })
        .collect();

    for i in 0..200u64 {
        shared.write().add_item(prefab(&format!("mob_{i}"), i + 10)).unwrap();
        if i % 50 == 0 {
            manager.add_override(format!("mob_{i}"), prefab("boss", 9999)).unwrap();
        }
    }

    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(manager.item_count(), 201);
    assert_eq!(manager.get_item_by_uid("mob_50").unwrap().asset().raw(), 9999);
    assert_eq!(manager.get_item_by_uid("enemies/mob_50").unwrap().asset().raw(), 60);
}
