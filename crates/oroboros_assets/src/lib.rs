//! # OROBOROS Asset Registries
//!
//! Maps string identifiers to opaque asset handles for runtime code.
//!
//! ## Building Blocks
//!
//! 1. **[`ItemEntry`]** - identifier, asset handle, tags, string metadata
//! 2. **[`Registry`]** - ordered entries locked to one [`AssetKind`], with a
//!    mandatory fallback entry and an O(1) identifier index
//! 3. **[`RegistryManager`]** - registries attached under bucket names,
//!    resolved by composite (`bucket/identifier`) or bare keys, with runtime
//!    overrides layered on top
//!
//! ## Absence vs Fallback
//!
//! Generic lookups (`get_item_by_uid`) report absence. Typed lookups
//! (`get_prefab_by_uid`, ...) into a known registry return its fallback asset
//! instead, so they only fail when the kind is wrong or the key cannot be
//! pinned to a single registry.
//!
//! ## Example
//!
//! ```rust,ignore
//! use oroboros_assets::{AssetHandle, AssetKind, ItemEntry, Registry, RegistryManager};
//!
//! let fallback = ItemEntry::new("missing", AssetHandle::prefab(0))?;
//! let mut enemies = Registry::new("enemies", AssetKind::Prefab, fallback)?;
//! enemies.add_item(ItemEntry::new("goblin", AssetHandle::prefab(1))?)?;
//!
//! let manager = RegistryManager::new();
//! manager.add_registry_to_bucket("enemies", enemies.into_shared())?;
//!
//! let goblin = manager.get_prefab_by_uid("enemies/goblin")?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod entry;
pub mod error;
pub mod handle;
pub mod import;
pub mod key;
pub mod manager;
pub mod registry;

pub use entry::ItemEntry;
pub use error::{AssetError, AssetResult};
pub use handle::{AssetHandle, AssetKind};
pub use import::{derive_identifier, import_entries, ImportOptions, ImportReport};
pub use key::{composite_key, AssetKey, SEPARATOR};
pub use manager::{RegistryManager, Resolved, TaggedItems};
pub use registry::{Registry, SharedRegistry};
