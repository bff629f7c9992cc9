//! # Asset Kinds and Handles
//!
//! The engine never loads asset content. It only passes around opaque,
//! non-owning handles issued by the host asset system.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of asset kinds a registry can be locked to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// An instantiable template object.
    Prefab,
    /// Image data.
    Texture,
    /// Shading parameters.
    Material,
    /// Geometry.
    Mesh,
    /// Sound clip.
    Audio,
}

impl AssetKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Prefab,
        Self::Texture,
        Self::Material,
        Self::Mesh,
        Self::Audio,
    ];

    /// Lowercase name, as used in config files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prefab => "prefab",
            Self::Texture => "texture",
            Self::Material => "material",
            Self::Mesh => "mesh",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque reference to an asset owned by the host.
///
/// The handle carries its kind so registries can reject mismatched entries
/// at insertion time. The raw value is whatever the host uses to find the
/// resource again (a GUID, a slot index, an interned path).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AssetHandle {
    kind: AssetKind,
    raw: u64,
}

impl AssetHandle {
    /// Creates a handle of the given kind.
    #[inline]
    #[must_use]
    pub const fn new(kind: AssetKind, raw: u64) -> Self {
        Self { kind, raw }
    }

    /// Shorthand for a prefab handle.
    #[inline]
    #[must_use]
    pub const fn prefab(raw: u64) -> Self {
        Self::new(AssetKind::Prefab, raw)
    }

    /// The kind of asset this handle points at.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> AssetKind {
        self.kind
    }

    /// The host's raw identifier.
    #[inline]
    #[must_use]
    pub const fn raw(&self) -> u64 {
        self.raw
    }
}
