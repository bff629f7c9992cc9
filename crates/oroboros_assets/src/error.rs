//! # Asset Error Types
//!
//! All errors that can occur while building or querying registries.

use thiserror::Error;

use crate::handle::AssetKind;

/// Errors that can occur in the registry layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// An entry with this identifier already exists in the registry.
    #[error("duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    /// A registry is already attached under this bucket name.
    #[error("duplicate bucket: {0}")]
    DuplicateBucket(String),

    /// The asset kind does not match what the registry or caller expects.
    #[error("type mismatch for {identifier}: expected {expected}, found {found}")]
    TypeMismatch {
        /// The identifier (or key) being inserted or resolved.
        identifier: String,
        /// The kind that was required.
        expected: AssetKind,
        /// The kind that was actually present.
        found: AssetKind,
    },

    /// The bucket part of a composite key names no registry.
    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    /// Nothing is registered under this key.
    #[error("not found: {0}")]
    NotFound(String),

    /// A bare identifier exists in more than one bucket.
    #[error("ambiguous identifier {identifier}: present in buckets {buckets:?}")]
    AmbiguousIdentifier {
        /// The bare identifier that was requested.
        identifier: String,
        /// Every bucket that contains it, in bucket order.
        buckets: Vec<String>,
    },

    /// An entry was created with an empty identifier.
    #[error("identifier must not be empty")]
    EmptyIdentifier,

    /// A key or bucket name is malformed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The registry already holds items, so its asset kind is fixed.
    #[error("registry {registry} is locked to {kind}: it already holds items")]
    CategoryLocked {
        /// Name of the registry.
        registry: String,
        /// Its current asset kind.
        kind: AssetKind,
    },
}

/// Result type for registry operations.
pub type AssetResult<T> = Result<T, AssetError>;

impl AssetError {
    /// Returns true for errors that mean "nothing resolved" rather than a
    /// malformed request or a conflict.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::BucketNotFound(_))
    }
}
