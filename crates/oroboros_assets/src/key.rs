//! # Lookup Keys
//!
//! A key is either bare (`goblin`) or composite (`enemies/goblin`). The
//! separator splits on its FIRST occurrence, so `enemies/orcs/chief` is the
//! identifier `orcs/chief` inside bucket `enemies`.

use crate::error::{AssetError, AssetResult};

/// Separates the bucket name from the identifier in a composite key.
pub const SEPARATOR: char = '/';

/// A parsed lookup key borrowing from the input string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKey<'a> {
    /// Identifier without a bucket.
    Bare(&'a str),
    /// Bucket-qualified identifier.
    Composite {
        /// Bucket name.
        bucket: &'a str,
        /// Identifier local to the bucket's registry.
        identifier: &'a str,
    },
}

impl<'a> AssetKey<'a> {
    /// Parses a key.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::InvalidKey`] if the key is empty or either side
    /// of the separator is empty.
    pub fn parse(key: &'a str) -> AssetResult<Self> {
        if key.is_empty() {
            return Err(AssetError::InvalidKey(String::new()));
        }

        match key.split_once(SEPARATOR) {
            None => Ok(Self::Bare(key)),
            Some((bucket, identifier)) if !bucket.is_empty() && !identifier.is_empty() => {
                Ok(Self::Composite { bucket, identifier })
            }
            Some(_) => Err(AssetError::InvalidKey(key.to_string())),
        }
    }

    /// The identifier part.
    #[must_use]
    pub const fn identifier(&self) -> &'a str {
        match *self {
            Self::Bare(identifier) | Self::Composite { identifier, .. } => identifier,
        }
    }
}

/// Builds `bucket/identifier`.
#[must_use]
pub fn composite_key(bucket: &str, identifier: &str) -> String {
    let mut key = String::with_capacity(bucket.len() + identifier.len() + 1);
    key.push_str(bucket);
    key.push(SEPARATOR);
    key.push_str(identifier);
    key
}

/// Checks that `name` can be used as a bucket name.
///
/// # Errors
///
/// Returns [`AssetError::InvalidKey`] for empty names and names containing
/// the separator.
pub fn validate_bucket_name(name: &str) -> AssetResult<()> {
    if name.is_empty() || name.contains(SEPARATOR) {
        return Err(AssetError::InvalidKey(name.to_string()));
    }
    Ok(())
}
