//! # Item Entries
//!
//! The leaf record stored in a registry: an identifier, the asset handle it
//! resolves to, free-form tags and string metadata.
//!
//! Metadata is deliberately schema-less. Values are stored as strings and
//! parsing them into numbers, flags or colours is up to the caller.

use std::collections::{BTreeSet, HashMap};

use crate::error::{AssetError, AssetResult};
use crate::handle::{AssetHandle, AssetKind};

/// A single registry record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemEntry {
    identifier: String,
    asset: AssetHandle,
    tags: BTreeSet<String>,
    metadata: HashMap<String, String>,
    description: String,
}

impl ItemEntry {
    /// Creates an entry with no tags, metadata or description.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::EmptyIdentifier`] if `identifier` is empty.
    pub fn new(identifier: impl Into<String>, asset: AssetHandle) -> AssetResult<Self> {
        let identifier = identifier.into();
        if identifier.is_empty() {
            return Err(AssetError::EmptyIdentifier);
        }

        Ok(Self {
            identifier,
            asset,
            tags: BTreeSet::new(),
            metadata: HashMap::new(),
            description: String::new(),
        })
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Adds several tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Sets a metadata value, replacing any previous value for `key`.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// The local identifier.
    #[inline]
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The asset this entry resolves to.
    #[inline]
    #[must_use]
    pub const fn asset(&self) -> AssetHandle {
        self.asset
    }

    /// Shorthand for `self.asset().kind()`.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> AssetKind {
        self.asset.kind()
    }

    /// All tags, sorted.
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Checks for a tag.
    #[inline]
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Raw metadata value for `key`.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// The whole metadata map.
    #[must_use]
    pub fn metadata_map(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Documentation text.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_identifier_rejected() {
        let result = ItemEntry::new("", AssetHandle::prefab(1));
        assert_eq!(result, Err(AssetError::EmptyIdentifier));
    }

    #[test]
    fn test_builder_fills_fields() {
        let entry = ItemEntry::new("goblin", AssetHandle::prefab(1))
            .unwrap()
            .with_tag("hostile")
            .with_tags(["melee", "hostile"])
            .with_metadata("hp", "30")
            .with_description("Small and angry");

        assert_eq!(entry.identifier(), "goblin");
        assert_eq!(entry.kind(), AssetKind::Prefab);
        assert_eq!(entry.tags().len(), 2);
        assert!(entry.has_tag("melee"));
        assert!(!entry.has_tag("ranged"));
        assert_eq!(entry.metadata("hp"), Some("30"));
        assert_eq!(entry.metadata("hp").and_then(|v| v.parse::<u32>().ok()), Some(30));
        assert_eq!(entry.metadata("speed"), None);
        assert_eq!(entry.description(), "Small and angry");
    }
}
