//! # Pool Configuration
//!
//! Loaded once at startup from TOML:
//!
//! ```toml
//! default_max_size = 16
//! auto_cleanup_threshold = 2000
//!
//! [max_sizes]
//! "enemies/goblin" = 64
//! "fx/spark" = 0        # 0 = uncapped
//! ```
//!
//! A cap limits the FREE list of a pool; active instances are never capped.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};

/// Free-list cap used when neither the file nor the caller sets one.
pub const DEFAULT_MAX_SIZE: usize = 32;

/// Pooling limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Free-list cap for pools without an entry in `max_sizes`. 0 = uncapped.
    pub default_max_size: usize,
    /// Per-identifier caps, keyed by composite key or by the identifier as
    /// passed to spawn. 0 = uncapped.
    pub max_sizes: HashMap<String, usize>,
    /// Total (free + active) instance count above which auto-cleanup runs.
    pub auto_cleanup_threshold: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            default_max_size: DEFAULT_MAX_SIZE,
            max_sizes: HashMap::new(),
            auto_cleanup_threshold: None,
        }
    }
}

impl PoolConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if the document is malformed.
    pub fn from_toml_str(source: &str) -> PoolResult<Self> {
        toml::from_str(source).map_err(|e| PoolError::InvalidConfig(e.to_string()))
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if the file cannot be read or
    /// parsed.
    pub fn load(path: impl AsRef<Path>) -> PoolResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| PoolError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// No caps and no auto-cleanup.
    #[must_use]
    pub fn uncapped() -> Self {
        Self {
            default_max_size: 0,
            ..Self::default()
        }
    }

    /// Sets the default cap. 0 = uncapped.
    #[must_use]
    pub const fn with_default_max_size(mut self, max_size: usize) -> Self {
        self.default_max_size = max_size;
        self
    }

    /// Sets a per-identifier cap. 0 = uncapped.
    #[must_use]
    pub fn with_max_size(mut self, identifier: impl Into<String>, max_size: usize) -> Self {
        self.max_sizes.insert(identifier.into(), max_size);
        self
    }

    /// Enables auto-cleanup above `threshold` instances.
    #[must_use]
    pub const fn with_auto_cleanup(mut self, threshold: usize) -> Self {
        self.auto_cleanup_threshold = Some(threshold);
        self
    }

    /// The cap for a pool, looked up by canonical key, then by the key the
    /// caller used. `None` means uncapped.
    #[must_use]
    pub fn max_size_for(&self, canonical: &str, requested: &str) -> Option<usize> {
        let raw = self
            .max_sizes
            .get(canonical)
            .or_else(|| self.max_sizes.get(requested))
            .copied()
            .unwrap_or(self.default_max_size);
        cap(raw)
    }
}

/// Maps the on-disk convention (0 = uncapped) to an optional cap.
#[inline]
#[must_use]
pub const fn cap(max_size: usize) -> Option<usize> {
    if max_size == 0 {
        None
    } else {
        Some(max_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_document() {
        let config = PoolConfig::from_toml_str(
            r#"
            default_max_size = 16
            auto_cleanup_threshold = 2000

            [max_sizes]
            "enemies/goblin" = 64
            "spark" = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.default_max_size, 16);
        assert_eq!(config.auto_cleanup_threshold, Some(2000));
        assert_eq!(config.max_size_for("enemies/goblin", "goblin"), Some(64));
        assert_eq!(config.max_size_for("fx/spark", "spark"), None);
        assert_eq!(config.max_size_for("props/crate", "crate"), Some(16));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = PoolConfig::from_toml_str("").unwrap();
        assert_eq!(config, PoolConfig::default());
        assert_eq!(config.max_size_for("a/b", "b"), Some(DEFAULT_MAX_SIZE));
    }

    #[test]
    fn test_malformed_document_rejected() {
        let err = PoolConfig::from_toml_str("default_max_size = \"lots\"").unwrap_err();
        assert!(matches!(err, PoolError::InvalidConfig(_)));
    }

    #[test]
    fn test_load_from_file() {
        let id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("test_pool_config_{id}.toml"));
        std::fs::write(&path, "default_max_size = 4\n").unwrap();

        let config = PoolConfig::load(&path).unwrap();
        assert_eq!(config.default_max_size, 4);

        std::fs::remove_file(&path).ok();
        assert!(PoolConfig::load(&path).is_err());
    }

    #[test]
    fn test_builders() {
        let config = PoolConfig::uncapped()
            .with_max_size("X", 2)
            .with_auto_cleanup(10);
        assert_eq!(config.max_size_for("bucket/X", "X"), Some(2));
        assert_eq!(config.max_size_for("bucket/Y", "Y"), None);
        assert_eq!(PoolConfig::default().with_default_max_size(8).default_max_size, 8);
    }
}
