//! # Import Helpers
//!
//! Pure functions used by bulk importers (editor tools, build scripts) to
//! turn asset paths into registry entries. Nothing here touches the file
//! system: the caller walks the folders and hands over relative paths.

use crate::entry::ItemEntry;
use crate::error::AssetError;
use crate::handle::AssetHandle;
use crate::key::SEPARATOR;
use crate::registry::Registry;

/// Derives a registry identifier from a path relative to the import root.
///
/// - Backslashes are normalised to `/`; leading `./` and `/` are dropped.
/// - The extension of the file name is stripped (`goblin.prefab` → `goblin`).
///   A leading dot is part of the name, not an extension.
/// - With `keep_subfolders`, folders stay in the identifier
///   (`orcs/chief.prefab` → `orcs/chief`); otherwise only the stem is kept.
///
/// Returns `None` when nothing usable is left.
#[must_use]
pub fn derive_identifier(relative_path: &str, keep_subfolders: bool) -> Option<String> {
    let normalised = relative_path.replace('\\', "/");
    let mut path = normalised.as_str();
    loop {
        if let Some(rest) = path.strip_prefix("./") {
            path = rest;
        } else if let Some(rest) = path.strip_prefix('/') {
            path = rest;
        } else {
            break;
        }
    }

    let (folders, file_name) = match path.rsplit_once('/') {
        Some((folders, file_name)) => (folders, file_name),
        None => ("", path),
    };
    let stem = match file_name.rfind('.') {
        Some(dot) if dot > 0 => &file_name[..dot],
        _ => file_name,
    };
    if stem.is_empty() {
        return None;
    }

    let folders: Vec<&str> = folders
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    if !keep_subfolders || folders.is_empty() {
        return Some(stem.to_string());
    }

    let mut identifier = folders.join("/");
    identifier.push(SEPARATOR);
    identifier.push_str(stem);
    Some(identifier)
}

/// Settings for turning paths into entries.
#[derive(Clone, Debug, Default)]
pub struct ImportOptions {
    /// Keep folder names in identifiers.
    pub keep_subfolders: bool,
    /// Accepted extensions, lowercase, without the dot. Empty accepts all.
    pub extensions: Vec<String>,
    /// Tags applied to every imported entry.
    pub default_tags: Vec<String>,
}

impl ImportOptions {
    /// Creates options that accept every file and drop folder names.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps folder names in identifiers.
    #[must_use]
    pub const fn with_subfolders(mut self, keep: bool) -> Self {
        self.keep_subfolders = keep;
        self
    }

    /// Accepts files with this extension (case-insensitive, dot optional).
    #[must_use]
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extensions
            .push(extension.trim_start_matches('.').to_ascii_lowercase());
        self
    }

    /// Tags every imported entry with `tag`.
    #[must_use]
    pub fn with_default_tag(mut self, tag: impl Into<String>) -> Self {
        self.default_tags.push(tag.into());
        self
    }

    /// Checks the extension filter.
    #[must_use]
    pub fn accepts(&self, path: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        match file_name.rsplit_once('.') {
            Some((stem, extension)) if !stem.is_empty() => self
                .extensions
                .iter()
                .any(|accepted| accepted.eq_ignore_ascii_case(extension)),
            _ => false,
        }
    }

    /// Builds an entry for `path`, or `None` if the path is filtered out or
    /// yields no identifier.
    #[must_use]
    pub fn entry_for(&self, path: &str, asset: AssetHandle) -> Option<ItemEntry> {
        if !self.accepts(path) {
            return None;
        }
        let identifier = derive_identifier(path, self.keep_subfolders)?;
        let entry = ItemEntry::new(identifier, asset).ok()?;
        Some(entry.with_tags(self.default_tags.iter().cloned()))
    }
}

/// Outcome of a batch import.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Identifiers that were added, in input order.
    pub added: Vec<String>,
    /// Entries that were skipped and why.
    pub skipped: Vec<(String, AssetError)>,
}

impl ImportReport {
    /// True if every entry was added.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Adds a batch of entries, skipping (not aborting on) rejected ones.
pub fn import_entries<I>(registry: &mut Registry, entries: I) -> ImportReport
where
    I: IntoIterator<Item = ItemEntry>,
{
    let mut report = ImportReport::default();

    for entry in entries {
        let identifier = entry.identifier().to_string();
        match registry.add_item(entry) {
            Ok(_) => report.added.push(identifier),
            Err(error) => {
                tracing::warn!(registry = %registry.name(), identifier = %identifier, %error, "import skipped entry");
                report.skipped.push((identifier, error));
            }
        }
    }

    tracing::debug!(
        registry = %registry.name(),
        added = report.added.len(),
        skipped = report.skipped.len(),
        "import batch finished"
    );
    report
}
