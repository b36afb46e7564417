//! Named-store registry.
//!
//! A YAML document maps logical store names to their path, declared
//! time-axis length, and resolution tier. Entries are loaded into typed
//! structs and validated up front; nothing in the write path ever parses
//! the document itself.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use geogrid_common::ResolutionTier;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// One registered store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreEntry {
    /// Absolute path of the Zarr store.
    pub path: PathBuf,
    /// Declared time-axis length; `None` marks a timeless store.
    #[serde(default)]
    pub periods: Option<u64>,
    /// Resolution tier whose identifier space keys the rows.
    pub resolution: ResolutionTier,
}

/// Registry of named stores backed by a YAML document.
#[derive(Debug)]
pub struct StoreRegistry {
    doc_path: PathBuf,
    entries: BTreeMap<String, StoreEntry>,
}

impl StoreRegistry {
    /// Load the registry document; a missing file loads as empty.
    pub fn load(doc_path: impl Into<PathBuf>) -> Result<Self> {
        let doc_path = doc_path.into();
        let entries = match std::fs::read_to_string(&doc_path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_yaml::from_str(&content)
                .map_err(|e| StoreError::RegistryParse(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(StoreError::RegistryIo(format!(
                    "{}: {}",
                    doc_path.display(),
                    e
                )))
            }
        };

        let registry = Self { doc_path, entries };
        for (name, entry) in &registry.entries {
            validate_entry(name, entry)?;
        }
        Ok(registry)
    }

    /// Resolve a name to its entry.
    pub fn get(&self, name: &str) -> Result<&StoreEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| StoreError::UnknownStore(name.to_string()))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All entries.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &StoreEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Add or update an entry and persist the document.
    pub fn add(&mut self, name: impl Into<String>, entry: StoreEntry) -> Result<()> {
        let name = name.into();
        validate_entry(&name, &entry)?;
        self.entries.insert(name, entry);
        self.persist()
    }

    /// Remove an entry and persist the document.
    ///
    /// Does not touch the data at the entry's path.
    pub fn remove(&mut self, name: &str) -> Result<StoreEntry> {
        let entry = self
            .entries
            .remove(name)
            .ok_or_else(|| StoreError::UnknownStore(name.to_string()))?;
        self.persist()?;
        Ok(entry)
    }

    /// Path of the backing document.
    pub fn doc_path(&self) -> &Path {
        &self.doc_path
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.doc_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::RegistryIo(e.to_string()))?;
        }
        let content = serde_yaml::to_string(&self.entries)
            .map_err(|e| StoreError::RegistryParse(e.to_string()))?;
        std::fs::write(&self.doc_path, content).map_err(|e| {
            StoreError::RegistryIo(format!("{}: {}", self.doc_path.display(), e))
        })?;
        tracing::debug!(
            path = %self.doc_path.display(),
            entries = self.entries.len(),
            "persisted store registry"
        );
        Ok(())
    }
}

fn validate_entry(name: &str, entry: &StoreEntry) -> Result<()> {
    if name.is_empty() {
        return Err(StoreError::InvalidEntry {
            name: name.to_string(),
            message: "name must not be empty".to_string(),
        });
    }
    if entry.path.as_os_str().is_empty() {
        return Err(StoreError::InvalidEntry {
            name: name.to_string(),
            message: "path must not be empty".to_string(),
        });
    }
    if entry.periods == Some(0) {
        return Err(StoreError::InvalidEntry {
            name: name.to_string(),
            message: "periods must be > 0 when declared".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> StoreEntry {
        StoreEntry {
            path: PathBuf::from("/data/tmy_10km.zarr"),
            periods: Some(8760),
            resolution: ResolutionTier::Km10,
        }
    }

    #[test]
    fn test_missing_document_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = StoreRegistry::load(dir.path().join("stores.yaml")).unwrap();
        assert_eq!(registry.names().count(), 0);
    }

    #[test]
    fn test_add_get_remove_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let doc = dir.path().join("stores.yaml");

        let mut registry = StoreRegistry::load(&doc).unwrap();
        registry.add("tmy_10km", sample_entry()).unwrap();

        // Reload from disk to prove persistence.
        let reloaded = StoreRegistry::load(&doc).unwrap();
        assert_eq!(reloaded.get("tmy_10km").unwrap(), &sample_entry());

        let mut reloaded = reloaded;
        reloaded.remove("tmy_10km").unwrap();
        assert!(matches!(
            reloaded.get("tmy_10km"),
            Err(StoreError::UnknownStore(_))
        ));

        let after = StoreRegistry::load(&doc).unwrap();
        assert_eq!(after.names().count(), 0);
    }

    #[test]
    fn test_remove_unknown_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut registry = StoreRegistry::load(dir.path().join("stores.yaml")).unwrap();
        assert!(matches!(
            registry.remove("nope"),
            Err(StoreError::UnknownStore(_))
        ));
    }

    #[test]
    fn test_timeless_entry_parses() {
        let dir = tempfile::tempdir().expect("tempdir");
        let doc = dir.path().join("stores.yaml");
        std::fs::write(
            &doc,
            "elevation:\n  path: /data/elevation.zarr\n  resolution: 4km\n",
        )
        .unwrap();

        let registry = StoreRegistry::load(&doc).unwrap();
        let entry = registry.get("elevation").unwrap();
        assert_eq!(entry.periods, None);
        assert_eq!(entry.resolution, ResolutionTier::Km4);
    }

    #[test]
    fn test_invalid_periods_rejected_on_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let doc = dir.path().join("stores.yaml");
        std::fs::write(
            &doc,
            "bad:\n  path: /data/bad.zarr\n  periods: 0\n  resolution: 4km\n",
        )
        .unwrap();

        assert!(matches!(
            StoreRegistry::load(&doc),
            Err(StoreError::InvalidEntry { .. })
        ));
    }
}
