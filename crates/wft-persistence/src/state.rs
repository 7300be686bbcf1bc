//! ---
//! wft_section: "03-persistence"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Persistence abstractions and storage bindings."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{PersistenceError, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct KeyFile {
    #[serde(default)]
    items: Vec<String>,
}

/// Directory of named processed-key sets, one `<name>.json` per set.
#[derive(Debug, Clone)]
pub struct ProcessedKeyStore {
    root: PathBuf,
}

impl ProcessedKeyStore {
    /// Store rooted at `root`; the directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// State directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing the set called `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    /// Load a set; a missing file is an empty set.
    pub fn load(&self, name: &str) -> Result<BTreeSet<String>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(BTreeSet::new());
        }
        let file: KeyFile = serde_json::from_reader(BufReader::new(File::open(&path)?))?;
        Ok(file.items.into_iter().collect())
    }

    /// Replace the set wholesale. The file is swapped in atomically.
    pub fn save(&self, name: &str, items: &BTreeSet<String>) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(name);
        let staging = tempfile::Builder::new()
            .prefix(&format!(".{name}-"))
            .suffix(".json.tmp")
            .tempfile_in(&self.root)?;
        let mut writer = BufWriter::new(staging);
        serde_json::to_writer_pretty(
            &mut writer,
            &KeyFile {
                items: items.iter().cloned().collect(),
            },
        )?;
        writer.flush()?;
        let staging = writer
            .into_inner()
            .map_err(|err| PersistenceError::Io(err.into_error()))?;
        staging
            .persist(&path)
            .map_err(|err| PersistenceError::Persist {
                path: path.clone(),
                source: err.error,
            })?;
        debug!(state = name, keys = items.len(), "processed-key set saved");
        Ok(())
    }

    /// Load `name` into a [`ProcessedSet`] that tracks uncommitted additions.
    pub fn open(&self, name: &str) -> Result<ProcessedSet> {
        Ok(ProcessedSet {
            store: self.clone(),
            name: name.to_owned(),
            committed: self.load(name)?,
            pending: BTreeSet::new(),
        })
    }
}

/// In-memory view of one processed-key set.
///
/// Keys added through [`ProcessedSet::insert`] are only written by
/// [`ProcessedSet::commit`], so a stage that fails before committing leaves
/// the persisted set untouched.
#[derive(Debug, Clone)]
pub struct ProcessedSet {
    store: ProcessedKeyStore,
    name: String,
    committed: BTreeSet<String>,
    pending: BTreeSet<String>,
}

impl ProcessedSet {
    /// Whether `key` was persisted earlier or added since opening.
    pub fn contains(&self, key: &str) -> bool {
        self.committed.contains(key) || self.pending.contains(key)
    }

    /// Queue a key; returns `false` if it is already known.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.committed.contains(&key) {
            return false;
        }
        self.pending.insert(key)
    }

    /// Keys queued since the set was opened or last committed.
    pub fn pending(&self) -> &BTreeSet<String> {
        &self.pending
    }

    /// Total number of known keys.
    pub fn len(&self) -> usize {
        self.committed.len() + self.pending.len()
    }

    /// Whether the set holds no keys at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist queued keys. Writes nothing when there are none; returns the
    /// number of newly persisted keys.
    pub fn commit(&mut self) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let mut merged = self.committed.clone();
        merged.extend(self.pending.iter().cloned());
        self.store.save(&self.name, &merged)?;
        let added = self.pending.len();
        self.committed = merged;
        self.pending.clear();
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempdir().unwrap();
        let store = ProcessedKeyStore::new(dir.path().join("_state"));
        assert!(store.load("silver_processed_hours").unwrap().is_empty());
        assert!(!store.root().exists());
    }

    #[test]
    fn saved_items_are_sorted() {
        let dir = tempdir().unwrap();
        let store = ProcessedKeyStore::new(dir.path());
        let items: BTreeSet<String> = ["b|F001|h", "a|F001|h"].iter().map(|s| s.to_string()).collect();
        store.save("keys", &items).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path_for("keys")).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"items": ["a|F001|h", "b|F001|h"]}));
        assert_eq!(store.load("keys").unwrap(), items);
    }

    #[test]
    fn commit_only_writes_when_keys_were_added() {
        let dir = tempdir().unwrap();
        let store = ProcessedKeyStore::new(dir.path());
        let mut set = store.open("gold_processed_hours").unwrap();
        assert_eq!(set.commit().unwrap(), 0);
        assert!(!store.path_for("gold_processed_hours").exists());

        assert!(set.insert("SIM-A|F001|2026-01-05T00:00:00Z"));
        assert!(!set.insert("SIM-A|F001|2026-01-05T00:00:00Z"));
        assert!(set.contains("SIM-A|F001|2026-01-05T00:00:00Z"));
        assert!(store.load("gold_processed_hours").unwrap().is_empty());

        assert_eq!(set.commit().unwrap(), 1);
        assert!(set.pending().is_empty());
        assert_eq!(store.load("gold_processed_hours").unwrap().len(), 1);

        let mut reopened = store.open("gold_processed_hours").unwrap();
        assert!(!reopened.insert("SIM-A|F001|2026-01-05T00:00:00Z"));
        assert_eq!(reopened.len(), 1);
    }
}
