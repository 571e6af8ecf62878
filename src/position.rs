//! Remembers the last page read for each file set.
//!
//! Positions live in a single JSON object keyed by [`Fingerprint`], rewritten
//! in full after every accepted change. Nothing is ever evicted.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::file_list::Fingerprint;

#[derive(Debug, Default)]
pub struct PositionStore {
    path: Option<PathBuf>,
    positions: BTreeMap<String, usize>,
}

impl PositionStore {
    /// Store that never touches the disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads positions from `path`. A missing, unreadable or malformed file
    /// yields an empty store; entries that are not non-negative integers are
    /// dropped.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let positions = match fs::read_to_string(&path) {
            Ok(text) => parse_positions(&text, &path),
            Err(e) => {
                debug!("No reading positions at {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        Self {
            path: Some(path),
            positions,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<usize> {
        self.positions.get(fingerprint.as_str()).copied()
    }

    /// Index to resume at when opening a set of `file_count` pages.
    ///
    /// A stored index past the second-to-last page means the set was
    /// finished or has shrunk, so reading starts over at 0.
    pub fn restore(&self, fingerprint: &Fingerprint, file_count: usize) -> usize {
        match self.get(fingerprint) {
            Some(index) if index < file_count.saturating_sub(1) => index,
            _ => 0,
        }
    }

    /// Records `index` and flushes to disk.
    ///
    /// Index 0 is only written when the set already has a record; returns
    /// whether anything changed.
    pub fn set(&mut self, fingerprint: &Fingerprint, index: usize) -> Result<bool> {
        let key = fingerprint.as_str();
        match self.positions.get(key) {
            None if index == 0 => return Ok(false),
            Some(&current) if current == index => return Ok(false),
            _ => {}
        }
        self.positions.insert(key.to_owned(), index);
        self.flush()?;
        Ok(true)
    }

    fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(&self.positions).map_err(|source| Error::State {
            path: path.clone(),
            source,
        })?;
        fs::write(path, json)?;
        Ok(())
    }
}

fn parse_positions(text: &str, path: &Path) -> BTreeMap<String, usize> {
    let raw: BTreeMap<String, Value> = match serde_json::from_str(text) {
        Ok(map) => map,
        Err(e) => {
            warn!("Discarding malformed reading positions in {}: {}", path.display(), e);
            return BTreeMap::new();
        }
    };

    raw.into_iter()
        .filter_map(|(key, value)| {
            let index = value.as_u64().and_then(|i| usize::try_from(i).ok());
            if index.is_none() {
                debug!("Ignoring position entry {key:?}: {value}");
            }
            Some((key, index?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(s: &str) -> Fingerprint {
        Fingerprint::from(s.to_owned())
    }

    #[test]
    fn set_then_get() {
        let mut store = PositionStore::in_memory();
        assert!(store.set(&fp("abc"), 5).unwrap());
        assert_eq!(store.get(&fp("abc")), Some(5));
    }

    #[test]
    fn first_page_is_not_recorded_without_prior_entry() {
        let mut store = PositionStore::in_memory();
        assert!(!store.set(&fp("abc"), 0).unwrap());
        assert_eq!(store.get(&fp("abc")), None);
        assert!(store.is_empty());
    }

    #[test]
    fn first_page_overwrites_existing_entry() {
        let mut store = PositionStore::in_memory();
        store.set(&fp("abc"), 3).unwrap();
        assert!(store.set(&fp("abc"), 0).unwrap());
        assert_eq!(store.get(&fp("abc")), Some(0));
    }

    #[test]
    fn restore_rejects_last_page_and_beyond() {
        let mut store = PositionStore::in_memory();
        store.set(&fp("abc"), 9).unwrap();
        assert_eq!(store.restore(&fp("abc"), 11), 9);
        assert_eq!(store.restore(&fp("abc"), 10), 0);
        assert_eq!(store.restore(&fp("abc"), 3), 0);
        assert_eq!(store.restore(&fp("missing"), 100), 0);
    }

    #[test]
    fn oversized_stored_index_restarts_from_first() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("current_indexes.json");
        fs::write(&path, r#"{"k": 18446744073709551615}"#).unwrap();

        let store = PositionStore::load(&path);
        assert_eq!(store.restore(&fp("k"), 10), 0);
        assert_eq!(store.restore(&fp("k"), 0), 0);
    }

    #[test]
    fn restore_on_tiny_sets_starts_at_zero() {
        let mut store = PositionStore::in_memory();
        store.set(&fp("abc"), 1).unwrap();
        assert_eq!(store.restore(&fp("abc"), 1), 0);
        assert_eq!(store.restore(&fp("abc"), 0), 0);
        assert_eq!(store.restore(&fp("abc"), 3), 1);
    }

    #[test]
    fn persists_across_loads() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state/current_indexes.json");

        let mut store = PositionStore::load(&path);
        assert!(store.is_empty());
        store.set(&fp("-12345"), 7).unwrap();

        let reloaded = PositionStore::load(&path);
        assert_eq!(reloaded.get(&fp("-12345")), Some(7));
        assert_eq!(reloaded.path(), Some(path.as_path()));
    }

    #[test]
    fn malformed_file_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("current_indexes.json");
        fs::write(&path, "{not json").unwrap();

        let store = PositionStore::load(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn non_integer_entries_are_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("current_indexes.json");
        fs::write(&path, r#"{"a": 4, "b": "7", "c": -1, "d": 2.5, "e": null}"#).unwrap();

        let store = PositionStore::load(&path);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&fp("a")), Some(4));
    }

    #[test]
    fn non_object_json_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("current_indexes.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        assert!(PositionStore::load(&path).is_empty());
    }
}
