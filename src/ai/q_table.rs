use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use dashmap::DashMap;

use super::state_encoding::{KeyParseError, LearningStateKey};
use crate::error::ModelError;
use crate::game::PIECES_PER_SEAT;

/// Separates the state key from the piece index in persisted entry names.
const ACTION_SEPARATOR: char = '#';

/// Thread-safe Q-value table keyed by (learning state, piece index).
///
/// Backed by a sharded map: every write holds its shard lock for the whole
/// read-modify-write, so concurrent updates of one entry never interleave
/// and readers never see a torn value. Missing entries read as 0.0.
#[derive(Debug, Default)]
pub struct QTable {
    entries: DashMap<(LearningStateKey, usize), f64>,
}

impl QTable {
    pub fn new() -> Self {
        QTable {
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored value, 0.0 if never updated.
    pub fn value(&self, key: &LearningStateKey, piece: usize) -> f64 {
        self.entries.get(&(*key, piece)).map_or(0.0, |v| *v)
    }

    /// Highest stored value among `pieces`, or `None` if `pieces` is empty.
    pub fn max_value(&self, key: &LearningStateKey, pieces: impl IntoIterator<Item = usize>) -> Option<f64> {
        pieces
            .into_iter()
            .map(|piece| self.value(key, piece))
            .reduce(f64::max)
    }

    /// Atomically replace an entry with `f(old)` and return the new value.
    pub fn update_with(&self, key: LearningStateKey, piece: usize, f: impl FnOnce(f64) -> f64) -> f64 {
        let mut entry = self.entries.entry((key, piece)).or_insert(0.0);
        let new_value = f(*entry);
        *entry = new_value;
        new_value
    }

    /// Flat, sorted copy of the table in its persisted string form.
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        self.entries
            .iter()
            .map(|entry| {
                let (key, piece) = entry.key();
                (format!("{key}{ACTION_SEPARATOR}{piece}"), *entry.value())
            })
            .collect()
    }

    /// Write the table as a JSON object, via a temp file renamed into place.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let write_err = |source| ModelError::Write {
            path: path.to_path_buf(),
            source,
        };
        let snapshot = self.snapshot();
        let tmp = PathBuf::from(format!("{}.tmp", path.display()));

        let file = fs::File::create(&tmp).map_err(write_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &snapshot)?;
        writer.flush().map_err(write_err)?;
        drop(writer);

        fs::rename(&tmp, path).map_err(write_err)?;
        log::debug!("saved {} q-values to {}", snapshot.len(), path.display());
        Ok(())
    }

    /// Read a table written by [`QTable::save`]. Any malformed entry rejects
    /// the whole file.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let content = fs::read_to_string(path).map_err(|source| ModelError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let flat: BTreeMap<String, f64> =
            serde_json::from_str(&content).map_err(|source| ModelError::CorruptFormat {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_snapshot(flat, path)
    }

    /// Build a table from its flat string form; `origin` names the source in errors.
    pub fn from_snapshot(flat: BTreeMap<String, f64>, origin: &Path) -> Result<Self, ModelError> {
        let entries = DashMap::with_capacity(flat.len());
        for (name, value) in flat {
            let corrupt = |reason: String| ModelError::CorruptEntry {
                path: origin.to_path_buf(),
                entry: name.clone(),
                reason,
            };
            let (key, piece) = name
                .split_once(ACTION_SEPARATOR)
                .ok_or_else(|| corrupt(format!("missing '{ACTION_SEPARATOR}' separator")))?;
            let key: LearningStateKey = key
                .parse()
                .map_err(|e: KeyParseError| corrupt(e.to_string()))?;
            let piece: usize = piece
                .parse()
                .ok()
                .filter(|&p| p < PIECES_PER_SEAT)
                .ok_or_else(|| corrupt(format!("piece must be 0..{PIECES_PER_SEAT}")))?;
            if !value.is_finite() {
                return Err(corrupt(format!("value {value} is not finite")));
            }
            entries.insert((key, piece), value);
        }
        Ok(QTable { entries })
    }
}
