use std::collections::BTreeMap;

use comms::{Key, Val};

use super::{Result, Storage, StorageErr};

/// A `Storage` backed by an ordered map, only keys that were added take space.
#[derive(Debug, Default, Clone)]
pub struct MapStorage {
    entries: BTreeMap<Key, Val>,
}

impl MapStorage {
    /// Creates a new empty `MapStorage`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MapStorage {
    fn add(&mut self, keys: &[Key], vals: &[Val]) -> Result<()> {
        if keys.len() != vals.len() {
            return Err(StorageErr::LengthMismatch {
                keys: keys.len(),
                vals: vals.len(),
            });
        }

        for (&key, &val) in keys.iter().zip(vals) {
            *self.entries.entry(key).or_insert(0.) += val;
        }

        Ok(())
    }

    fn get(&self, keys: &[Key]) -> Result<Vec<Val>> {
        let mut vals = Vec::with_capacity(keys.len());
        let mut missing = Vec::new();

        for key in keys {
            match self.entries.get(key) {
                Some(&val) => vals.push(val),
                None => missing.push(*key),
            }
        }

        if !missing.is_empty() {
            return Err(StorageErr::MissingKeys(missing));
        }

        Ok(vals)
    }

    fn entries(&self) -> Vec<(Key, Val)> {
        self.entries.iter().map(|(&k, &v)| (k, v)).collect()
    }

    fn restore(&mut self, entries: &[(Key, Val)]) {
        self.entries = entries.iter().copied().collect();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
