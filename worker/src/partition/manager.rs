use std::collections::BTreeMap;

use comms::{Key, ShardId, Val};

use super::{PartitionErr, Result};

/// Maps every key to the shard owning it.
pub trait PartitionManager: Send + Sync {
    /// Every configured shard, in ascending order.
    fn shard_ids(&self) -> &[ShardId];

    /// The shard owning `key`.
    ///
    /// # Returns
    /// The shard id or `PartitionErr::UnownedKey`.
    fn owner(&self, key: Key) -> Result<ShardId>;

    /// Splits `keys` into one batch per owning shard.
    ///
    /// # Arguments
    /// * `keys` - The keys to split.
    ///
    /// # Returns
    /// The non empty batches in ascending shard order, keys keep their input order.
    fn slice_keys(&self, keys: &[Key]) -> Result<Vec<(ShardId, Vec<Key>)>> {
        let mut slices: BTreeMap<ShardId, Vec<Key>> = BTreeMap::new();

        for &key in keys {
            slices.entry(self.owner(key)?).or_default().push(key);
        }

        Ok(slices.into_iter().collect())
    }

    /// Splits `keys` and their `vals` into one batch per owning shard.
    ///
    /// # Arguments
    /// * `keys` - The keys to split.
    /// * `vals` - The value of each key.
    ///
    /// # Returns
    /// The non empty batches in ascending shard order, pairs keep their input order.
    fn slice_pairs(&self, keys: &[Key], vals: &[Val]) -> Result<Vec<(ShardId, Vec<Key>, Vec<Val>)>> {
        if keys.len() != vals.len() {
            return Err(PartitionErr::LengthMismatch {
                keys: keys.len(),
                vals: vals.len(),
            });
        }

        let mut slices: BTreeMap<ShardId, (Vec<Key>, Vec<Val>)> = BTreeMap::new();

        for (&key, &val) in keys.iter().zip(vals) {
            let (ks, vs) = slices.entry(self.owner(key)?).or_default();
            ks.push(key);
            vs.push(val);
        }

        Ok(slices
            .into_iter()
            .map(|(shard, (ks, vs))| (shard, ks, vs))
            .collect())
    }
}
