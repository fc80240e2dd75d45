use comms::{Key, Val};

use super::Result;

/// The key to value map behind a model on one shard.
///
/// `add` accumulates: the stored value becomes the previous one plus the delta,
/// a key that was never added starts at `0`.
pub trait Storage: Send {
    /// Accumulates `vals` into the entries of `keys`, creating the missing ones.
    ///
    /// # Arguments
    /// * `keys` - The keys to update.
    /// * `vals` - The deltas, one per key.
    ///
    /// # Returns
    /// A `StorageErr::LengthMismatch` if both slices differ in length, in which case
    /// nothing is applied.
    fn add(&mut self, keys: &[Key], vals: &[Val]) -> Result<()>;

    /// Reads the current value of every key.
    ///
    /// # Arguments
    /// * `keys` - The keys to read.
    ///
    /// # Returns
    /// The values in the order of `keys` or a `StorageErr::MissingKeys` listing every
    /// key that was never added.
    fn get(&self, keys: &[Key]) -> Result<Vec<Val>>;

    /// Every stored entry sorted by key.
    fn entries(&self) -> Vec<(Key, Val)>;

    /// Replaces the whole content with `entries`.
    fn restore(&mut self, entries: &[(Key, Val)]);

    /// The amount of stored keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
