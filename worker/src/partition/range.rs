use std::{collections::HashSet, ops::Range};

use comms::{Key, ShardId};

use super::{PartitionErr, PartitionManager, Result};

/// Assigns a contiguous half open key range to every shard.
#[derive(Debug, Clone)]
pub struct RangePartitionManager {
    /// Sorted by range start.
    ranges: Vec<(Range<Key>, ShardId)>,
    shard_ids: Vec<ShardId>,
}

impl RangePartitionManager {
    /// Creates a new `RangePartitionManager`.
    ///
    /// # Arguments
    /// * `shard_ids` - The shards, one per range.
    /// * `ranges` - The key range owned by the shard at the same position.
    ///
    /// # Returns
    /// A new `RangePartitionManager` or a `PartitionErr` if the lists have different
    /// lengths, a range is empty, ranges overlap or a shard repeats.
    pub fn new(shard_ids: Vec<ShardId>, ranges: Vec<Range<Key>>) -> Result<Self> {
        if shard_ids.len() != ranges.len() {
            return Err(PartitionErr::CountMismatch {
                shards: shard_ids.len(),
                ranges: ranges.len(),
            });
        }

        let mut seen = HashSet::with_capacity(shard_ids.len());
        for (&shard, range) in shard_ids.iter().zip(&ranges) {
            if range.is_empty() {
                return Err(PartitionErr::EmptyRange(shard));
            }

            if !seen.insert(shard) {
                return Err(PartitionErr::DuplicateShard(shard));
            }
        }

        let mut ranges: Vec<_> = ranges.into_iter().zip(shard_ids).collect();
        ranges.sort_unstable_by_key(|(range, _)| range.start);

        for pair in ranges.windows(2) {
            let [(prev, first), (next, second)] = pair else {
                continue;
            };

            if next.start < prev.end {
                return Err(PartitionErr::Overlap {
                    first: *first,
                    second: *second,
                });
            }
        }

        let mut shard_ids: Vec<_> = ranges.iter().map(|(_, shard)| *shard).collect();
        shard_ids.sort_unstable();

        Ok(Self { ranges, shard_ids })
    }

    /// Splits `[0, key_space)` into contiguous ranges of near equal size, the first
    /// shards taking one extra key when it doesn't divide evenly.
    ///
    /// # Arguments
    /// * `shard_ids` - The shards, in range order.
    /// * `key_space` - The amount of keys.
    ///
    /// # Returns
    /// A new `RangePartitionManager` or a `PartitionErr` if some shard would get no keys.
    pub fn even(shard_ids: Vec<ShardId>, key_space: Key) -> Result<Self> {
        let n = shard_ids.len() as Key;
        if n == 0 {
            return Self::new(shard_ids, Vec::new());
        }

        let (base, extra) = (key_space / n, key_space % n);
        let mut start = 0;

        let ranges = (0..n)
            .map(|i| {
                let len = base + Key::from(i < extra);
                let range = start..start + len;
                start += len;
                range
            })
            .collect();

        Self::new(shard_ids, ranges)
    }

    /// The range owned by `shard`.
    pub fn range_of(&self, shard: ShardId) -> Option<Range<Key>> {
        self.ranges
            .iter()
            .find(|(_, s)| *s == shard)
            .map(|(range, _)| range.clone())
    }
}

impl PartitionManager for RangePartitionManager {
    fn shard_ids(&self) -> &[ShardId] {
        &self.shard_ids
    }

    fn owner(&self, key: Key) -> Result<ShardId> {
        let idx = self.ranges.partition_point(|(range, _)| range.start <= key);

        match idx.checked_sub(1).map(|i| &self.ranges[i]) {
            Some((range, shard)) if key < range.end => Ok(*shard),
            _ => Err(PartitionErr::UnownedKey(key)),
        }
    }
}
