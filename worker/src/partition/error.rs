use std::{
    error::Error,
    fmt::{self, Display},
};

use comms::{Key, ShardId};

/// The specific result type for the partition module.
pub type Result<T> = std::result::Result<T, PartitionErr>;

/// Error returned when a partition can't be built or an input can't be sliced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionErr {
    UnownedKey(Key),
    LengthMismatch { keys: usize, vals: usize },
    CountMismatch { shards: usize, ranges: usize },
    EmptyRange(ShardId),
    DuplicateShard(ShardId),
    Overlap { first: ShardId, second: ShardId },
}

impl Display for PartitionErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionErr::UnownedKey(key) => write!(f, "key {key} isn't owned by any shard"),
            PartitionErr::LengthMismatch { keys, vals } => {
                write!(f, "got {keys} keys but {vals} values")
            }
            PartitionErr::CountMismatch { shards, ranges } => {
                write!(f, "got {shards} shards but {ranges} ranges")
            }
            PartitionErr::EmptyRange(shard) => write!(f, "the range of shard {shard} is empty"),
            PartitionErr::DuplicateShard(shard) => write!(f, "shard {shard} appears twice"),
            PartitionErr::Overlap { first, second } => {
                write!(f, "the ranges of shards {first} and {second} overlap")
            }
        }
    }
}

impl Error for PartitionErr {}
