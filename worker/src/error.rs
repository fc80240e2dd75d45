use std::{error::Error, fmt};

use comms::{Key, ShardId, TransportErr};

use crate::partition::PartitionErr;

/// The client module's result type.
pub type Result<T> = std::result::Result<T, ClientErr>;

/// Failures of a distributed table operation.
#[derive(Debug)]
pub enum ClientErr {
    Partition(PartitionErr),
    Transport(TransportErr),
    MissingKeys(Vec<Key>),
    ShardUnreachable { shard: ShardId, attempts: usize },
}

impl fmt::Display for ClientErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientErr::Partition(e) => write!(f, "partition error: {e}"),
            ClientErr::Transport(e) => write!(f, "transport error: {e}"),
            ClientErr::MissingKeys(keys) => write!(f, "keys were never added: {keys:?}"),
            ClientErr::ShardUnreachable { shard, attempts } => {
                write!(f, "shard {shard} didn't answer after {attempts} attempts")
            }
        }
    }
}

impl Error for ClientErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ClientErr::Partition(e) => Some(e),
            ClientErr::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PartitionErr> for ClientErr {
    fn from(value: PartitionErr) -> Self {
        Self::Partition(value)
    }
}

impl From<TransportErr> for ClientErr {
    fn from(value: TransportErr) -> Self {
        Self::Transport(value)
    }
}
