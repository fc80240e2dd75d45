use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

use comms::{Key, ModelId, ShardId};

/// The specific result type for the storage module.
pub type Result<T> = std::result::Result<T, StorageErr>;

/// Error returned by a `Storage` when an operation can't be served as asked.
#[derive(Debug, PartialEq)]
pub enum StorageErr {
    /// The amount of keys and values of an add don't match.
    LengthMismatch { keys: usize, vals: usize },
    /// Some of the requested keys were never added.
    MissingKeys(Vec<Key>),
}

impl Display for StorageErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageErr::LengthMismatch { keys, vals } => {
                write!(f, "got {keys} keys but {vals} values")
            }
            StorageErr::MissingKeys(keys) => write!(f, "missing keys {keys:?}"),
        }
    }
}

impl Error for StorageErr {}

/// Error returned when a snapshot can't be written or read back.
#[derive(Debug)]
pub enum SnapshotErr {
    Io { path: PathBuf, source: io::Error },
    Format { path: PathBuf, source: serde_json::Error },
    /// The file holds the snapshot of another model or shard.
    Mismatch {
        path: PathBuf,
        expected: (ModelId, ShardId),
        got: (ModelId, ShardId),
    },
    /// Recovery was asked for but no snapshot directory is configured.
    NotConfigured,
}

impl Display for SnapshotErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotErr::Io { path, source } => write!(f, "snapshot io error at {path:?}: {source}"),
            SnapshotErr::Format { path, source } => {
                write!(f, "snapshot at {path:?} is corrupted: {source}")
            }
            SnapshotErr::Mismatch {
                path,
                expected,
                got,
            } => write!(
                f,
                "snapshot at {path:?} belongs to (model, shard) {got:?}, expected {expected:?}"
            ),
            SnapshotErr::NotConfigured => f.write_str("no snapshot directory configured"),
        }
    }
}

impl Error for SnapshotErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SnapshotErr::Io { source, .. } => Some(source),
            SnapshotErr::Format { source, .. } => Some(source),
            _ => None,
        }
    }
}
