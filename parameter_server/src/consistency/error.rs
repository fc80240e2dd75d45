use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::storage::SnapshotErr;

/// The specific result type for the consistency module.
pub type Result<T> = std::result::Result<T, ModelErr>;

/// Error returned by a `ConsistencyModel` whenever its state can't be persisted or restored.
#[derive(Debug)]
pub enum ModelErr {
    Backup(SnapshotErr),
    Recovery(SnapshotErr),
}

impl Display for ModelErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelErr::Backup(e) => write!(f, "backup failed: {e}"),
            ModelErr::Recovery(e) => write!(f, "recovery failed: {e}"),
        }
    }
}

impl Error for ModelErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ModelErr::Backup(e) | ModelErr::Recovery(e) => Some(e),
        }
    }
}
