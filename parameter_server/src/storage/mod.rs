mod error;
mod map;
mod snapshot;
mod store;

pub use error::{Result, SnapshotErr, StorageErr};
pub use map::MapStorage;
pub use snapshot::{Checkpointer, Snapshot};
pub use store::Storage;
