//! The worker side of the parameter server: key partitioning, the client table
//! and the completion tracking of distributed requests.

pub mod callback;
pub mod config;
pub mod error;
pub mod partition;
pub mod retry;
pub mod router;
pub mod table;

pub use callback::CallbackRunner;
pub use config::ClientConfig;
pub use error::ClientErr;
pub use partition::{PartitionErr, PartitionManager, RangePartitionManager};
pub use retry::Resender;
pub use router::ReplyRouter;
pub use table::KVClientTable;
