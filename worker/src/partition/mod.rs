mod error;
mod manager;
mod range;

pub use error::{PartitionErr, Result};
pub use manager::PartitionManager;
pub use range::RangePartitionManager;
