//! The server side of the parameter server: storage, consistency models and the
//! shard loop dispatching requests to them.

pub mod consistency;
pub mod service;
pub mod storage;
pub mod tracking;


pub use consistency::{AspModel, BspModel, ConsistencyModel, ModelErr, SspModel};
pub use service::{ModelBuilder, ShardServer};
