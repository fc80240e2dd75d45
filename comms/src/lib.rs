pub mod msg;
pub mod specs;
pub mod transport;

pub use msg::{Message, Meta, Reply, Request};
pub use transport::{Mailbox, Transport, TransportErr};

/// Identifies one scalar parameter.
pub type Key = u64;

/// The value stored for a `Key`.
pub type Val = f64;

/// A worker's logical clock, the amount of completed rounds.
pub type Clock = u32;

/// Identifies any endpoint of the message bus, shards and worker threads alike.
pub type EndpointId = u32;

/// Identifies a server shard.
pub type ShardId = EndpointId;

/// Identifies a worker thread.
pub type WorkerId = EndpointId;

/// Identifies a model (a table) across every shard.
pub type ModelId = u32;
