use comms::{EndpointId, ShardId, WorkerId};

use crate::error::{EngineErr, Result};

/// Amount of endpoint ids reserved for every node.
pub const MAX_THREADS_PER_NODE: u32 = 1000;

/// Offset of the worker helper inside a node's block, shards sit below it.
pub const HELPER_OFFSET: u32 = 50;

/// Offset of the first worker thread inside a node's block.
pub const WORKER_OFFSET: u32 = 100;

/// Allocates deterministic endpoint ids for the shards, helper and worker threads
/// of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMapper {
    node_id: u32,
}

impl IdMapper {
    pub fn new(node_id: u32) -> Self {
        Self { node_id }
    }

    fn base(&self) -> EndpointId {
        self.node_id * MAX_THREADS_PER_NODE
    }

    /// The ids of the first `n` shards.
    ///
    /// # Returns
    /// The ids, or `EngineErr::TooManyEndpoints` if they don't fit below the helper.
    pub fn shard_ids(&self, n: usize) -> Result<Vec<ShardId>> {
        self.block("shards", n, 0, HELPER_OFFSET)
    }

    /// The id of the worker helper, where every reply to the node's workers lands.
    pub fn helper_id(&self) -> EndpointId {
        self.base() + HELPER_OFFSET
    }

    /// The ids of the first `n` worker threads.
    ///
    /// # Returns
    /// The ids, or `EngineErr::TooManyEndpoints` if they overflow the node's block.
    pub fn worker_ids(&self, n: usize) -> Result<Vec<WorkerId>> {
        self.block("workers", n, WORKER_OFFSET, MAX_THREADS_PER_NODE)
    }

    /// The node owning the endpoint `id`.
    pub fn node_of(id: EndpointId) -> u32 {
        id / MAX_THREADS_PER_NODE
    }

    fn block(&self, kind: &'static str, n: usize, from: u32, to: u32) -> Result<Vec<EndpointId>> {
        let max = to - from;
        if n > max as usize {
            return Err(EngineErr::TooManyEndpoints {
                kind,
                requested: n,
                max,
            });
        }

        let start = self.base() + from;
        Ok((start..start + n as u32).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_live_in_the_node_block() {
        let ids = IdMapper::new(2);

        assert_eq!(ids.shard_ids(3).unwrap(), [2000, 2001, 2002]);
        assert_eq!(ids.helper_id(), 2050);
        assert_eq!(ids.worker_ids(2).unwrap(), [2100, 2101]);
        assert_eq!(IdMapper::node_of(2101), 2);
    }

    #[test]
    fn blocks_are_bounded() {
        let ids = IdMapper::new(0);

        assert_eq!(ids.shard_ids(50).unwrap().last(), Some(&49));
        assert!(matches!(
            ids.shard_ids(51),
            Err(EngineErr::TooManyEndpoints { max: 50, .. })
        ));
        assert_eq!(ids.worker_ids(900).unwrap().last(), Some(&999));
        assert!(ids.worker_ids(901).is_err());
    }
}
