use std::{ops::Range, path::PathBuf};

use serde::{Deserialize, Serialize};

use super::{
    server::{ConsistencySpec, TableSpec},
    worker::ClientSpec,
};
use crate::{Clock, Key};

/// The specification for a whole in-process cluster: its shards, tables and workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    #[serde(default)]
    pub node_id: u32,
    pub shards: usize,
    /// Keys `[0, key_space)` are evenly split between the shards.
    pub key_space: Key,
    /// Explicit key range of every shard, overrides the even split of `key_space`.
    #[serde(default)]
    pub ranges: Option<Vec<Range<Key>>>,
    pub workers: usize,
    pub tables: Vec<TableSpec>,
    #[serde(default)]
    pub client: ClientSpec,
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,
    #[serde(default)]
    pub recover: bool,
    #[serde(default = "default_rounds")]
    pub rounds: Clock,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_rounds() -> Clock {
    20
}

impl Default for NodeSpec {
    fn default() -> Self {
        Self {
            node_id: 0,
            shards: 3,
            key_space: 10,
            ranges: None,
            workers: 3,
            tables: vec![TableSpec::new(0, ConsistencySpec::Asp)],
            client: ClientSpec::default(),
            snapshot_dir: None,
            recover: false,
            rounds: default_rounds(),
            seed: None,
        }
    }
}
