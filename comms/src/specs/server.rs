use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::{Clock, ModelId};

/// Amount of global clock advances between two snapshots of a model.
pub const DEFAULT_BACKUP_INTERVAL: Clock = 10;

fn default_backup_interval() -> NonZeroU32 {
    NonZeroU32::new(DEFAULT_BACKUP_INTERVAL).unwrap_or(NonZeroU32::MIN)
}

/// The specification for the `ConsistencyModel` trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencySpec {
    Bsp,
    Ssp { staleness: Clock },
    Asp,
}

/// The specification of a table, served by one model instance per shard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSpec {
    pub model_id: ModelId,
    pub consistency: ConsistencySpec,
    #[serde(default = "default_backup_interval")]
    pub backup_interval: NonZeroU32,
}

impl TableSpec {
    /// Creates a new `TableSpec` with the default backup interval.
    ///
    /// # Arguments
    /// * `model_id` - The id of the table.
    /// * `consistency` - The consistency model serving the table.
    ///
    /// # Returns
    /// A new `TableSpec` instance.
    pub fn new(model_id: ModelId, consistency: ConsistencySpec) -> Self {
        Self {
            model_id,
            consistency,
            backup_interval: default_backup_interval(),
        }
    }
}
