use comms::{
    ShardId,
    specs::server::{ConsistencySpec, TableSpec},
};

use crate::{
    consistency::{AspModel, BspModel, ConsistencyModel, ModelCore, SspModel},
    storage::{Checkpointer, MapStorage, Storage},
};

/// Builds the `ConsistencyModel`s of one shard given their table specifications.
pub struct ModelBuilder {
    shard_id: ShardId,
    checkpointer: Option<Checkpointer>,
}

impl ModelBuilder {
    /// Creates a new `ModelBuilder`.
    ///
    /// # Arguments
    /// * `shard_id` - The shard the built models live in.
    /// * `checkpointer` - Where the built models persist snapshots, `None` disables backups.
    ///
    /// # Returns
    /// A new `ModelBuilder` instance.
    pub fn new(shard_id: ShardId, checkpointer: Option<Checkpointer>) -> Self {
        Self {
            shard_id,
            checkpointer,
        }
    }

    /// Builds a new `ConsistencyModel` following a spec.
    ///
    /// # Arguments
    /// * `spec` - The specification of the table.
    ///
    /// # Returns
    /// A new model with no registered workers.
    pub fn build(&self, spec: &TableSpec) -> Box<dyn ConsistencyModel> {
        let storage = self.resolve_storage();
        self.resolve_consistency(spec, storage)
    }

    /// Resolves the `Storage` of the model.
    fn resolve_storage(&self) -> Box<dyn Storage> {
        Box::new(MapStorage::new())
    }

    /// Resolves the `ConsistencyModel` wrapping the resolved storage.
    ///
    /// # Arguments
    /// * `spec` - The specification of the table.
    /// * `storage` - A resolved storage.
    ///
    /// # Returns
    /// A new model.
    fn resolve_consistency(
        &self,
        spec: &TableSpec,
        storage: Box<dyn Storage>,
    ) -> Box<dyn ConsistencyModel> {
        let core = ModelCore::new(
            spec.model_id,
            self.shard_id,
            storage,
            self.checkpointer.clone(),
            spec.backup_interval,
        );

        match spec.consistency {
            ConsistencySpec::Bsp => Box::new(BspModel::new(core)),
            ConsistencySpec::Ssp { staleness } => Box::new(SspModel::new(core, staleness)),
            ConsistencySpec::Asp => Box::new(AspModel::new(core)),
        }
    }
}
