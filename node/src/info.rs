use std::{collections::HashMap, sync::Arc};

use comms::{Clock, ModelId, Transport, WorkerId};
use worker::{CallbackRunner, ClientConfig, KVClientTable, RangePartitionManager};

use crate::error::{EngineErr, Result};

/// Everything a worker task needs to know about itself and the tables it can use.
pub struct WorkerInfo {
    worker_id: WorkerId,
    index: usize,
    start_clock: Clock,
    transport: Arc<dyn Transport>,
    callbacks: Arc<CallbackRunner>,
    partitions: Arc<HashMap<ModelId, Arc<RangePartitionManager>>>,
    config: ClientConfig,
}

impl WorkerInfo {
    pub(crate) fn new(
        worker_id: WorkerId,
        index: usize,
        start_clock: Clock,
        transport: Arc<dyn Transport>,
        callbacks: Arc<CallbackRunner>,
        partitions: Arc<HashMap<ModelId, Arc<RangePartitionManager>>>,
        config: ClientConfig,
    ) -> Self {
        Self {
            worker_id,
            index,
            start_clock,
            transport,
            callbacks,
            partitions,
            config,
        }
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    /// Position of this worker among the node's workers, starting at 0.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The clock this worker resumes from, 0 unless the node recovered.
    pub fn start_clock(&self) -> Clock {
        self.start_clock
    }

    /// Builds the client side of the table `model_id` for this worker.
    ///
    /// # Returns
    /// The table, or `EngineErr::UnknownTable` if the node doesn't serve it.
    pub fn table(&self, model_id: ModelId) -> Result<KVClientTable> {
        let partition = self
            .partitions
            .get(&model_id)
            .ok_or(EngineErr::UnknownTable(model_id))?;

        Ok(KVClientTable::new(
            self.worker_id,
            model_id,
            partition.clone(),
            self.transport.clone(),
            self.callbacks.clone(),
            self.config,
        ))
    }
}
