use std::{
    collections::{HashMap, HashSet},
    mem,
    sync::Arc,
};

use comms::{
    Clock, EndpointId, Mailbox, Message, Meta, ModelId, Request, ShardId, Transport, WorkerId,
    specs::node::NodeSpec,
};
use log::{debug, info, warn};
use parameter_server::{ModelBuilder, ShardServer, storage::Checkpointer};
use tokio::task::{self, JoinHandle};
use worker::{CallbackRunner, ClientConfig, RangePartitionManager, ReplyRouter, Resender};

use crate::{
    error::{EngineErr, Result},
    id_mapper::IdMapper,
    info::WorkerInfo,
};

/// Runs a whole parameter server cluster inside the current process: the shards,
/// the worker helper and one blocking thread per worker.
pub struct Engine {
    spec: NodeSpec,
    mailbox: Arc<Mailbox>,
    callbacks: Arc<CallbackRunner>,
    partitions: Arc<HashMap<ModelId, Arc<RangePartitionManager>>>,
    config: ClientConfig,
    helper_id: EndpointId,
    shard_ids: Vec<ShardId>,
    worker_ids: Vec<WorkerId>,
    shards: Vec<JoinHandle<ShardServer>>,
    router: JoinHandle<()>,
    start_clock: Clock,
}

impl Engine {
    /// Builds and spawns every actor of the node, recovering the shards first if
    /// the spec asks for it.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Arguments
    /// * `spec` - The specification of the node.
    ///
    /// # Returns
    /// A running `Engine`, or an `EngineErr` if the spec is invalid or a recovery fails.
    pub fn start(spec: NodeSpec) -> Result<Self> {
        validate(&spec)?;

        let ids = IdMapper::new(spec.node_id);
        let shard_ids = ids.shard_ids(spec.shards)?;
        let worker_ids = ids.worker_ids(spec.workers)?;
        let helper_id = ids.helper_id();

        let mailbox = Arc::new(Mailbox::new());
        let config = ClientConfig::from(spec.client);
        let callbacks = Arc::new(CallbackRunner::new(config.tick()));

        let mut partitions = HashMap::with_capacity(spec.tables.len());
        for table in &spec.tables {
            let partition = match &spec.ranges {
                Some(ranges) => RangePartitionManager::new(shard_ids.clone(), ranges.clone())?,
                None => RangePartitionManager::even(shard_ids.clone(), spec.key_space)?,
            };
            partitions.insert(table.model_id, Arc::new(partition));
        }

        let checkpointer = spec.snapshot_dir.clone().map(Checkpointer::new);
        let mut servers = Vec::with_capacity(shard_ids.len());
        for &shard_id in &shard_ids {
            let builder = ModelBuilder::new(shard_id, checkpointer.clone());
            let mut server = ShardServer::new(shard_id, mailbox.clone());
            for table in &spec.tables {
                server.register_model(builder.build(table));
            }

            servers.push(server);
        }

        let mut start_clock = 0;
        if spec.recover {
            let mut clocks = Vec::with_capacity(servers.len());
            for server in &mut servers {
                clocks.push(server.recover()?);
            }

            start_clock = clocks.iter().copied().min().unwrap_or_default();
            if clocks.iter().any(|&clock| clock != start_clock) {
                warn!(start_clock = start_clock; "shards recovered different clocks {clocks:?}");
            }
            info!(node_id = spec.node_id, start_clock = start_clock; "recovered every shard");
        }

        let shards = servers
            .into_iter()
            .map(|server| {
                let rx = mailbox.open(server.shard_id());
                tokio::spawn(server.run(rx))
            })
            .collect();

        let helper_rx = mailbox.open(helper_id);
        for &worker_id in &worker_ids {
            mailbox.route(worker_id, helper_id)?;
        }
        let router = tokio::spawn(ReplyRouter::new(helper_id, callbacks.clone()).run(helper_rx));

        info!(
            node_id = spec.node_id,
            shards = spec.shards,
            workers = spec.workers,
            tables = spec.tables.len();
            "engine started"
        );

        Ok(Self {
            spec,
            mailbox,
            callbacks,
            partitions: Arc::new(partitions),
            config,
            helper_id,
            shard_ids,
            worker_ids,
            shards,
            router,
            start_clock,
        })
    }

    /// The clock every worker resumes from, the recovered minimum clock or 0.
    pub fn start_clock(&self) -> Clock {
        self.start_clock
    }

    pub fn shard_ids(&self) -> &[ShardId] {
        &self.shard_ids
    }

    pub fn worker_ids(&self) -> &[WorkerId] {
        &self.worker_ids
    }

    /// Registers every worker on every shard of every table and waits for all the
    /// acknowledgements. Skipped after a recovery, the shards already know them.
    pub async fn init_tables(&self) -> Result<()> {
        if self.spec.recover {
            debug!("skipping table initialization after recovery");
            return Ok(());
        }

        for table in &self.spec.tables {
            let model_id = table.model_id;
            let mailbox = self.mailbox.clone();
            let callbacks = self.callbacks.clone();
            let config = self.config;
            let helper_id = self.helper_id;
            let shard_ids = self.shard_ids.clone();
            let workers = self.worker_ids.clone();

            task::spawn_blocking(move || {
                let timestamp = callbacks.new_request(helper_id, model_id, &shard_ids);
                let mut resender = Resender::new(&*mailbox, config);

                for &shard_id in &shard_ids {
                    let mut meta = Meta::new(helper_id, shard_id, model_id);
                    meta.timestamp = timestamp;
                    let workers = workers.clone();
                    resender.send(Message::request(meta, Request::ResetWorker { workers }))?;
                }

                callbacks.wait(helper_id, model_id, |pending| resender.on_tick(pending))
            })
            .await??;

            debug!(model_id = model_id; "workers registered on every shard");
        }

        Ok(())
    }

    /// Runs `task` once per worker, each on its own blocking thread.
    ///
    /// # Arguments
    /// * `task` - The work of one worker.
    ///
    /// # Returns
    /// The output of every worker ordered by worker index, or `EngineErr::Task` if
    /// some worker panicked.
    pub async fn run<T, F>(&self, task: F) -> Result<Vec<T>>
    where
        T: Send + 'static,
        F: Fn(WorkerInfo) -> T + Send + Sync + 'static,
    {
        let task = Arc::new(task);

        let handles: Vec<_> = self
            .worker_ids
            .iter()
            .enumerate()
            .map(|(index, &worker_id)| {
                let info = WorkerInfo::new(
                    worker_id,
                    index,
                    self.start_clock,
                    self.mailbox.clone(),
                    self.callbacks.clone(),
                    self.partitions.clone(),
                    self.config,
                );
                let task = task.clone();
                task::spawn_blocking(move || task(info))
            })
            .collect();

        let mut outputs = Vec::with_capacity(handles.len());
        for handle in handles {
            outputs.push(handle.await?);
        }

        Ok(outputs)
    }

    /// Stops every shard and the worker helper.
    ///
    /// # Returns
    /// The stopped shards, so their final state can be inspected.
    pub async fn stop(mut self) -> Result<Vec<ShardServer>> {
        for &shard_id in &self.shard_ids {
            self.exit(shard_id)?;
        }

        let shards = mem::take(&mut self.shards);
        let mut servers = Vec::with_capacity(shards.len());
        for handle in shards {
            servers.push(handle.await?);
        }

        self.exit(self.helper_id)?;
        self.router.await?;

        info!(node_id = self.spec.node_id; "engine stopped");
        Ok(servers)
    }

    fn exit(&self, endpoint: EndpointId) -> Result<()> {
        let meta = Meta::new(self.helper_id, endpoint, 0);
        self.mailbox.send(Message::request(meta, Request::Exit))?;
        Ok(())
    }
}

fn validate(spec: &NodeSpec) -> Result<()> {
    if spec.shards == 0 {
        return Err(EngineErr::InvalidSpec("a node needs at least one shard".into()));
    }

    if spec.workers == 0 {
        return Err(EngineErr::InvalidSpec("a node needs at least one worker".into()));
    }

    let mut model_ids = HashSet::with_capacity(spec.tables.len());
    for table in &spec.tables {
        if !model_ids.insert(table.model_id) {
            let reason = format!("model id {} is declared twice", table.model_id);
            return Err(EngineErr::InvalidSpec(reason));
        }
    }

    Ok(())
}
