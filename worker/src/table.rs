use std::{collections::HashMap, mem, sync::Arc};

use comms::{Key, Message, Meta, ModelId, Reply, Request, ShardId, Transport, Val, WorkerId, msg::Body};
use log::{debug, warn};
use parking_lot::Mutex;

use crate::{
    callback::CallbackRunner,
    config::ClientConfig,
    error::{ClientErr, Result},
    partition::{PartitionManager, RangePartitionManager},
    retry::Resender,
};

/// The values gathered from the replies of a distributed get.
#[derive(Default)]
struct Gathered {
    vals: HashMap<Key, Val>,
    missing: Vec<Key>,
}

impl Gathered {
    fn merge(&mut self, msg: &Message) {
        match &msg.body {
            Body::Reply(Reply::Values { keys, vals }) => {
                self.vals.extend(keys.iter().copied().zip(vals.iter().copied()));
            }
            Body::Reply(Reply::MissingKeys(keys)) => self.missing.extend(keys),
            _ => warn!(shard = msg.meta.sender; "unexpected {} for a get", msg.kind()),
        }
    }

    /// The gathered values in the order of `keys`.
    fn into_values(mut self, keys: &[Key]) -> Result<Vec<Val>> {
        self.missing
            .extend(keys.iter().filter(|&key| !self.vals.contains_key(key)));

        if !self.missing.is_empty() {
            self.missing.sort_unstable();
            self.missing.dedup();
            return Err(ClientErr::MissingKeys(self.missing));
        }

        Ok(keys.iter().map(|key| self.vals[key]).collect())
    }
}

/// The worker side handle of one table, each call is a distributed request fanned
/// out to the shards owning the given keys.
///
/// `add` and `get` block the calling thread until every involved shard replies.
pub struct KVClientTable<P = RangePartitionManager> {
    worker_id: WorkerId,
    model_id: ModelId,
    partition: Arc<P>,
    transport: Arc<dyn Transport>,
    callbacks: Arc<CallbackRunner>,
    config: ClientConfig,
}

impl<P: PartitionManager> KVClientTable<P> {
    /// Creates a new `KVClientTable`.
    ///
    /// # Arguments
    /// * `worker_id` - The worker issuing the requests.
    /// * `model_id` - The table to operate on.
    /// * `partition` - Where every key of the table lives.
    /// * `transport` - Where requests are sent.
    /// * `callbacks` - Where replies of this worker are fed.
    /// * `config` - Timing and retry bounds.
    ///
    /// # Returns
    /// A new `KVClientTable` instance.
    pub fn new(
        worker_id: WorkerId,
        model_id: ModelId,
        partition: Arc<P>,
        transport: Arc<dyn Transport>,
        callbacks: Arc<CallbackRunner>,
        config: ClientConfig,
    ) -> Self {
        Self {
            worker_id,
            model_id,
            partition,
            transport,
            callbacks,
            config,
        }
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    pub fn model_id(&self) -> ModelId {
        self.model_id
    }

    /// Accumulates `vals` onto `keys`.
    ///
    /// # Arguments
    /// * `keys` - The updated keys.
    /// * `vals` - The delta of each key.
    ///
    /// # Returns
    /// Once every involved shard acknowledged, or a `ClientErr`.
    pub fn add(&self, keys: &[Key], vals: &[Val]) -> Result<()> {
        if keys.is_empty() && vals.is_empty() {
            return Ok(());
        }

        let requests = self
            .partition
            .slice_pairs(keys, vals)?
            .into_iter()
            .map(|(shard, keys, vals)| (shard, Request::Add { keys, vals }))
            .collect();

        self.request(requests, |_| {})
    }

    /// Reads the current values of `keys`.
    ///
    /// # Arguments
    /// * `keys` - The keys to read.
    ///
    /// # Returns
    /// The values in the order of `keys`, or `ClientErr::MissingKeys` if some key
    /// was never added.
    pub fn get(&self, keys: &[Key]) -> Result<Vec<Val>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let requests = self
            .partition
            .slice_keys(keys)?
            .into_iter()
            .map(|(shard, keys)| (shard, Request::Get { keys }))
            .collect();

        let gathered = Arc::new(Mutex::new(Gathered::default()));
        let sink = gathered.clone();
        self.request(requests, move |msg| sink.lock().merge(msg))?;

        let gathered = mem::take(&mut *gathered.lock());
        gathered.into_values(keys)
    }

    /// Tells every shard this worker finished a round, doesn't wait for anything.
    pub fn clock(&self) -> Result<()> {
        for &shard in self.partition.shard_ids() {
            let meta = Meta::new(self.worker_id, shard, self.model_id);
            self.transport.send(Message::request(meta, Request::Clock))?;
        }

        debug!(worker_id = self.worker_id, model_id = self.model_id; "clock sent");
        Ok(())
    }

    /// Sends one request per shard and blocks until every shard replied.
    ///
    /// # Arguments
    /// * `requests` - The sub request of each involved shard.
    /// * `on_reply` - Merges every accepted reply.
    fn request<F>(&self, requests: Vec<(ShardId, Request)>, on_reply: F) -> Result<()>
    where
        F: FnMut(&Message) + Send + 'static,
    {
        let (worker, model) = (self.worker_id, self.model_id);
        let shards: Vec<_> = requests.iter().map(|(shard, _)| *shard).collect();

        let timestamp = self.callbacks.new_request(worker, model, &shards);
        self.callbacks.register_reply_handler(worker, model, on_reply);

        let mut resender = Resender::new(self.transport.as_ref(), self.config);
        for (shard, req) in requests {
            let mut meta = Meta::new(worker, shard, model);
            meta.timestamp = timestamp;

            if let Err(e) = resender.send(Message::request(meta, req)) {
                self.callbacks.cancel(worker, model);
                return Err(e);
            }
        }

        self.callbacks
            .wait(worker, model, |pending| resender.on_tick(pending))
    }
}
