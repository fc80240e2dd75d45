use std::{collections::HashMap, ops::ControlFlow, sync::Arc};

use comms::{Clock, Message, ModelId, Reply, Request, ShardId, Transport, msg::Body};
use log::{debug, error, info, warn};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::consistency::{ConsistencyModel, Result};

/// The operations a model handles.
enum Op {
    Add,
    Get,
    Clock,
    Reset,
}

/// One server shard, dispatching incoming requests to the model they target.
///
/// Messages are handled one at a time in arrival order, every model of the
/// shard is only ever touched by the task running this server.
pub struct ShardServer {
    shard_id: ShardId,
    models: HashMap<ModelId, Box<dyn ConsistencyModel>>,
    transport: Arc<dyn Transport>,
    outbox: Vec<Message>,
}

impl ShardServer {
    /// Creates a new `ShardServer` with no models.
    ///
    /// # Arguments
    /// * `shard_id` - The id of this shard, it's also the endpoint it listens on.
    /// * `transport` - Where replies are sent.
    ///
    /// # Returns
    /// A new `ShardServer` instance.
    pub fn new(shard_id: ShardId, transport: Arc<dyn Transport>) -> Self {
        Self {
            shard_id,
            models: HashMap::new(),
            transport,
            outbox: Vec::new(),
        }
    }

    pub fn shard_id(&self) -> ShardId {
        self.shard_id
    }

    /// Registers `model` under its model id.
    ///
    /// # Returns
    /// The previously registered model with the same id, if any.
    pub fn register_model(
        &mut self,
        model: Box<dyn ConsistencyModel>,
    ) -> Option<Box<dyn ConsistencyModel>> {
        self.models.insert(model.model_id(), model)
    }

    /// The model registered under `model_id`.
    pub fn model(&self, model_id: ModelId) -> Option<&dyn ConsistencyModel> {
        self.models.get(&model_id).map(|model| &**model)
    }

    /// Restores every registered model from its last snapshot.
    ///
    /// # Returns
    /// The smallest recovered minimum clock, or the first recovery error.
    pub fn recover(&mut self) -> Result<Clock> {
        let mut min_clock = None;

        for model in self.models.values_mut() {
            let clock = model.recover()?;
            min_clock = Some(min_clock.map_or(clock, |min: Clock| min.min(clock)));
        }

        Ok(min_clock.unwrap_or_default())
    }

    /// Handles one incoming message.
    ///
    /// # Arguments
    /// * `msg` - The incoming message.
    ///
    /// # Returns
    /// `ControlFlow::Break` once an exit request is received.
    pub fn handle(&mut self, msg: Message) -> ControlFlow<()> {
        let op = match &msg.body {
            Body::Request(Request::Add { .. }) => Op::Add,
            Body::Request(Request::Get { .. }) => Op::Get,
            Body::Request(Request::Clock) => Op::Clock,
            Body::Request(Request::ResetWorker { .. }) => Op::Reset,
            Body::Request(Request::Heartbeat) => {
                self.outbox.push(msg.reply(Reply::Heartbeat));
                self.flush();
                return ControlFlow::Continue(());
            }
            Body::Request(Request::Exit) => {
                info!(shard_id = self.shard_id; "exit requested");
                return ControlFlow::Break(());
            }
            Body::Reply(_) => {
                warn!(shard_id = self.shard_id; "unexpected {}", msg.kind());
                return ControlFlow::Continue(());
            }
        };

        let model_id = msg.meta.model_id;
        let Some(model) = self.models.get_mut(&model_id) else {
            warn!(
                shard_id = self.shard_id,
                model_id = model_id;
                "dropping {} for an unknown model",
                msg.kind()
            );
            return ControlFlow::Continue(());
        };

        match op {
            Op::Add => model.add(msg, &mut self.outbox),
            Op::Get => model.get(msg, &mut self.outbox),
            Op::Reset => model.reset_worker(msg, &mut self.outbox),
            Op::Clock => {
                if let Err(e) = model.clock(msg, &mut self.outbox) {
                    error!(shard_id = self.shard_id, model_id = model_id; "{e}");
                }
            }
        }

        self.flush();
        ControlFlow::Continue(())
    }

    /// Handles the messages of `rx` until an exit request arrives or every sender is dropped.
    ///
    /// # Arguments
    /// * `rx` - The queue this shard listens on.
    ///
    /// # Returns
    /// The server, so its final state can be inspected.
    pub async fn run(mut self, mut rx: UnboundedReceiver<Message>) -> Self {
        debug!(shard_id = self.shard_id; "serving {} models", self.models.len());

        while let Some(msg) = rx.recv().await {
            if self.handle(msg).is_break() {
                break;
            }
        }

        info!(shard_id = self.shard_id; "stopped");
        self
    }

    /// Sends every queued reply in push order.
    fn flush(&mut self) {
        for msg in self.outbox.drain(..) {
            if let Err(e) = self.transport.send(msg) {
                warn!(shard_id = self.shard_id; "failed to send reply: {e}");
            }
        }
    }
}
