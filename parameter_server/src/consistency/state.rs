use std::{collections::HashMap, num::NonZeroU32};

use comms::{
    Clock, Message, ModelId, ShardId, WorkerId,
    msg::{Body, Reply, Request},
};
use log::{debug, info, warn};

use super::{ModelErr, Result};
use crate::{
    storage::{Checkpointer, Snapshot, SnapshotErr, Storage, StorageErr},
    tracking::ProgressTracker,
};

/// The state every consistency model shares: the storage, the workers' progress and
/// the persistence settings.
pub struct ModelCore {
    model_id: ModelId,
    shard_id: ShardId,
    storage: Box<dyn Storage>,
    tracker: ProgressTracker,
    checkpointer: Option<Checkpointer>,
    backup_interval: NonZeroU32,
    last_add: HashMap<WorkerId, u64>,
}

impl ModelCore {
    /// Creates a new `ModelCore` with no registered workers.
    ///
    /// # Arguments
    /// * `model_id` - The id of the served model.
    /// * `shard_id` - The shard this instance lives in.
    /// * `storage` - The parameter storage.
    /// * `checkpointer` - Where to persist snapshots, `None` disables backups.
    /// * `backup_interval` - Amount of global clock advances between snapshots.
    ///
    /// # Returns
    /// A new `ModelCore` instance.
    pub fn new(
        model_id: ModelId,
        shard_id: ShardId,
        storage: Box<dyn Storage>,
        checkpointer: Option<Checkpointer>,
        backup_interval: NonZeroU32,
    ) -> Self {
        Self {
            model_id,
            shard_id,
            storage,
            tracker: ProgressTracker::new(),
            checkpointer,
            backup_interval,
            last_add: HashMap::new(),
        }
    }

    pub fn model_id(&self) -> ModelId {
        self.model_id
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut ProgressTracker {
        &mut self.tracker
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Whether the sender of `msg` is registered, unregistered senders are dropped.
    pub fn admits(&self, msg: &Message) -> bool {
        let sender = msg.meta.sender;
        if self.tracker.is_registered(sender) {
            return true;
        }

        debug!(
            model_id = self.model_id,
            shard_id = self.shard_id,
            sender = sender;
            "dropping {} from an unregistered worker",
            msg.kind()
        );
        false
    }

    /// Acknowledges an incoming add and filters out resent copies of an add that
    /// was already received.
    ///
    /// # Arguments
    /// * `msg` - The incoming add.
    /// * `out` - Where the acknowledgement is pushed.
    ///
    /// # Returns
    /// The message if it's the first copy from a registered worker, `None` otherwise.
    pub fn accept_add(&mut self, msg: Message, out: &mut Vec<Message>) -> Option<Message> {
        if !self.admits(&msg) {
            return None;
        }

        out.push(msg.reply(Reply::AddAck));

        // Untagged adds (timestamp 0) are never deduplicated.
        let meta = msg.meta;
        if meta.timestamp != 0
            && self.last_add.insert(meta.sender, meta.timestamp) == Some(meta.timestamp)
        {
            debug!(sender = meta.sender, timestamp = meta.timestamp; "ignoring resent add");
            return None;
        }

        Some(msg)
    }

    /// Applies the deltas carried by an add message to the storage.
    pub fn apply_add(&mut self, msg: &Message) {
        let Body::Request(Request::Add { keys, vals }) = &msg.body else {
            warn!("expected an add to apply, got {}", msg.kind());
            return;
        };

        if let Err(e) = self.storage.add(keys, vals) {
            warn!(
                model_id = self.model_id,
                sender = msg.meta.sender;
                "dropping malformed add: {e}"
            );
        }
    }

    /// Reads the keys of a get message from the storage.
    ///
    /// # Returns
    /// The reply to send back, tagged with the requester's current clock.
    pub fn serve_get(&self, msg: &Message) -> Message {
        let round = self.tracker.progress(msg.meta.sender).unwrap_or_default();

        let Body::Request(Request::Get { keys }) = &msg.body else {
            warn!("expected a get to serve, got {}", msg.kind());
            return msg.reply_at(Reply::MissingKeys(Vec::new()), round);
        };

        let reply = match self.storage.get(keys) {
            Ok(vals) => Reply::Values {
                keys: keys.clone(),
                vals,
            },
            Err(StorageErr::MissingKeys(missing)) => Reply::MissingKeys(missing),
            Err(e) => {
                warn!("failed to serve get: {e}");
                Reply::MissingKeys(keys.clone())
            }
        };

        msg.reply_at(reply, round)
    }

    /// Registers the workers carried by a reset message.
    ///
    /// # Returns
    /// The acknowledgement to send back.
    pub fn reset(&mut self, msg: &Message) -> Option<Message> {
        let Body::Request(Request::ResetWorker { workers }) = &msg.body else {
            warn!("expected a reset, got {}", msg.kind());
            return None;
        };

        self.tracker.init(workers);
        self.last_add.clear();
        info!(
            model_id = self.model_id,
            shard_id = self.shard_id;
            "registered {} workers",
            workers.len()
        );

        Some(msg.reply(Reply::ResetAck))
    }

    /// Called after every global clock advance, takes a snapshot on interval boundaries.
    pub fn on_min_clock(&self, min_clock: Clock) -> Result<()> {
        if min_clock % self.backup_interval.get() == 0 {
            self.backup()?;
        }

        Ok(())
    }

    /// Persists the storage and the workers' progress, a no-op without a checkpointer.
    pub fn backup(&self) -> Result<()> {
        let Some(checkpointer) = &self.checkpointer else {
            return Ok(());
        };

        let snapshot = Snapshot {
            model_id: self.model_id,
            shard_id: self.shard_id,
            min_clock: self.tracker.min_clock(),
            progress: self.tracker.snapshot(),
            entries: self.storage.entries(),
        };

        checkpointer.save(&snapshot).map_err(ModelErr::Backup)
    }

    /// Restores the last snapshot, with every registered worker back at its minimum clock.
    ///
    /// # Returns
    /// The recovered minimum clock, or a `ModelErr::Recovery` leaving the state untouched.
    pub fn recover(&mut self) -> Result<Clock> {
        let checkpointer = self
            .checkpointer
            .as_ref()
            .ok_or(ModelErr::Recovery(SnapshotErr::NotConfigured))?;

        let snapshot = checkpointer
            .load(self.model_id, self.shard_id)
            .map_err(ModelErr::Recovery)?;

        // Every worker resumes from the recovered minimum clock, whatever it had
        // reached when the snapshot was taken.
        let progress: Vec<_> = snapshot
            .progress
            .iter()
            .map(|&(worker, _)| (worker, snapshot.min_clock))
            .collect();

        self.storage.restore(&snapshot.entries);
        self.tracker.restore(&progress, snapshot.min_clock);
        self.last_add.clear();

        info!(
            model_id = self.model_id,
            shard_id = self.shard_id,
            min_clock = snapshot.min_clock;
            "recovered from snapshot"
        );
        Ok(snapshot.min_clock)
    }
}
