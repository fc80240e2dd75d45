use std::mem;

use comms::{Message, Reply};
use log::trace;

use super::{ConsistencyModel, ModelCore, Result};

/// Bulk synchronous parallel.
///
/// Adds are buffered until every worker finishes the current round. A get is only
/// served while its sender is not ahead of the slowest worker, otherwise it waits
/// for the round to close and observes every add of that round.
pub struct BspModel {
    core: ModelCore,
    add_queue: Vec<Message>,
    get_queue: Vec<Message>,
}

impl BspModel {
    /// Creates a new `BspModel`.
    ///
    /// # Arguments
    /// * `core` - The shared model state.
    ///
    /// # Returns
    /// A new `BspModel` instance.
    pub fn new(core: ModelCore) -> Self {
        Self {
            core,
            add_queue: Vec::new(),
            get_queue: Vec::new(),
        }
    }

    /// The amount of adds waiting for the current round to close.
    pub fn pending_adds(&self) -> usize {
        self.add_queue.len()
    }

    /// The amount of gets waiting for the current round to close.
    pub fn pending_gets(&self) -> usize {
        self.get_queue.len()
    }
}

impl ConsistencyModel for BspModel {
    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModelCore {
        &mut self.core
    }

    fn add(&mut self, msg: Message, out: &mut Vec<Message>) {
        if let Some(msg) = self.core.accept_add(msg, out) {
            self.add_queue.push(msg);
        }
    }

    fn get(&mut self, msg: Message, out: &mut Vec<Message>) {
        if !self.core.admits(&msg) {
            return;
        }

        let tracker = self.core.tracker();
        if tracker.progress(msg.meta.sender) == Some(tracker.min_clock()) {
            out.push(self.core.serve_get(&msg));
        } else {
            trace!(sender = msg.meta.sender; "deferring get to the end of the round");
            out.push(msg.reply(Reply::Deferred));
            self.get_queue.push(msg);
        }
    }

    fn clock(&mut self, msg: Message, out: &mut Vec<Message>) -> Result<()> {
        if !self.core.admits(&msg) {
            return Ok(());
        }

        let Some(min_clock) = self.core.tracker_mut().advance(msg.meta.sender) else {
            return Ok(());
        };

        for add in mem::take(&mut self.add_queue) {
            self.core.apply_add(&add);
        }

        for get in mem::take(&mut self.get_queue) {
            out.push(self.core.serve_get(&get));
        }

        self.core.on_min_clock(min_clock)
    }
}
