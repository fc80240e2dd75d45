use comms::{Clock, Message, ModelId, WorkerId};

use super::{ModelCore, Result};

/// Decides when the operations of each worker take effect on one shard's slice of a model.
///
/// Implementors are pure state machines: replies are pushed into `out` and sent by
/// whoever drives the model, in push order.
pub trait ConsistencyModel: Send {
    /// The shared state of the model.
    fn core(&self) -> &ModelCore;

    /// Mutable access to the shared state of the model.
    fn core_mut(&mut self) -> &mut ModelCore;

    /// Handles an add request, always acknowledged on receipt.
    ///
    /// # Arguments
    /// * `msg` - The add request.
    /// * `out` - Where the replies are pushed.
    fn add(&mut self, msg: Message, out: &mut Vec<Message>);

    /// Handles a get request, the reply may be deferred until a later clock.
    ///
    /// # Arguments
    /// * `msg` - The get request.
    /// * `out` - Where the replies are pushed.
    fn get(&mut self, msg: Message, out: &mut Vec<Message>);

    /// Handles a clock request, advancing the sender's progress and releasing
    /// whatever was waiting on the minimum clock.
    ///
    /// # Arguments
    /// * `msg` - The clock request.
    /// * `out` - Where the replies of released gets are pushed.
    ///
    /// # Returns
    /// A `ModelErr` if a due backup couldn't be written.
    fn clock(&mut self, msg: Message, out: &mut Vec<Message>) -> Result<()>;

    /// Registers the workers carried by the message, resetting their progress to zero.
    fn reset_worker(&mut self, msg: Message, out: &mut Vec<Message>) {
        if let Some(ack) = self.core_mut().reset(&msg) {
            out.push(ack);
        }
    }

    fn model_id(&self) -> ModelId {
        self.core().model_id()
    }

    /// The amount of clocks `worker` has completed, `None` if it isn't registered.
    fn progress(&self, worker: WorkerId) -> Option<Clock> {
        self.core().tracker().progress(worker)
    }

    fn min_clock(&self) -> Clock {
        self.core().tracker().min_clock()
    }

    /// Persists the current state of the model.
    fn backup(&self) -> Result<()> {
        self.core().backup()
    }

    /// Restores the last persisted state of the model.
    ///
    /// # Returns
    /// The recovered minimum clock.
    fn recover(&mut self) -> Result<Clock> {
        self.core_mut().recover()
    }
}
