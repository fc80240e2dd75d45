use comms::{
    Clock, Message, WorkerId,
    msg::{Body, Reply, Request},
};
use log::{trace, warn};

use super::{ConsistencyModel, ModelCore, Result};
use crate::tracking::PendingBuffer;

/// Stale synchronous parallel.
///
/// A worker may run at most `staleness` clocks ahead of the slowest one. Operations
/// of a worker further ahead are deferred until the minimum clock catches up.
pub struct SspModel {
    core: ModelCore,
    staleness: Clock,
    buffer: PendingBuffer,
}

impl SspModel {
    /// Creates a new `SspModel`.
    ///
    /// # Arguments
    /// * `core` - The shared model state.
    /// * `staleness` - How many clocks a worker may run ahead of the slowest one.
    ///
    /// # Returns
    /// A new `SspModel` instance.
    pub fn new(core: ModelCore, staleness: Clock) -> Self {
        Self {
            core,
            staleness,
            buffer: PendingBuffer::new(),
        }
    }

    /// The amount of operations waiting for the minimum clock to catch up.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// The minimum clock at which the operations of `worker` become eligible,
    /// `None` if they are eligible right now.
    fn deferral(&self, worker: WorkerId) -> Option<Clock> {
        let tracker = self.core.tracker();
        let progress = tracker.progress(worker)?;

        if progress - tracker.min_clock() <= self.staleness {
            return None;
        }

        Some(progress - self.staleness)
    }

    fn admit_add(&mut self, msg: Message) {
        match self.deferral(msg.meta.sender) {
            None => self.core.apply_add(&msg),
            Some(clock) => {
                trace!(sender = msg.meta.sender, until = clock; "deferring add");
                self.buffer.push(clock, msg);
            }
        }
    }

    fn admit_get(&mut self, msg: Message, out: &mut Vec<Message>) {
        match self.deferral(msg.meta.sender) {
            None => out.push(self.core.serve_get(&msg)),
            Some(clock) => {
                trace!(sender = msg.meta.sender, until = clock; "deferring get");
                self.buffer.push(clock, msg);
            }
        }
    }
}

impl ConsistencyModel for SspModel {
    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModelCore {
        &mut self.core
    }

    fn add(&mut self, msg: Message, out: &mut Vec<Message>) {
        if let Some(msg) = self.core.accept_add(msg, out) {
            self.admit_add(msg);
        }
    }

    fn get(&mut self, msg: Message, out: &mut Vec<Message>) {
        if !self.core.admits(&msg) {
            return;
        }

        if self.deferral(msg.meta.sender).is_some() {
            out.push(msg.reply(Reply::Deferred));
        }

        self.admit_get(msg, out);
    }

    fn clock(&mut self, msg: Message, out: &mut Vec<Message>) -> Result<()> {
        if !self.core.admits(&msg) {
            return Ok(());
        }

        let Some(min_clock) = self.core.tracker_mut().advance(msg.meta.sender) else {
            return Ok(());
        };

        // Released operations are evaluated again, they may still be too far ahead.
        for released in self.buffer.pop_all(min_clock) {
            match released.body {
                Body::Request(Request::Add { .. }) => self.admit_add(released),
                Body::Request(Request::Get { .. }) => self.admit_get(released, out),
                _ => warn!("unexpected {} in the pending buffer", released.kind()),
            }
        }

        self.core.on_min_clock(min_clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consistency::testing::*;

    fn registered(staleness: Clock, workers: &[WorkerId]) -> SspModel {
        let mut model = SspModel::new(new_core(MODEL, None), staleness);
        let mut out = Vec::new();
        model.reset_worker(reset(workers), &mut out);
        model
    }

    #[test]
    fn workers_within_the_bound_are_served_immediately() {
        let mut model = registered(1, &[100, 101]);
        let mut out = Vec::new();

        model.add(add(100, 1, &[4], &[2.0]), &mut out);
        model.clock(clock(100), &mut out).unwrap();
        out.clear();

        model.get(get(100, &[4]), &mut out);
        assert_eq!(replies(&out), [values(&[4], &[2.0])]);
        assert_eq!(out[0].meta.round, 1);
        assert_eq!(model.pending(), 0);
    }

    #[test]
    fn workers_too_far_ahead_wait_for_the_slowest() {
        let mut model = registered(1, &[100, 101]);
        let mut out = Vec::new();

        model.add(add(101, 1, &[4], &[1.0]), &mut out);
        model.clock(clock(100), &mut out).unwrap();
        model.clock(clock(100), &mut out).unwrap();
        out.clear();

        model.add(add(100, 2, &[4], &[10.0]), &mut out);
        assert_eq!(replies(&out), [Reply::AddAck]);
        out.clear();

        model.get(get(100, &[4]), &mut out);
        assert_eq!(replies(&out), [Reply::Deferred]);
        assert_eq!(model.pending(), 2);
        out.clear();

        model.clock(clock(101), &mut out).unwrap();
        assert_eq!(model.min_clock(), 1);
        assert_eq!(model.pending(), 0);
        assert_eq!(replies(&out), [values(&[4], &[11.0])]);
        assert_eq!(out[0].meta.round, 2);
    }

    #[test]
    fn released_operations_are_deferred_again_when_still_ahead() {
        let mut model = registered(0, &[100, 101]);
        let mut out = Vec::new();

        model.add(add(101, 1, &[0], &[1.0]), &mut out);
        model.clock(clock(100), &mut out).unwrap();
        out.clear();

        model.get(get(100, &[0]), &mut out);
        assert_eq!(replies(&out), [Reply::Deferred]);
        assert_eq!(model.pending(), 1);
        out.clear();

        model.clock(clock(100), &mut out).unwrap();
        model.clock(clock(101), &mut out).unwrap();
        assert_eq!(model.min_clock(), 1);
        assert!(out.is_empty());
        assert_eq!(model.pending(), 1);

        model.clock(clock(101), &mut out).unwrap();
        assert_eq!(replies(&out), [values(&[0], &[1.0])]);
        assert_eq!(out[0].meta.round, 2);
        assert_eq!(model.pending(), 0);
    }

    #[test]
    fn get_three_clocks_ahead_is_released_exactly_at_the_bound() {
        let mut model = registered(2, &[100, 101]);
        let mut out = Vec::new();

        model.add(add(101, 1, &[4], &[1.0]), &mut out);
        for _ in 0..2 {
            model.clock(clock(101), &mut out).unwrap();
        }
        for _ in 0..5 {
            model.clock(clock(100), &mut out).unwrap();
        }
        assert_eq!(model.min_clock(), 2);
        assert_eq!(model.progress(100), Some(5));
        out.clear();

        model.get(get(100, &[4]), &mut out);
        assert_eq!(replies(&out), [Reply::Deferred]);
        assert_eq!(model.pending(), 1);
        out.clear();

        model.clock(clock(101), &mut out).unwrap();
        assert_eq!(model.min_clock(), 3);
        assert_eq!(replies(&out), [values(&[4], &[1.0])]);
        assert_eq!(out[0].meta.round, 5);
        assert_eq!(model.pending(), 0);
        out.clear();

        model.get(get(100, &[4]), &mut out);
        assert_eq!(replies(&out), [values(&[4], &[1.0])]);
    }
}
