use std::collections::HashMap;

use comms::{Clock, WorkerId};

/// Keeps the logical clock of every registered worker of one model and the
/// minimum over all of them.
///
/// The minimum clock never decreases, it only moves when the single worker
/// sitting on it advances.
#[derive(Debug, Default, Clone)]
pub struct ProgressTracker {
    progress: HashMap<WorkerId, Clock>,
    min_clock: Clock,
}

impl ProgressTracker {
    /// Creates a new empty `ProgressTracker`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `workers`, all of them starting at clock 0.
    ///
    /// Previously registered workers are forgotten.
    ///
    /// # Arguments
    /// * `workers` - The ids of every participating worker.
    pub fn init(&mut self, workers: &[WorkerId]) {
        self.progress = workers.iter().map(|&w| (w, 0)).collect();
        self.min_clock = 0;
    }

    /// Advances the clock of `worker` by one.
    ///
    /// # Arguments
    /// * `worker` - The worker that finished a round.
    ///
    /// # Returns
    /// The new minimum clock if this worker was the unique one holding the previous
    /// minimum, `None` if the minimum didn't move or the worker isn't registered.
    pub fn advance(&mut self, worker: WorkerId) -> Option<Clock> {
        let clock = *self.progress.get(&worker)?;
        let was_unique_min = clock == self.min_clock && self.is_unique_min(worker);

        self.progress.insert(worker, clock + 1);

        if was_unique_min {
            self.min_clock += 1;
            return Some(self.min_clock);
        }

        None
    }

    /// Whether no other worker than `worker` sits on the minimum clock.
    fn is_unique_min(&self, worker: WorkerId) -> bool {
        self.progress
            .iter()
            .all(|(&w, &c)| w == worker || c != self.min_clock)
    }

    /// The current clock of `worker`, `None` if it isn't registered.
    pub fn progress(&self, worker: WorkerId) -> Option<Clock> {
        self.progress.get(&worker).copied()
    }

    /// The minimum clock over every registered worker.
    pub fn min_clock(&self) -> Clock {
        self.min_clock
    }

    /// Whether `worker` took part in the last `init`.
    pub fn is_registered(&self, worker: WorkerId) -> bool {
        self.progress.contains_key(&worker)
    }

    /// The amount of registered workers.
    pub fn len(&self) -> usize {
        self.progress.len()
    }

    pub fn is_empty(&self) -> bool {
        self.progress.is_empty()
    }

    /// Every `(worker, clock)` pair, sorted by worker id.
    pub fn snapshot(&self) -> Vec<(WorkerId, Clock)> {
        let mut entries: Vec<_> = self.progress.iter().map(|(&w, &c)| (w, c)).collect();
        entries.sort_unstable();
        entries
    }

    /// Replaces the whole state with a previously taken snapshot.
    ///
    /// # Arguments
    /// * `progress` - The `(worker, clock)` pairs.
    /// * `min_clock` - The minimum clock at the time of the snapshot.
    pub fn restore(&mut self, progress: &[(WorkerId, Clock)], min_clock: Clock) {
        self.progress = progress.iter().copied().collect();
        self.min_clock = min_clock;
    }
}
