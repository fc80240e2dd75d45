use comms::Message;

use super::{ConsistencyModel, ModelCore, Result};

/// Asynchronous parallel, every operation takes effect as soon as it arrives.
pub struct AspModel {
    core: ModelCore,
}

impl AspModel {
    /// Creates a new `AspModel`.
    ///
    /// # Arguments
    /// * `core` - The shared model state.
    ///
    /// # Returns
    /// A new `AspModel` instance.
    pub fn new(core: ModelCore) -> Self {
        Self { core }
    }
}

impl ConsistencyModel for AspModel {
    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModelCore {
        &mut self.core
    }

    fn add(&mut self, msg: Message, out: &mut Vec<Message>) {
        if let Some(msg) = self.core.accept_add(msg, out) {
            self.core.apply_add(&msg);
        }
    }

    fn get(&mut self, msg: Message, out: &mut Vec<Message>) {
        if self.core.admits(&msg) {
            out.push(self.core.serve_get(&msg));
        }
    }

    fn clock(&mut self, msg: Message, _out: &mut Vec<Message>) -> Result<()> {
        if !self.core.admits(&msg) {
            return Ok(());
        }

        match self.core.tracker_mut().advance(msg.meta.sender) {
            Some(min_clock) => self.core.on_min_clock(min_clock),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use comms::Reply;

    use super::*;
    use crate::consistency::testing::*;

    #[test]
    fn operations_take_effect_immediately() {
        let mut model = AspModel::new(new_core(MODEL, None));
        let mut out = Vec::new();
        model.reset_worker(reset(&[100, 101]), &mut out);
        out.clear();

        model.add(add(100, 1, &[0, 1], &[1.0, 2.0]), &mut out);
        assert_eq!(replies(&out), [Reply::AddAck]);
        out.clear();

        model.clock(clock(100), &mut out).unwrap();
        model.clock(clock(100), &mut out).unwrap();
        model.get(get(100, &[0, 1]), &mut out);

        assert_eq!(
            replies(&out),
            [Reply::Values {
                keys: vec![0, 1],
                vals: vec![1.0, 2.0]
            }]
        );
        assert_eq!(out[0].meta.round, 2);
        assert_eq!(model.min_clock(), 0);
    }

    #[test]
    fn unregistered_workers_are_ignored() {
        let mut model = AspModel::new(new_core(MODEL, None));
        let mut out = Vec::new();
        model.reset_worker(reset(&[100]), &mut out);
        out.clear();

        model.add(add(7, 1, &[0], &[1.0]), &mut out);
        model.get(get(7, &[0]), &mut out);
        model.clock(clock(7), &mut out).unwrap();

        assert!(out.is_empty());
        assert_eq!(model.progress(7), None);
        assert_eq!(model.core().storage().len(), 0);
    }

    #[test]
    fn resent_adds_are_acked_but_applied_once() {
        let mut model = AspModel::new(new_core(MODEL, None));
        let mut out = Vec::new();
        model.reset_worker(reset(&[100]), &mut out);
        out.clear();

        model.add(add(100, 9, &[3], &[1.5]), &mut out);
        model.add(add(100, 9, &[3], &[1.5]), &mut out);
        assert_eq!(replies(&out), [Reply::AddAck, Reply::AddAck]);
        out.clear();

        model.get(get(100, &[3]), &mut out);
        assert_eq!(
            replies(&out),
            [Reply::Values {
                keys: vec![3],
                vals: vec![1.5]
            }]
        );
    }

    #[test]
    fn get_of_unknown_keys_reports_them() {
        let mut model = AspModel::new(new_core(MODEL, None));
        let mut out = Vec::new();
        model.reset_worker(reset(&[100]), &mut out);
        out.clear();

        model.add(add(100, 1, &[1], &[1.0]), &mut out);
        out.clear();
        model.get(get(100, &[0, 1, 2]), &mut out);

        assert_eq!(replies(&out), [Reply::MissingKeys(vec![0, 2])]);
    }
}
