use std::{
    collections::{BTreeSet, HashMap},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use comms::{Message, ModelId, Reply, ShardId, WorkerId, msg::Body};
use log::{debug, trace};
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::error::Result;

/// Identifies one distributed request, stamped into the `timestamp` of every sub request.
pub type RequestId = u64;

/// Invoked with every accepted reply of a request.
pub type ReplyHandler = Box<dyn FnMut(&Message) + Send>;

/// Invoked once, when the last pending shard of a request replies.
pub type CompletionHandler = Box<dyn FnOnce() + Send>;

type Caller = (WorkerId, ModelId);

struct Tracker {
    id: RequestId,
    pending: BTreeSet<ShardId>,
    /// Pending shards that confirmed they hold the request back on purpose.
    deferred: BTreeSet<ShardId>,
    on_reply: Option<ReplyHandler>,
    on_complete: Option<CompletionHandler>,
}

struct Outstanding {
    tracker: Mutex<Tracker>,
    done: Condvar,
}

/// Tracks the outstanding distributed request of every `(worker, model)` pair and
/// wakes the blocked worker once every shard involved has replied.
pub struct CallbackRunner {
    requests: Mutex<HashMap<Caller, Arc<Outstanding>>>,
    next_id: AtomicU64,
    tick: Duration,
}

impl CallbackRunner {
    /// Creates a new `CallbackRunner`.
    ///
    /// # Arguments
    /// * `tick` - Period at which blocked waiters are woken to check for timeouts.
    ///
    /// # Returns
    /// A new `CallbackRunner` instance.
    pub fn new(tick: Duration) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            // 0 is left for untagged messages.
            next_id: AtomicU64::new(1),
            tick,
        }
    }

    /// Starts tracking a new request of `caller` on `model`, replacing any previous one.
    ///
    /// # Arguments
    /// * `caller` - The requesting worker.
    /// * `model` - The model the request targets.
    /// * `shards` - Every shard that must reply.
    ///
    /// # Returns
    /// The id of the new request.
    pub fn new_request(&self, caller: WorkerId, model: ModelId, shards: &[ShardId]) -> RequestId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let outstanding = Outstanding {
            tracker: Mutex::new(Tracker {
                id,
                pending: shards.iter().copied().collect(),
                deferred: BTreeSet::new(),
                on_reply: None,
                on_complete: None,
            }),
            done: Condvar::new(),
        };

        let replaced = self
            .requests
            .lock()
            .insert((caller, model), Arc::new(outstanding));

        if replaced.is_some() {
            debug!(caller = caller, model_id = model; "replacing an unfinished request");
        }

        id
    }

    /// Sets the handler merging every accepted reply of the live request.
    ///
    /// # Returns
    /// Whether `caller` has a live request on `model`.
    pub fn register_reply_handler<F>(&self, caller: WorkerId, model: ModelId, handler: F) -> bool
    where
        F: FnMut(&Message) + Send + 'static,
    {
        let Some(outstanding) = self.lookup(caller, model) else {
            return false;
        };

        outstanding.tracker.lock().on_reply = Some(Box::new(handler));
        true
    }

    /// Sets the handler invoked once the live request completes.
    ///
    /// # Returns
    /// Whether `caller` has a live request on `model`.
    pub fn register_completion_handler<F>(&self, caller: WorkerId, model: ModelId, handler: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(outstanding) = self.lookup(caller, model) else {
            return false;
        };

        outstanding.tracker.lock().on_complete = Some(Box::new(handler));
        true
    }

    /// Feeds a reply addressed to `caller`.
    ///
    /// Replies of an earlier request and replies of a shard that already answered
    /// are ignored. A `Reply::Deferred` keeps the shard pending but stops it from
    /// being reported as silent to `wait`'s tick hook.
    ///
    /// # Arguments
    /// * `caller` - The worker the reply is addressed to.
    /// * `model` - The model the reply comes from.
    /// * `msg` - The reply.
    ///
    /// # Returns
    /// Whether the reply was accepted.
    pub fn on_reply(&self, caller: WorkerId, model: ModelId, msg: &Message) -> bool {
        let Some(outstanding) = self.lookup(caller, model) else {
            trace!(caller = caller, model_id = model; "no live request for {}", msg.kind());
            return false;
        };

        let mut tracker = outstanding.tracker.lock();
        let shard = msg.meta.sender;

        if msg.meta.timestamp != tracker.id {
            debug!(caller = caller, shard = shard, timestamp = msg.meta.timestamp; "ignoring stale reply");
            return false;
        }

        if matches!(msg.body, Body::Reply(Reply::Deferred)) {
            if !tracker.pending.contains(&shard) {
                return false;
            }

            trace!(caller = caller, shard = shard; "request deferred by the shard");
            tracker.deferred.insert(shard);
            return true;
        }

        if !tracker.pending.remove(&shard) {
            debug!(caller = caller, shard = shard; "ignoring duplicate reply");
            return false;
        }

        if let Some(handler) = tracker.on_reply.as_mut() {
            handler(msg);
        }

        if tracker.pending.is_empty() {
            if let Some(handler) = tracker.on_complete.take() {
                handler();
            }

            outstanding.done.notify_all();
        }

        true
    }

    /// Blocks until the live request of `caller` on `model` completes.
    ///
    /// # Arguments
    /// * `caller` - The requesting worker.
    /// * `model` - The model the request targets.
    /// * `on_tick` - Called every tick with the shards that haven't replied yet nor
    ///   confirmed a deferral, skipped while there are none.
    ///
    /// # Returns
    /// The first error returned by `on_tick`, in which case the request is abandoned.
    pub fn wait<F>(&self, caller: WorkerId, model: ModelId, mut on_tick: F) -> Result<()>
    where
        F: FnMut(&[ShardId]) -> Result<()>,
    {
        let Some(outstanding) = self.lookup(caller, model) else {
            return Ok(());
        };

        let mut tracker = outstanding.tracker.lock();

        while !tracker.pending.is_empty() {
            if !outstanding.done.wait_for(&mut tracker, self.tick).timed_out() {
                continue;
            }

            let silent: Vec<_> = tracker
                .pending
                .difference(&tracker.deferred)
                .copied()
                .collect();

            if silent.is_empty() {
                continue;
            }

            if let Err(e) = MutexGuard::unlocked(&mut tracker, || on_tick(&silent)) {
                drop(tracker);
                self.remove(caller, model, &outstanding);
                return Err(e);
            }
        }

        drop(tracker);
        self.remove(caller, model, &outstanding);
        Ok(())
    }

    /// Stops tracking the live request of `caller` on `model`, later replies are ignored.
    ///
    /// # Returns
    /// Whether there was a live request.
    pub fn cancel(&self, caller: WorkerId, model: ModelId) -> bool {
        self.requests.lock().remove(&(caller, model)).is_some()
    }

    /// The shards that haven't replied to the live request of `caller` on `model`.
    pub fn pending(&self, caller: WorkerId, model: ModelId) -> Option<Vec<ShardId>> {
        let outstanding = self.lookup(caller, model)?;
        let tracker = outstanding.tracker.lock();
        Some(tracker.pending.iter().copied().collect())
    }

    fn lookup(&self, caller: WorkerId, model: ModelId) -> Option<Arc<Outstanding>> {
        self.requests.lock().get(&(caller, model)).cloned()
    }

    /// Removes the entry of `caller` only if it still is `outstanding`, a newer
    /// request may have replaced it.
    fn remove(&self, caller: WorkerId, model: ModelId, outstanding: &Arc<Outstanding>) {
        let mut requests = self.requests.lock();
        if requests
            .get(&(caller, model))
            .is_some_and(|current| Arc::ptr_eq(current, outstanding))
        {
            requests.remove(&(caller, model));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::AtomicUsize,
        thread,
        time::{Duration, Instant},
    };

    use comms::Meta;

    use super::*;
    use crate::error::ClientErr;

    const CALLER: WorkerId = 100;
    const MODEL: ModelId = 0;

    fn reply_with(shard: ShardId, id: RequestId, reply: Reply) -> Message {
        let mut meta = Meta::new(shard, CALLER, MODEL);
        meta.timestamp = id;
        Message {
            meta,
            body: Body::Reply(reply),
        }
    }

    fn reply(shard: ShardId, id: RequestId) -> Message {
        reply_with(shard, id, Reply::AddAck)
    }

    #[test]
    fn completion_fires_once_and_duplicates_are_ignored() {
        let runner = CallbackRunner::new(Duration::from_millis(10));
        let id = runner.new_request(CALLER, MODEL, &[1, 2]);

        let completions = Arc::new(AtomicUsize::new(0));
        let replies = Arc::new(AtomicUsize::new(0));
        {
            let completions = completions.clone();
            let replies = replies.clone();
            runner.register_completion_handler(CALLER, MODEL, move || {
                completions.fetch_add(1, Ordering::SeqCst);
            });
            runner.register_reply_handler(CALLER, MODEL, move |_| {
                replies.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert!(runner.on_reply(CALLER, MODEL, &reply(1, id)));
        assert!(!runner.on_reply(CALLER, MODEL, &reply(1, id)));
        assert_eq!(runner.pending(CALLER, MODEL), Some(vec![2]));
        assert!(runner.on_reply(CALLER, MODEL, &reply(2, id)));
        assert!(!runner.on_reply(CALLER, MODEL, &reply(2, id)));

        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert_eq!(replies.load(Ordering::SeqCst), 2);

        runner.wait(CALLER, MODEL, |_| panic!("already complete")).unwrap();
        assert_eq!(runner.pending(CALLER, MODEL), None);
        assert!(!runner.on_reply(CALLER, MODEL, &reply(1, id)));
    }

    #[test]
    fn replies_of_an_earlier_request_are_stale() {
        let runner = CallbackRunner::new(Duration::from_millis(10));
        let old = runner.new_request(CALLER, MODEL, &[1]);
        let new = runner.new_request(CALLER, MODEL, &[1]);

        assert_ne!(old, new);
        assert!(!runner.on_reply(CALLER, MODEL, &reply(1, old)));
        assert!(runner.on_reply(CALLER, MODEL, &reply(1, new)));
    }

    #[test]
    fn wait_blocks_until_the_last_reply() {
        let runner = Arc::new(CallbackRunner::new(Duration::from_millis(5)));
        let id = runner.new_request(CALLER, MODEL, &[1, 2]);

        let replier = {
            let runner = runner.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                runner.on_reply(CALLER, MODEL, &reply(2, id));
                thread::sleep(Duration::from_millis(30));
                runner.on_reply(CALLER, MODEL, &reply(1, id));
            })
        };

        let start = Instant::now();
        let mut ticks = 0;
        runner
            .wait(CALLER, MODEL, |pending| {
                assert!(!pending.is_empty());
                ticks += 1;
                Ok(())
            })
            .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(60));
        assert!(ticks > 0);
        replier.join().unwrap();
    }

    #[test]
    fn failing_tick_abandons_the_request() {
        let runner = CallbackRunner::new(Duration::from_millis(1));
        let id = runner.new_request(CALLER, MODEL, &[4, 5]);
        runner.on_reply(CALLER, MODEL, &reply(4, id));

        let err = runner
            .wait(CALLER, MODEL, |pending| {
                Err(ClientErr::ShardUnreachable {
                    shard: pending[0],
                    attempts: 3,
                })
            })
            .unwrap_err();

        assert!(matches!(
            err,
            ClientErr::ShardUnreachable {
                shard: 5,
                attempts: 3
            }
        ));
        assert!(!runner.on_reply(CALLER, MODEL, &reply(5, id)));
    }

    #[test]
    fn cancel_drops_the_tracker() {
        let runner = CallbackRunner::new(Duration::from_millis(1));
        let id = runner.new_request(CALLER, MODEL, &[1]);

        assert!(runner.cancel(CALLER, MODEL));
        assert!(!runner.cancel(CALLER, MODEL));
        assert!(!runner.on_reply(CALLER, MODEL, &reply(1, id)));
        assert!(!runner.register_reply_handler(CALLER, MODEL, |_| {}));
    }

    #[test]
    fn deferred_shards_stay_pending_but_are_not_ticked() {
        let runner = Arc::new(CallbackRunner::new(Duration::from_millis(2)));
        let id = runner.new_request(CALLER, MODEL, &[1, 2]);

        assert!(runner.on_reply(CALLER, MODEL, &reply_with(1, id, Reply::Deferred)));
        assert!(!runner.on_reply(CALLER, MODEL, &reply_with(3, id, Reply::Deferred)));
        assert_eq!(runner.pending(CALLER, MODEL), Some(vec![1, 2]));

        let replier = {
            let runner = runner.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                runner.on_reply(CALLER, MODEL, &reply(2, id));
                thread::sleep(Duration::from_millis(20));
                runner.on_reply(CALLER, MODEL, &reply(1, id));
            })
        };

        let mut ticked = Vec::new();
        runner
            .wait(CALLER, MODEL, |silent| {
                ticked.extend_from_slice(silent);
                Ok(())
            })
            .unwrap();

        assert!(!ticked.is_empty());
        assert!(ticked.iter().all(|&shard| shard == 2));
        replier.join().unwrap();
    }
}
