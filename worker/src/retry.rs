use std::{collections::HashMap, time::Instant};

use comms::{Message, ShardId, Transport};
use log::warn;

use crate::{
    config::ClientConfig,
    error::{ClientErr, Result},
};

struct SubRequest {
    msg: Message,
    sent_at: Instant,
    attempts: usize,
}

/// Sends the sub requests of one distributed request and resends the ones whose
/// shard didn't answer within the time to live.
pub struct Resender<'a> {
    transport: &'a dyn Transport,
    config: ClientConfig,
    subs: HashMap<ShardId, SubRequest>,
}

impl<'a> Resender<'a> {
    /// Creates a new `Resender` with nothing sent yet.
    ///
    /// # Arguments
    /// * `transport` - Where sub requests are sent.
    /// * `config` - The time to live and retry bound of every sub request.
    ///
    /// # Returns
    /// A new `Resender` instance.
    pub fn new(transport: &'a dyn Transport, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            subs: HashMap::new(),
        }
    }

    /// Sends `msg` and keeps it around for resending.
    pub fn send(&mut self, msg: Message) -> Result<()> {
        let shard = msg.meta.recver;
        self.transport.send(msg.clone())?;

        let sub = SubRequest {
            msg,
            sent_at: Instant::now(),
            attempts: 1,
        };
        self.subs.insert(shard, sub);
        Ok(())
    }

    /// Resends every expired sub request among `pending`.
    ///
    /// # Arguments
    /// * `pending` - The shards that neither replied nor confirmed a deferral.
    ///
    /// # Returns
    /// `ClientErr::ShardUnreachable` once a shard exhausts its retries.
    pub fn on_tick(&mut self, pending: &[ShardId]) -> Result<()> {
        let now = Instant::now();

        for shard in pending {
            let Some(sub) = self.subs.get_mut(shard) else {
                continue;
            };

            if now.duration_since(sub.sent_at) < self.config.ttl() {
                continue;
            }

            if sub.attempts > self.config.max_retries() {
                return Err(ClientErr::ShardUnreachable {
                    shard: *shard,
                    attempts: sub.attempts,
                });
            }

            warn!(
                shard = *shard,
                timestamp = sub.msg.meta.timestamp,
                attempt = sub.attempts + 1;
                "resending {}",
                sub.msg.kind()
            );

            self.transport.send(sub.msg.clone())?;
            sub.sent_at = now;
            sub.attempts += 1;
        }

        Ok(())
    }
}
