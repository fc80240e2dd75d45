use std::num::NonZeroU32;

use comms::{Key, Message, Meta, ModelId, Reply, Request, ShardId, Val, WorkerId, msg::Body};

use super::ModelCore;
use crate::storage::{Checkpointer, MapStorage};

pub const SHARD: ShardId = 0;
pub const MODEL: ModelId = 0;

pub fn new_core(model_id: ModelId, checkpointer: Option<Checkpointer>) -> ModelCore {
    let interval = NonZeroU32::new(10).unwrap();
    ModelCore::new(
        model_id,
        SHARD,
        Box::new(MapStorage::new()),
        checkpointer,
        interval,
    )
}

fn request(sender: WorkerId, timestamp: u64, req: Request) -> Message {
    let mut meta = Meta::new(sender, SHARD, MODEL);
    meta.timestamp = timestamp;
    Message::request(meta, req)
}

pub fn reset(workers: &[WorkerId]) -> Message {
    let workers = workers.to_vec();
    request(1, 0, Request::ResetWorker { workers })
}

pub fn add(sender: WorkerId, timestamp: u64, keys: &[Key], vals: &[Val]) -> Message {
    let (keys, vals) = (keys.to_vec(), vals.to_vec());
    request(sender, timestamp, Request::Add { keys, vals })
}

pub fn get(sender: WorkerId, keys: &[Key]) -> Message {
    let keys = keys.to_vec();
    request(sender, 0, Request::Get { keys })
}

pub fn clock(sender: WorkerId) -> Message {
    request(sender, 0, Request::Clock)
}

pub fn replies(out: &[Message]) -> Vec<Reply> {
    out.iter()
        .map(|msg| match &msg.body {
            Body::Reply(reply) => reply.clone(),
            Body::Request(req) => panic!("expected a reply, got {req:?}"),
        })
        .collect()
}

pub fn values(keys: &[Key], vals: &[Val]) -> Reply {
    Reply::Values {
        keys: keys.to_vec(),
        vals: vals.to_vec(),
    }
}
