use crate::{Clock, EndpointId, Key, ModelId, Val, WorkerId};

/// The routing and correlation header of every `Message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    pub sender: EndpointId,
    pub recver: EndpointId,
    pub model_id: ModelId,
    /// Id of the distributed request this message belongs to, echoed back on replies.
    pub timestamp: u64,
    /// On `Get` replies, the requester's clock at the moment it was served.
    pub round: Clock,
}

impl Meta {
    /// Creates a new `Meta` header with a zeroed timestamp and round.
    ///
    /// # Arguments
    /// * `sender` - The sending endpoint.
    /// * `recver` - The receiving endpoint.
    /// * `model_id` - The model this message targets.
    ///
    /// # Returns
    /// A new `Meta` instance.
    pub fn new(sender: EndpointId, recver: EndpointId, model_id: ModelId) -> Self {
        Self {
            sender,
            recver,
            model_id,
            timestamp: 0,
            round: 0,
        }
    }
}

/// Operations sent from workers (or the driver) to a shard.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Add { keys: Vec<Key>, vals: Vec<Val> },
    Get { keys: Vec<Key> },
    Clock,
    ResetWorker { workers: Vec<WorkerId> },
    Heartbeat,
    Exit,
}

/// Answers sent from a shard back to the requesting endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    AddAck,
    Values { keys: Vec<Key>, vals: Vec<Val> },
    MissingKeys(Vec<Key>),
    /// The get was received but is held back until the slower workers catch up,
    /// its values follow in a later reply.
    Deferred,
    ResetAck,
    Heartbeat,
}

/// The body of a `Message`.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Request(Request),
    Reply(Reply),
}

/// The application layer message for the entire system.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub meta: Meta,
    pub body: Body,
}

impl Message {
    /// Creates a new request message.
    ///
    /// # Arguments
    /// * `meta` - The message header.
    /// * `req` - The requested operation.
    ///
    /// # Returns
    /// A new `Message` instance.
    pub fn request(meta: Meta, req: Request) -> Self {
        Self {
            meta,
            body: Body::Request(req),
        }
    }

    /// Builds the reply to this message, swapping sender and receiver and keeping
    /// the model and timestamp so the requester can correlate it.
    ///
    /// # Arguments
    /// * `reply` - The reply body.
    ///
    /// # Returns
    /// A new reply `Message` addressed to this message's sender.
    pub fn reply(&self, reply: Reply) -> Self {
        let meta = Meta {
            sender: self.meta.recver,
            recver: self.meta.sender,
            ..self.meta
        };

        Self {
            meta,
            body: Body::Reply(reply),
        }
    }

    /// Same as `reply` but also tags the reply with a round number.
    pub fn reply_at(&self, reply: Reply, round: Clock) -> Self {
        let mut msg = self.reply(reply);
        msg.meta.round = round;
        msg
    }

    /// A short static name of the message kind, used for logging.
    pub fn kind(&self) -> &'static str {
        match &self.body {
            Body::Request(Request::Add { .. }) => "request/add",
            Body::Request(Request::Get { .. }) => "request/get",
            Body::Request(Request::Clock) => "request/clock",
            Body::Request(Request::ResetWorker { .. }) => "request/reset_worker",
            Body::Request(Request::Heartbeat) => "request/heartbeat",
            Body::Request(Request::Exit) => "request/exit",
            Body::Reply(Reply::AddAck) => "reply/add_ack",
            Body::Reply(Reply::Values { .. }) => "reply/values",
            Body::Reply(Reply::MissingKeys(_)) => "reply/missing_keys",
            Body::Reply(Reply::Deferred) => "reply/deferred",
            Body::Reply(Reply::ResetAck) => "reply/reset_ack",
            Body::Reply(Reply::Heartbeat) => "reply/heartbeat",
        }
    }
}
