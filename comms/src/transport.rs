//! The message bus between shards, worker helpers and worker threads.

use std::{
    collections::HashMap,
    error::Error,
    fmt::{self, Display},
};

use log::{debug, warn};
use parking_lot::RwLock;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{EndpointId, Message};

/// The specific result type for the transport module.
pub type Result<T> = std::result::Result<T, TransportErr>;

/// Error returned when a message couldn't be handed to its receiver.
#[derive(Debug)]
pub enum TransportErr {
    UnknownEndpoint(EndpointId),
    Closed(EndpointId),
}

impl Display for TransportErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErr::UnknownEndpoint(id) => write!(f, "no endpoint registered with id {id}"),
            TransportErr::Closed(id) => write!(f, "the queue of endpoint {id} is closed"),
        }
    }
}

impl Error for TransportErr {}

/// Fire and forget delivery of messages between named endpoints.
///
/// Implementations must keep the order of messages sent from one sender to one receiver.
/// Delivery to an open endpoint is reliable: a `Clock` is sent once and never resent,
/// only requests awaiting a reply are retried by the client.
pub trait Transport: Send + Sync {
    /// Delivers `msg` to the endpoint named by `msg.meta.recver`.
    ///
    /// # Arguments
    /// * `msg` - The message to deliver.
    ///
    /// # Returns
    /// A `TransportErr` if the receiver is unknown or no longer listening.
    fn send(&self, msg: Message) -> Result<()>;
}

/// An in-process `Transport`, every endpoint owns an unbounded queue.
#[derive(Debug, Default)]
pub struct Mailbox {
    queues: RwLock<HashMap<EndpointId, UnboundedSender<Message>>>,
}

impl Mailbox {
    /// Creates a new empty `Mailbox`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new queue for the endpoint `id`, replacing any previous one.
    ///
    /// # Arguments
    /// * `id` - The endpoint's id.
    ///
    /// # Returns
    /// The receiving end of the endpoint's queue.
    pub fn open(&self, id: EndpointId) -> UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.queues.write().insert(id, tx);
        debug!(endpoint = id; "opened queue");
        rx
    }

    /// Makes messages addressed to `id` land on the queue of the endpoint `to`.
    ///
    /// # Arguments
    /// * `id` - The aliased endpoint.
    /// * `to` - An endpoint with an already opened queue.
    ///
    /// # Returns
    /// A `TransportErr` if `to` has no queue.
    pub fn route(&self, id: EndpointId, to: EndpointId) -> Result<()> {
        let mut queues = self.queues.write();
        let tx = queues
            .get(&to)
            .cloned()
            .ok_or(TransportErr::UnknownEndpoint(to))?;

        queues.insert(id, tx);
        Ok(())
    }

    /// Removes the queue (or alias) of `id`.
    pub fn close(&self, id: EndpointId) {
        self.queues.write().remove(&id);
    }

    /// Whether `id` currently has a queue.
    pub fn contains(&self, id: EndpointId) -> bool {
        self.queues.read().contains_key(&id)
    }
}

impl Transport for Mailbox {
    fn send(&self, msg: Message) -> Result<()> {
        let recver = msg.meta.recver;
        let queues = self.queues.read();

        let Some(tx) = queues.get(&recver) else {
            warn!(recver = recver; "dropping {} for an unknown endpoint", msg.kind());
            return Err(TransportErr::UnknownEndpoint(recver));
        };

        tx.send(msg).map_err(|_| TransportErr::Closed(recver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Meta, Request};

    fn clock_msg(sender: EndpointId, recver: EndpointId) -> Message {
        Message::request(Meta::new(sender, recver, 0), Request::Clock)
    }

    #[test]
    fn delivers_in_send_order() {
        let mailbox = Mailbox::new();
        let mut rx = mailbox.open(1);

        for sender in 10..13 {
            mailbox.send(clock_msg(sender, 1)).unwrap();
        }

        let senders: Vec<_> = (0..3)
            .map(|_| rx.try_recv().unwrap().meta.sender)
            .collect();
        assert_eq!(senders, [10, 11, 12]);
    }

    #[test]
    fn routed_endpoints_share_the_target_queue() {
        let mailbox = Mailbox::new();
        let mut rx = mailbox.open(50);
        mailbox.route(100, 50).unwrap();
        mailbox.route(101, 50).unwrap();

        mailbox.send(clock_msg(0, 100)).unwrap();
        mailbox.send(clock_msg(0, 101)).unwrap();

        assert_eq!(rx.try_recv().unwrap().meta.recver, 100);
        assert_eq!(rx.try_recv().unwrap().meta.recver, 101);
    }

    #[test]
    fn unknown_and_closed_endpoints_fail() {
        let mailbox = Mailbox::new();
        assert!(matches!(
            mailbox.send(clock_msg(0, 9)),
            Err(TransportErr::UnknownEndpoint(9))
        ));
        assert!(mailbox.route(1, 9).is_err());

        let rx = mailbox.open(9);
        drop(rx);
        assert!(matches!(
            mailbox.send(clock_msg(0, 9)),
            Err(TransportErr::Closed(9))
        ));
    }
}
