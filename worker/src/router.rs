use std::{ops::ControlFlow, sync::Arc};

use comms::{EndpointId, Message, Request, msg::Body};
use log::{info, warn};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::callback::CallbackRunner;

/// Receives every reply addressed to the local worker threads and feeds it to the
/// `CallbackRunner`.
pub struct ReplyRouter {
    endpoint: EndpointId,
    callbacks: Arc<CallbackRunner>,
}

impl ReplyRouter {
    /// Creates a new `ReplyRouter`.
    ///
    /// # Arguments
    /// * `endpoint` - The endpoint this router listens on.
    /// * `callbacks` - Where replies are fed.
    ///
    /// # Returns
    /// A new `ReplyRouter` instance.
    pub fn new(endpoint: EndpointId, callbacks: Arc<CallbackRunner>) -> Self {
        Self {
            endpoint,
            callbacks,
        }
    }

    /// Routes one message.
    ///
    /// # Returns
    /// `ControlFlow::Break` once an exit request is received.
    pub fn dispatch(&self, msg: &Message) -> ControlFlow<()> {
        match &msg.body {
            Body::Reply(_) => {
                self.callbacks
                    .on_reply(msg.meta.recver, msg.meta.model_id, msg);
            }
            Body::Request(Request::Exit) => return ControlFlow::Break(()),
            Body::Request(_) => {
                warn!(endpoint = self.endpoint; "unexpected {}", msg.kind());
            }
        }

        ControlFlow::Continue(())
    }

    /// Routes the messages of `rx` until an exit request arrives or every sender is dropped.
    pub async fn run(self, mut rx: UnboundedReceiver<Message>) {
        while let Some(msg) = rx.recv().await {
            if self.dispatch(&msg).is_break() {
                break;
            }
        }

        info!(endpoint = self.endpoint; "reply router stopped");
    }
}
