//! Hand-off of admitted messages to application processing

use crate::consumer::process_queue::ProcessQueue;
use crate::protocol::{Message, MessageQueue};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Consumes messages a process queue has admitted into its cache
///
/// Implementations must eventually release every message, typically through
/// [`Delivery::release`], or the queue stays throttled.
pub trait MessageDispatcher: Send + Sync {
    fn dispatch(&self, process_queue: &Arc<ProcessQueue>, messages: &[Arc<Message>]);
}

/// One cached message on its way to the application
#[derive(Debug)]
pub struct Delivery {
    pub message: Arc<Message>,
    pub message_queue: MessageQueue,
    process_queue: Weak<ProcessQueue>,
}

impl Delivery {
    pub fn new(message: Arc<Message>, process_queue: &Arc<ProcessQueue>) -> Self {
        Self {
            message,
            message_queue: process_queue.message_queue().clone(),
            process_queue: Arc::downgrade(process_queue),
        }
    }

    /// Give the message's cache share back to its process queue
    ///
    /// Does nothing if the partition was revoked in the meantime.
    pub fn release(self) {
        if let Some(process_queue) = self.process_queue.upgrade() {
            process_queue.account_release(self.message.body_len());
        }
    }
}

/// Forwards deliveries over an unbounded tokio channel
pub struct ChannelDispatcher {
    sender: UnboundedSender<Delivery>,
}

impl ChannelDispatcher {
    pub fn new() -> (Self, UnboundedReceiver<Delivery>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl MessageDispatcher for ChannelDispatcher {
    fn dispatch(&self, process_queue: &Arc<ProcessQueue>, messages: &[Arc<Message>]) {
        for message in messages {
            let delivery = Delivery::new(Arc::clone(message), process_queue);
            if let Err(mpsc::error::SendError(delivery)) = self.sender.send(delivery) {
                log::warn!(
                    "Delivery channel closed, releasing message {} of {}",
                    delivery.message.message_id,
                    process_queue.simple_name()
                );
                delivery.release();
            }
        }
    }
}
