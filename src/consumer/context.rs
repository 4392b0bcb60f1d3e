//! What a process queue needs from the consumer that owns it

use crate::config::ConsumerConfig;
use crate::consumer::process_queue::ProcessQueue;
use crate::protocol::{FilterExpression, Message, MessageQueue};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Read-only accessors and callbacks of an owning consumer
///
/// Process queues hold the owner as `Weak<dyn ConsumerContext>` and resolve
/// it on every operation; once the owner is gone they stop doing anything.
pub trait ConsumerContext: Send + Sync {
    fn config(&self) -> &ConsumerConfig;

    /// Identifier sent with every request
    fn client_id(&self) -> &str;

    /// Filter currently registered for `topic`, if any
    fn filter_expression(&self, topic: &str) -> Option<FilterExpression>;

    /// Runtime on which delayed receives are scheduled
    fn scheduler(&self) -> Handle;

    /// Hand admitted messages to application processing
    fn dispatch(&self, process_queue: &Arc<ProcessQueue>, messages: &[Arc<Message>]);

    /// Issue a receive on `queue` if it is still assigned
    fn receive_message(&self, queue: &MessageQueue, attempt_id: Option<String>);

    fn max_cached_message_quantity(&self) -> u64 {
        self.config().max_cached_message_quantity
    }

    fn max_cached_message_memory(&self) -> u64 {
        self.config().max_cached_message_memory
    }

    fn receive_batch_size(&self) -> u32 {
        self.config().receive_batch_size
    }
}
