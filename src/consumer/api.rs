//! Public API for the consumer
//!
//! External modules should import from here rather than from the internal
//! modules.

// Owner and per-partition queues
pub use crate::consumer::context::ConsumerContext;
pub use crate::consumer::process_queue::ProcessQueue;
pub use crate::consumer::push_consumer::PushConsumer;
pub use crate::consumer::subscription::SubscriptionTable;

// Completion and dispatch
pub use crate::consumer::completion::{AsyncReceiveHandler, ReceiveCompletion};
pub use crate::consumer::dispatch::{ChannelDispatcher, Delivery, MessageDispatcher};

// Error handling
pub use crate::consumer::error::{ConsumerError, ConsumerResult};
