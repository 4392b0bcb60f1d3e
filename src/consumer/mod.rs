//! Push consumer and per-partition process queues
//!
//! # Overview
//!
//! A push consumer owns one [`ProcessQueue`] for every partition assigned to
//! it. Each queue runs its own receive loop: it asks the broker for a batch
//! of messages under a lease (a pop request), caches what comes back, hands
//! it to the application, and asks again unless the local cache is full.
//!
//! # Architecture
//!
//! ```text
//!             ┌─────────────────────────────┐
//!             │        PushConsumer         │
//!             │  subscriptions, config,     │
//!             │  assignments (owning)       │
//!             └──────┬──────────────▲───────┘
//!        Arc         │              │ Weak<dyn ConsumerContext>
//!             ┌──────▼──────────────┴───────┐
//!             │        ProcessQueue         │──── receive ───► ClientTransport
//!             │  cache counters, idle mark  │                        │
//!             └──────▲──────────────────────┘                        │
//!       Weak         │                                               │
//!             ┌──────┴──────────────────────┐     completion         │
//!             │     AsyncReceiveHandler     │◄───────────────────────┘
//!             │  admit, dispatch, retry     │
//!             └─────────────┬───────────────┘
//!                           ▼
//!                  MessageDispatcher ──► Delivery::release
//! ```
//!
//! Every upward or sideways arrow is non-owning. Revoking a partition drops
//! its queue and handler; late completions and scheduled retries then find
//! nothing to upgrade and stop quietly.

pub mod api;
mod completion;
mod context;
mod dispatch;
mod error;
mod process_queue;
mod push_consumer;
mod subscription;

pub use completion::{AsyncReceiveHandler, ReceiveCompletion};
pub use context::ConsumerContext;
pub use dispatch::{ChannelDispatcher, Delivery, MessageDispatcher};
pub use error::{ConsumerError, ConsumerResult};
pub use process_queue::ProcessQueue;
pub use push_consumer::PushConsumer;
pub use subscription::SubscriptionTable;

#[cfg(test)]
mod tests;
