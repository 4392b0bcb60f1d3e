//! Wire-agnostic protocol types
//!
//! Partition addressing, filter expressions, leased messages, the pop-lease
//! request descriptor and its outcomes, plus request metadata signing. A
//! transport translates these into whatever encoding it speaks.

mod filter;
mod message;
mod queue;
mod request;
mod result;
pub mod signature;

pub use filter::{FilterExpression, FilterType, MATCH_ALL};
pub use message::Message;
pub use queue::MessageQueue;
pub use request::{ReceiveMessageRequest, Resource, WireDuration};
pub use result::{ReceiveError, ReceiveMessageResult, ReceiveOutcome};
pub use signature::Metadata;
