//! Pop-lease request descriptor
//!
//! Independent of any wire encoding; a transport maps it onto its own
//! message types.

use crate::protocol::filter::FilterExpression;
use crate::protocol::queue::MessageQueue;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Namespaced resource name (consumer group, topic)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resource {
    pub namespace: String,
    pub name: String,
}

impl Resource {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// Duration as whole seconds plus sub-second nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDuration {
    pub seconds: i64,
    pub nanos: i32,
}

impl From<Duration> for WireDuration {
    fn from(duration: Duration) -> Self {
        Self {
            seconds: duration.as_secs() as i64,
            nanos: duration.subsec_nanos() as i32,
        }
    }
}

impl From<WireDuration> for Duration {
    fn from(wire: WireDuration) -> Self {
        Duration::new(wire.seconds.max(0) as u64, wire.nanos.max(0) as u32)
    }
}

/// Request to lease a batch of messages from one partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiveMessageRequest {
    pub group: Resource,
    pub message_queue: MessageQueue,
    pub filter_expression: FilterExpression,
    pub batch_size: u32,
    /// Broker extends the lease on its own while the client processes
    pub auto_renew: bool,
    pub invisible_duration: WireDuration,
    /// Empty when no identifier could be generated; the broker then cannot
    /// deduplicate retries of this request
    pub attempt_id: String,
}
