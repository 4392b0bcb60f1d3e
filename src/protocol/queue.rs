//! Partition addressing

use serde::{Deserialize, Serialize};
use std::fmt;

/// One (topic, queue) partition hosted by a broker
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageQueue {
    pub topic: String,
    pub broker: String,
    pub queue_id: i32,
    /// Address requests for this partition are sent to
    pub endpoint: String,
}

impl MessageQueue {
    pub fn new(
        topic: impl Into<String>,
        broker: impl Into<String>,
        queue_id: i32,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            broker: broker.into(),
            queue_id,
            endpoint: endpoint.into(),
        }
    }
}

impl fmt::Display for MessageQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.topic, self.broker, self.queue_id)
    }
}
