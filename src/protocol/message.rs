//! Messages popped from the broker

use std::collections::HashMap;
use std::time::SystemTime;

/// A message leased to this client
///
/// Only the body counts towards the cache memory of a process queue.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub topic: String,
    pub message_id: String,
    pub tag: Option<String>,
    pub keys: Vec<String>,
    pub properties: HashMap<String, String>,
    pub body: Vec<u8>,
    /// Handle the broker expects back on ack or invisibility change
    pub receipt_handle: String,
    pub delivery_attempt: u32,
    pub born_timestamp: SystemTime,
}

impl Message {
    pub fn new(topic: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            message_id: String::new(),
            tag: None,
            keys: Vec::new(),
            properties: HashMap::new(),
            body: body.into(),
            receipt_handle: String::new(),
            delivery_attempt: 1,
            born_timestamp: SystemTime::now(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = message_id.into();
        self
    }

    pub fn body_len(&self) -> u64 {
        self.body.len() as u64
    }
}
