//! Outcomes of a pop-lease request

use crate::protocol::message::Message;
use std::sync::Arc;
use std::time::Duration;

/// Messages returned by a successful pop
#[derive(Debug, Clone, Default)]
pub struct ReceiveMessageResult {
    pub source_host: String,
    pub messages: Vec<Arc<Message>>,
}

impl ReceiveMessageResult {
    pub fn new(source_host: impl Into<String>, messages: Vec<Arc<Message>>) -> Self {
        Self {
            source_host: source_host.into(),
            messages,
        }
    }
}

/// Failure codes delivered through the completion path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReceiveError {
    #[error("Broker throttled the receive request")]
    TooManyRequests,

    #[error("No message available before the polling timeout")]
    NoContent,

    #[error("Receive request timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Broker error {code}: {message}")]
    Broker { code: i32, message: String },
}

impl crate::core::error_handling::ContextualError for ReceiveError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}

/// What the transport hands to the completion path
pub type ReceiveOutcome = Result<ReceiveMessageResult, ReceiveError>;
