//! Client transport seam
//!
//! The process queue never talks to the network itself. It hands a fully
//! built request to a [`ClientTransport`] together with a completion
//! callback and returns immediately; the transport enforces the timeout and
//! invokes the callback exactly once, from its own thread or task.

mod loopback;

use crate::protocol::{Metadata, ReceiveMessageRequest, ReceiveOutcome};
use std::time::Duration;

pub use loopback::{LoopbackTransport, RecordedRequest, MAX_RECORDED_REQUESTS};

/// Completion callback for one pop-lease request
pub type ReceiveCallback = Box<dyn FnOnce(ReceiveOutcome) + Send + 'static>;

/// Sends pop-lease requests to the broker owning a partition
pub trait ClientTransport: Send + Sync {
    /// Dispatch `request` to `endpoint` without blocking
    ///
    /// On timeout the callback receives `ReceiveError::Timeout`.
    fn receive_message(
        &self,
        endpoint: &str,
        metadata: Metadata,
        request: ReceiveMessageRequest,
        timeout: Duration,
        callback: ReceiveCallback,
    );
}
