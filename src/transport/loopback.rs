//! In-process transport emulating a long-polling broker
//!
//! Requests are answered from outcomes scripted per partition. A request
//! that finds no scripted outcome is parked, like a broker holding a long
//! poll, until [`LoopbackTransport::complete`] or
//! [`LoopbackTransport::expire_pending`] resolves it. Callbacks always run
//! on the tokio runtime, never on the caller's stack.

use crate::core::sync::recover_lock_poison;
use crate::protocol::{Metadata, MessageQueue, ReceiveError, ReceiveMessageRequest, ReceiveOutcome};
use crate::transport::{ClientTransport, ReceiveCallback};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;

/// Most recent requests kept for inspection; older ones are forgotten
pub const MAX_RECORDED_REQUESTS: usize = 1024;

/// A request as seen by the transport
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub endpoint: String,
    pub metadata: Metadata,
    pub request: ReceiveMessageRequest,
    pub timeout: Duration,
}

struct ParkedRequest {
    callback: ReceiveCallback,
    timeout: Duration,
}

#[derive(Default)]
struct LoopbackState {
    scripted: HashMap<MessageQueue, VecDeque<ReceiveOutcome>>,
    parked: HashMap<MessageQueue, VecDeque<ParkedRequest>>,
    requests: VecDeque<RecordedRequest>,
    request_count: usize,
}

pub struct LoopbackTransport {
    runtime: Handle,
    state: Mutex<LoopbackState>,
}

impl LoopbackTransport {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            state: Mutex::new(LoopbackState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, LoopbackState> {
        recover_lock_poison(self.state.lock(), "loopback transport state")
    }

    fn deliver(&self, callback: ReceiveCallback, outcome: ReceiveOutcome) {
        self.runtime.spawn(async move { callback(outcome) });
    }

    /// Script an outcome for the next request on `queue`
    pub fn enqueue(&self, queue: &MessageQueue, outcome: ReceiveOutcome) {
        self.state()
            .scripted
            .entry(queue.clone())
            .or_default()
            .push_back(outcome);
    }

    /// Resolve the oldest parked request on `queue`, or script the outcome
    ///
    /// Returns true if a parked request was resolved.
    pub fn complete(&self, queue: &MessageQueue, outcome: ReceiveOutcome) -> bool {
        let parked = self
            .state()
            .parked
            .get_mut(queue)
            .and_then(|pending| pending.pop_front());
        match parked {
            Some(request) => {
                self.deliver(request.callback, outcome);
                true
            }
            None => {
                self.enqueue(queue, outcome);
                false
            }
        }
    }

    /// Time out every parked request; returns how many were resolved
    pub fn expire_pending(&self) -> usize {
        let parked: Vec<ParkedRequest> = self
            .state()
            .parked
            .drain()
            .flat_map(|(_, pending)| pending)
            .collect();
        let count = parked.len();
        for request in parked {
            let outcome = Err(ReceiveError::Timeout {
                after: request.timeout,
            });
            self.deliver(request.callback, outcome);
        }
        count
    }

    /// Recorded requests, oldest first
    ///
    /// Only the last [`MAX_RECORDED_REQUESTS`] are kept.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.iter().cloned().collect()
    }

    /// Remove and return the recorded requests, oldest first
    pub fn take_requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.drain(..).collect()
    }

    /// Requests received since creation, including forgotten ones
    pub fn request_count(&self) -> usize {
        self.state().request_count
    }

    /// Number of requests waiting for an outcome
    pub fn parked_count(&self) -> usize {
        self.state().parked.values().map(VecDeque::len).sum()
    }
}

impl ClientTransport for LoopbackTransport {
    fn receive_message(
        &self,
        endpoint: &str,
        metadata: Metadata,
        request: ReceiveMessageRequest,
        timeout: Duration,
        callback: ReceiveCallback,
    ) {
        let queue = request.message_queue.clone();
        let mut state = self.state();
        if state.requests.len() == MAX_RECORDED_REQUESTS {
            state.requests.pop_front();
        }
        state.requests.push_back(RecordedRequest {
            endpoint: endpoint.to_string(),
            metadata,
            request,
            timeout,
        });
        state.request_count += 1;

        let scripted = state
            .scripted
            .get_mut(&queue)
            .and_then(|outcomes| outcomes.pop_front());
        match scripted {
            Some(outcome) => {
                drop(state);
                self.deliver(callback, outcome);
            }
            None => {
                log::trace!("Parking receive request for {}", queue);
                state
                    .parked
                    .entry(queue)
                    .or_default()
                    .push_back(ParkedRequest { callback, timeout });
            }
        }
    }
}
