//! Completion path of asynchronous pop requests

use crate::consumer::context::ConsumerContext;
use crate::consumer::process_queue::ProcessQueue;
use crate::core::error_handling::log_warning_with_context;
use crate::protocol::{ReceiveError, ReceiveOutcome};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Receives the outcome of every pop request issued by a process queue
pub trait ReceiveCompletion: Send + Sync {
    fn on_completion(&self, attempt_id: &str, outcome: ReceiveOutcome);
}

/// Default completion sink
///
/// Feeds popped messages into the cache and keeps the receive loop of its
/// process queue going: throttled or failed pops are retried with the same
/// attempt id, everything else moves on to a fresh one. Only weak references
/// are held, so scheduled work for a revoked queue does nothing.
pub struct AsyncReceiveHandler {
    process_queue: Weak<ProcessQueue>,
    self_ref: Weak<AsyncReceiveHandler>,
}

impl AsyncReceiveHandler {
    pub fn new(process_queue: &Arc<ProcessQueue>) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            process_queue: Arc::downgrade(process_queue),
            self_ref: self_ref.clone(),
        })
    }

    fn handle(
        &self,
        process_queue: &Arc<ProcessQueue>,
        consumer: &Arc<dyn ConsumerContext>,
        attempt_id: &str,
        outcome: ReceiveOutcome,
    ) {
        let config = consumer.config();
        match outcome {
            Ok(result) => {
                log::debug!(
                    "Received {} messages from {} for {}",
                    result.messages.len(),
                    result.source_host,
                    process_queue.simple_name()
                );
                if !result.messages.is_empty() {
                    process_queue.account_admission(&result.messages);
                    consumer.dispatch(process_queue, &result.messages);
                }
                self.check_throttle_then_receive(process_queue, consumer, None);
            }
            Err(ReceiveError::NoContent) => {
                log::debug!(
                    "No new messages in {}, attemptId={}",
                    process_queue.simple_name(),
                    attempt_id
                );
                self.check_throttle_then_receive(process_queue, consumer, None);
            }
            Err(ReceiveError::TooManyRequests) => {
                log::warn!(
                    "Broker throttled receive on {}, retry in {}ms with attemptId={}",
                    process_queue.simple_name(),
                    config.throttled_retry_delay.as_millis(),
                    attempt_id
                );
                self.receive_later(
                    consumer,
                    config.throttled_retry_delay,
                    Some(attempt_id.to_string()),
                );
            }
            Err(e) => {
                log_warning_with_context(
                    &e,
                    &format!(
                        "Failed to receive from {}, retry in {}ms with attemptId={}",
                        process_queue.simple_name(),
                        config.failure_retry_delay.as_millis(),
                        attempt_id
                    ),
                );
                self.receive_later(
                    consumer,
                    config.failure_retry_delay,
                    Some(attempt_id.to_string()),
                );
            }
        }
    }

    fn check_throttle_then_receive(
        &self,
        process_queue: &Arc<ProcessQueue>,
        consumer: &Arc<dyn ConsumerContext>,
        attempt_id: Option<String>,
    ) {
        if process_queue.should_throttle() {
            log::debug!(
                "Cache of {} is full, receive messages later",
                process_queue.simple_name()
            );
            process_queue.refresh_idle_marker();
            self.receive_later(consumer, consumer.config().cache_full_retry_delay, attempt_id);
            return;
        }
        consumer.receive_message(process_queue.message_queue(), attempt_id);
    }

    /// Wait `delay`, then check the throttle again and receive
    fn receive_later(
        &self,
        consumer: &Arc<dyn ConsumerContext>,
        delay: Duration,
        attempt_id: Option<String>,
    ) {
        let handler = self.self_ref.clone();
        consumer.scheduler().spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(handler) = handler.upgrade() else {
                return;
            };
            let Some(process_queue) = handler.process_queue.upgrade() else {
                return;
            };
            let Some(consumer) = process_queue.consumer().upgrade() else {
                return;
            };
            handler.check_throttle_then_receive(&process_queue, &consumer, attempt_id);
        });
    }
}

impl ReceiveCompletion for AsyncReceiveHandler {
    fn on_completion(&self, attempt_id: &str, outcome: ReceiveOutcome) {
        let Some(process_queue) = self.process_queue.upgrade() else {
            log::info!(
                "Process queue is gone, dropping receive result of attemptId={}",
                attempt_id
            );
            return;
        };
        let Some(consumer) = process_queue.consumer().upgrade() else {
            return;
        };
        self.handle(&process_queue, &consumer, attempt_id, outcome);
    }
}
