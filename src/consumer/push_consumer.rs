//! PushConsumer - owner of the process queues of one consumer group
//!
//! The push consumer keeps one [`ProcessQueue`] per assigned partition,
//! together with the completion handler that keeps its receive loop going.
//! Both are owned here only: revoking a partition drops them, and whatever
//! completions or delayed retries are still in flight find nothing to
//! upgrade and stop.

use crate::config::{ConfigError, ConsumerConfig};
use crate::consumer::completion::{AsyncReceiveHandler, ReceiveCompletion};
use crate::consumer::context::ConsumerContext;
use crate::consumer::dispatch::MessageDispatcher;
use crate::consumer::error::{ConsumerError, ConsumerResult};
use crate::consumer::process_queue::ProcessQueue;
use crate::consumer::subscription::SubscriptionTable;
use crate::core::error_handling::log_error_with_context;
use crate::core::sync::{handle_rwlock_read, handle_rwlock_write};
use crate::core::time::{SystemTimeProvider, TimeProvider};
use crate::core::unique_id::host_name;
use crate::core::validation::validate_non_zero_duration;
use crate::protocol::{FilterExpression, Message, MessageQueue};
use crate::transport::ClientTransport;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

static CLIENT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn sync_error(message: String) -> ConsumerError {
    ConsumerError::Synchronisation { message }
}

struct Assignment {
    process_queue: Arc<ProcessQueue>,
    // Process queues only hold this weakly
    completion: Arc<dyn ReceiveCompletion>,
}

/// Consumer that pops messages from assigned partitions and pushes them to
/// a [`MessageDispatcher`]
///
/// # Example
///
/// ```rust,no_run
/// use popqueue::config::ConsumerConfig;
/// use popqueue::consumer::{ChannelDispatcher, PushConsumer};
/// use popqueue::protocol::{FilterExpression, MessageQueue};
/// use popqueue::transport::LoopbackTransport;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let runtime = tokio::runtime::Handle::current();
/// let transport = Arc::new(LoopbackTransport::new(runtime.clone()));
/// let (dispatcher, mut deliveries) = ChannelDispatcher::new();
///
/// let consumer = PushConsumer::new(
///     ConsumerConfig::new("GID_orders"),
///     transport,
///     Arc::new(dispatcher),
///     runtime,
/// )?;
/// consumer.subscribe("orders", FilterExpression::tag("paid"))?;
/// consumer.assign(MessageQueue::new("orders", "broker-a", 0, "10.0.0.1:8081"))?;
///
/// while let Some(delivery) = deliveries.recv().await {
///     println!("{}", delivery.message.message_id);
///     delivery.release();
/// }
/// # Ok(())
/// # }
/// ```
pub struct PushConsumer {
    config: ConsumerConfig,
    client_id: String,
    transport: Arc<dyn ClientTransport>,
    dispatcher: Arc<dyn MessageDispatcher>,
    runtime: Handle,
    clock: Arc<dyn TimeProvider>,
    subscriptions: SubscriptionTable,
    assignments: RwLock<HashMap<MessageQueue, Assignment>>,
    shut_down: AtomicBool,
    self_ref: Weak<PushConsumer>,
}

impl PushConsumer {
    pub fn new(
        config: ConsumerConfig,
        transport: Arc<dyn ClientTransport>,
        dispatcher: Arc<dyn MessageDispatcher>,
        runtime: Handle,
    ) -> ConsumerResult<Arc<Self>> {
        Self::with_time_provider(config, transport, dispatcher, runtime, Arc::new(SystemTimeProvider))
    }

    /// Like [`PushConsumer::new`], with the clock process queues measure
    /// idleness against
    pub fn with_time_provider(
        config: ConsumerConfig,
        transport: Arc<dyn ClientTransport>,
        dispatcher: Arc<dyn MessageDispatcher>,
        runtime: Handle,
        clock: Arc<dyn TimeProvider>,
    ) -> ConsumerResult<Arc<Self>> {
        config.validate()?;
        let client_id = format!(
            "{}@{}#{}",
            host_name(),
            std::process::id(),
            CLIENT_SEQUENCE.fetch_add(1, Ordering::Relaxed)
        );
        log::info!("Created push consumer {} for group={}", client_id, config.group);

        Ok(Arc::new_cyclic(|self_ref| Self {
            config,
            client_id,
            transport,
            dispatcher,
            runtime,
            clock,
            subscriptions: SubscriptionTable::new(),
            assignments: RwLock::new(HashMap::new()),
            shut_down: AtomicBool::new(false),
            self_ref: self_ref.clone(),
        }))
    }

    pub fn subscribe(
        &self,
        topic: &str,
        expression: FilterExpression,
    ) -> ConsumerResult<Option<FilterExpression>> {
        self.subscriptions.subscribe(topic, expression)
    }

    pub fn unsubscribe(&self, topic: &str) -> ConsumerResult<Option<FilterExpression>> {
        self.subscriptions.unsubscribe(topic)
    }

    pub fn subscriptions(&self) -> &SubscriptionTable {
        &self.subscriptions
    }

    /// Start consuming `queue`
    ///
    /// Returns false if the partition was already assigned.
    pub fn assign(&self, queue: MessageQueue) -> ConsumerResult<bool> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(ConsumerError::ShutDown);
        }

        let process_queue = {
            let mut assignments = handle_rwlock_write(self.assignments.write(), sync_error)?;
            if assignments.contains_key(&queue) {
                return Ok(false);
            }

            let owner: Weak<dyn ConsumerContext> = self.self_ref.clone();
            let filter = self
                .subscriptions
                .get(&queue.topic)
                .unwrap_or_else(FilterExpression::match_all);
            let process_queue = Arc::new(
                ProcessQueue::new(queue.clone(), filter, owner, Arc::clone(&self.transport))
                    .with_invisible_duration(self.config.invisible_duration)
                    .with_time_provider(Arc::clone(&self.clock)),
            );
            let completion: Arc<dyn ReceiveCompletion> = AsyncReceiveHandler::new(&process_queue);
            process_queue.set_completion_sink(&completion);

            assignments.insert(
                queue,
                Assignment {
                    process_queue: Arc::clone(&process_queue),
                    completion,
                },
            );
            process_queue
        };

        log::info!("Assigned {} to {}", process_queue.simple_name(), self.client_id);
        process_queue.receive(None);
        Ok(true)
    }

    /// Stop consuming `queue`; returns false if it was not assigned
    pub fn revoke(&self, queue: &MessageQueue) -> ConsumerResult<bool> {
        let removed = handle_rwlock_write(self.assignments.write(), sync_error)?.remove(queue);
        match removed {
            Some(assignment) => {
                log::info!(
                    "Revoked {} from {}",
                    assignment.process_queue.simple_name(),
                    self.client_id
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Currently assigned partitions, ordered
    pub fn assigned_queues(&self) -> Vec<MessageQueue> {
        let mut queues: Vec<MessageQueue> = match handle_rwlock_read(self.assignments.read(), sync_error) {
            Ok(assignments) => assignments.keys().cloned().collect(),
            Err(e) => {
                log_error_with_context(&e, "Listing assigned queues");
                Vec::new()
            }
        };
        queues.sort();
        queues
    }

    pub fn process_queue(&self, queue: &MessageQueue) -> Option<Arc<ProcessQueue>> {
        handle_rwlock_read(self.assignments.read(), sync_error)
            .ok()?
            .get(queue)
            .map(|assignment| Arc::clone(&assignment.process_queue))
    }

    /// Drop every process queue that has been idle past the expiration
    /// threshold, returning their partitions
    pub fn scan_expired(&self) -> ConsumerResult<Vec<MessageQueue>> {
        let removed: Vec<Assignment> = {
            let mut assignments = handle_rwlock_write(self.assignments.write(), sync_error)?;
            let expired: Vec<MessageQueue> = assignments
                .iter()
                .filter(|(_, assignment)| assignment.process_queue.is_expired())
                .map(|(queue, _)| queue.clone())
                .collect();
            expired
                .iter()
                .filter_map(|queue| assignments.remove(queue))
                .collect()
        };

        let mut queues: Vec<MessageQueue> = removed
            .iter()
            .map(|assignment| assignment.process_queue.message_queue().clone())
            .collect();
        queues.sort();
        Ok(queues)
    }

    /// Run [`PushConsumer::scan_expired`] every `period` until the consumer
    /// is dropped or shut down
    ///
    /// Fails for a zero `period`.
    pub fn spawn_expiration_sweep(&self, period: Duration) -> ConsumerResult<JoinHandle<()>> {
        validate_non_zero_duration("expiration_sweep_period", period).map_err(|message| {
            ConfigError::Invalid {
                field: "expiration_sweep_period".to_string(),
                message,
            }
        })?;
        if self.shut_down.load(Ordering::Acquire) {
            return Err(ConsumerError::ShutDown);
        }

        let consumer = self.self_ref.clone();
        Ok(self.runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(consumer) = consumer.upgrade() else {
                    break;
                };
                if consumer.shut_down.load(Ordering::Acquire) {
                    break;
                }
                match consumer.scan_expired() {
                    Ok(expired) if !expired.is_empty() => {
                        log::warn!("Dropped {} expired process queues", expired.len());
                    }
                    Ok(_) => {}
                    Err(e) => log_error_with_context(&e, "Expiration sweep"),
                }
            }
        }))
    }

    /// Re-issue a receive on `queue` if it is still assigned
    pub fn receive_message(&self, queue: &MessageQueue, attempt_id: Option<String>) {
        match self.process_queue(queue) {
            Some(process_queue) => process_queue.receive(attempt_id),
            None => log::debug!("{} is no longer assigned, skip receiving", queue),
        }
    }

    /// Revoke every partition and refuse new assignments
    pub fn shutdown(&self) -> ConsumerResult<usize> {
        self.shut_down.store(true, Ordering::Release);
        let drained: Vec<Assignment> = handle_rwlock_write(self.assignments.write(), sync_error)?
            .drain()
            .map(|(_, assignment)| assignment)
            .collect();
        log::info!(
            "Push consumer {} shut down, released {} process queues",
            self.client_id,
            drained.len()
        );
        Ok(drained.len())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

impl ConsumerContext for PushConsumer {
    fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn filter_expression(&self, topic: &str) -> Option<FilterExpression> {
        self.subscriptions.get(topic)
    }

    fn scheduler(&self) -> Handle {
        self.runtime.clone()
    }

    fn dispatch(&self, process_queue: &Arc<ProcessQueue>, messages: &[Arc<Message>]) {
        self.dispatcher.dispatch(process_queue, messages);
    }

    fn receive_message(&self, queue: &MessageQueue, attempt_id: Option<String>) {
        PushConsumer::receive_message(self, queue, attempt_id);
    }
}
