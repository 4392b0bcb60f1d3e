//! Per-partition process queue
//!
//! A [`ProcessQueue`] exists for every partition currently assigned to a
//! consumer. It keeps approximate accounting of the messages cached locally,
//! decides whether more should be popped, notices when nobody services it
//! any more, and issues pop-lease requests through the transport.
//!
//! Three kinds of threads touch a queue at once: the consumer's receive
//! loop, transport completion threads, and application threads releasing
//! consumed messages. The cache counters are relaxed atomics because they
//! only feed throttling heuristics. The owning consumer and the completion
//! sink are held as `Weak` references and resolved on every use, so a queue
//! whose partition was revoked degrades to a no-op instead of failing.

use crate::config::{DEFAULT_INVISIBLE_DURATION, PROCESS_QUEUE_EXPIRATION_THRESHOLD};
use crate::consumer::completion::ReceiveCompletion;
use crate::consumer::context::ConsumerContext;
use crate::consumer::error::ConsumerError;
use crate::core::error_handling::log_warning_with_context;
use crate::core::sync::{handle_mutex_poison, handle_rwlock_read, handle_rwlock_write};
use crate::core::time::{SystemTimeProvider, TimeProvider};
use crate::core::unique_id::next_attempt_id;
use crate::protocol::signature;
use crate::protocol::{FilterExpression, Message, MessageQueue, ReceiveMessageRequest, Resource};
use crate::transport::{ClientTransport, ReceiveCallback};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::{Duration, Instant};

fn sync_error(message: String) -> ConsumerError {
    ConsumerError::Synchronisation { message }
}

/// Local cache accounting and pop-lease orchestration for one partition
///
/// # Example
///
/// ```rust,no_run
/// # use popqueue::consumer::{ConsumerContext, ProcessQueue};
/// # use popqueue::protocol::{FilterExpression, MessageQueue};
/// # use popqueue::transport::ClientTransport;
/// # use std::sync::{Arc, Weak};
/// # fn example(owner: Weak<dyn ConsumerContext>, transport: Arc<dyn ClientTransport>) {
/// let queue = MessageQueue::new("orders", "broker-a", 0, "10.0.0.1:8081");
/// let process_queue = Arc::new(ProcessQueue::new(
///     queue,
///     FilterExpression::match_all(),
///     owner,
///     transport,
/// ));
///
/// if !process_queue.should_throttle() {
///     process_queue.receive(None);
/// }
/// # }
/// ```
pub struct ProcessQueue {
    message_queue: MessageQueue,
    simple_name: String,
    /// Last filter sent to the broker
    filter_expression: RwLock<FilterExpression>,
    invisible_duration: Duration,
    consumer: Weak<dyn ConsumerContext>,
    transport: Arc<dyn ClientTransport>,
    completion_sink: RwLock<Option<Weak<dyn ReceiveCompletion>>>,
    cached_message_quantity: AtomicU64,
    cached_message_memory: AtomicU64,
    idle_since: Mutex<Instant>,
    clock: Arc<dyn TimeProvider>,
}

impl ProcessQueue {
    pub fn new(
        message_queue: MessageQueue,
        filter_expression: FilterExpression,
        consumer: Weak<dyn ConsumerContext>,
        transport: Arc<dyn ClientTransport>,
    ) -> Self {
        let clock: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
        let simple_name = message_queue.to_string();
        log::debug!("Created ProcessQueue={}", simple_name);
        Self {
            simple_name,
            message_queue,
            filter_expression: RwLock::new(filter_expression),
            invisible_duration: DEFAULT_INVISIBLE_DURATION,
            consumer,
            transport,
            completion_sink: RwLock::new(None),
            cached_message_quantity: AtomicU64::new(0),
            cached_message_memory: AtomicU64::new(0),
            idle_since: Mutex::new(clock.now()),
            clock,
        }
    }

    /// Lease duration requested for popped messages
    pub fn with_invisible_duration(mut self, invisible_duration: Duration) -> Self {
        self.invisible_duration = invisible_duration;
        self
    }

    /// Replace the clock used for idle tracking; the idle marker restarts
    pub fn with_time_provider(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.idle_since = Mutex::new(clock.now());
        self.clock = clock;
        self
    }

    pub fn message_queue(&self) -> &MessageQueue {
        &self.message_queue
    }

    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    pub fn invisible_duration(&self) -> Duration {
        self.invisible_duration
    }

    /// Non-owning handle to the owning consumer
    pub fn consumer(&self) -> Weak<dyn ConsumerContext> {
        self.consumer.clone()
    }

    pub fn transport(&self) -> &Arc<dyn ClientTransport> {
        &self.transport
    }

    /// Filter used by the most recent pop request
    pub fn filter_expression(&self) -> FilterExpression {
        match handle_rwlock_read(self.filter_expression.read(), sync_error) {
            Ok(filter) => filter.clone(),
            Err(e) => {
                log_warning_with_context(&e, &self.simple_name);
                FilterExpression::match_all()
            }
        }
    }

    /// Register the target of future receive completions
    ///
    /// Only a weak reference is kept; whoever owns the sink decides how long
    /// completions are delivered.
    pub fn set_completion_sink(&self, sink: &Arc<dyn ReceiveCompletion>) {
        match handle_rwlock_write(self.completion_sink.write(), sync_error) {
            Ok(mut slot) => *slot = Some(Arc::downgrade(sink)),
            Err(e) => log_warning_with_context(
                &e,
                &format!("{}: cannot register completion sink", self.simple_name),
            ),
        }
    }

    pub fn cached_message_quantity(&self) -> u64 {
        self.cached_message_quantity.load(Ordering::Relaxed)
    }

    pub fn cached_message_memory(&self) -> u64 {
        self.cached_message_memory.load(Ordering::Relaxed)
    }

    /// Count freshly popped messages into the local cache
    pub fn account_admission(&self, messages: &[Arc<Message>]) {
        if self.consumer.upgrade().is_none() {
            return;
        }

        for message in messages {
            self.cached_message_quantity.fetch_add(1, Ordering::Relaxed);
            self.cached_message_memory
                .fetch_add(message.body_len(), Ordering::Relaxed);
        }

        log::debug!(
            "Cache of process-queue={} has {} messages, body of them taking up {} bytes",
            self.simple_name,
            self.cached_message_quantity(),
            self.cached_message_memory()
        );
    }

    /// Take one message of `body_size` bytes out of the local cache
    ///
    /// Counters saturate at zero.
    pub fn account_release(&self, body_size: u64) {
        if self.consumer.upgrade().is_none() {
            return;
        }

        saturating_sub(&self.cached_message_quantity, 1);
        saturating_sub(&self.cached_message_memory, body_size);
    }

    /// Whether the local cache is too full to pop more messages
    pub fn should_throttle(&self) -> bool {
        let Some(consumer) = self.consumer.upgrade() else {
            return false;
        };

        let quantity = self.cached_message_quantity();
        let quantity_threshold = consumer.max_cached_message_quantity();
        if quantity >= quantity_threshold {
            log::info!(
                "{}: Number of locally cached messages is {}, which exceeds threshold={}",
                self.simple_name,
                quantity,
                quantity_threshold
            );
            return true;
        }

        let memory_threshold = consumer.max_cached_message_memory();
        if memory_threshold > 0 {
            let bytes = self.cached_message_memory();
            if bytes >= memory_threshold {
                log::info!(
                    "{}: Locally cached messages take {} bytes, which exceeds threshold={}",
                    self.simple_name,
                    bytes,
                    memory_threshold
                );
                return true;
            }
        }
        false
    }

    /// Whether no pop request was issued for longer than the expiration threshold
    pub fn is_expired(&self) -> bool {
        let idle = match handle_mutex_poison(self.idle_since.lock(), sync_error) {
            Ok(idle_since) => self.clock.now().saturating_duration_since(*idle_since),
            Err(e) => {
                log_warning_with_context(&e, &self.simple_name);
                return false;
            }
        };

        if idle > PROCESS_QUEUE_EXPIRATION_THRESHOLD {
            log::warn!(
                "ProcessQueue={} is expired. It remains idle for {}ms",
                self.simple_name,
                idle.as_millis()
            );
            return true;
        }
        false
    }

    /// Mark the queue as serviced now; never moves the marker backwards
    pub fn refresh_idle_marker(&self) {
        let now = self.clock.now();
        match handle_mutex_poison(self.idle_since.lock(), sync_error) {
            Ok(mut idle_since) => {
                if now > *idle_since {
                    *idle_since = now;
                }
            }
            Err(e) => log_warning_with_context(&e, &self.simple_name),
        }
    }

    /// Look up the current filter for this partition's topic
    ///
    /// Falls back to the match-all tag filter when the topic has no
    /// registered filter. Returns `None` and changes nothing once the owner
    /// is gone.
    pub fn resolve_filter(&self) -> Option<FilterExpression> {
        let consumer = self.consumer.upgrade()?;
        Some(self.resolve_filter_with(consumer.as_ref()))
    }

    fn resolve_filter_with(&self, consumer: &dyn ConsumerContext) -> FilterExpression {
        let resolved = consumer
            .filter_expression(&self.message_queue.topic)
            .unwrap_or_else(FilterExpression::match_all);
        if let Ok(mut current) = handle_rwlock_write(self.filter_expression.write(), sync_error) {
            *current = resolved.clone();
        }
        resolved
    }

    /// Build the pop-lease request for this partition
    ///
    /// A supplied non-empty `attempt_id` is reused verbatim so that retries
    /// of one logical pop stay idempotent. Otherwise a fresh one is
    /// generated; if that fails the attempt id is left empty.
    pub fn build_receive_request(
        &self,
        consumer: &dyn ConsumerContext,
        attempt_id: Option<String>,
    ) -> ReceiveMessageRequest {
        let config = consumer.config();
        let attempt_id = attempt_id
            .filter(|id| !id.is_empty())
            .or_else(next_attempt_id)
            .unwrap_or_default();

        ReceiveMessageRequest {
            group: Resource::new(config.namespace.clone(), config.group.clone()),
            message_queue: self.message_queue.clone(),
            filter_expression: self.resolve_filter_with(consumer),
            batch_size: consumer.receive_batch_size(),
            auto_renew: true,
            invisible_duration: self.invisible_duration.into(),
            attempt_id,
        }
    }

    /// Issue one pop-lease request and return without waiting
    ///
    /// Does nothing once the owning consumer is gone. The outcome is
    /// delivered to the completion sink registered at dispatch time, if it
    /// still exists when the transport completes.
    pub fn receive(&self, attempt_id: Option<String>) {
        let Some(consumer) = self.consumer.upgrade() else {
            return;
        };

        let metadata = signature::sign(consumer.config(), consumer.client_id());
        let request = self.build_receive_request(consumer.as_ref(), attempt_id);
        self.refresh_idle_marker();
        log::debug!(
            "Receive message from={}, attemptId={}",
            self.simple_name,
            request.attempt_id
        );

        let sink = match handle_rwlock_read(self.completion_sink.read(), sync_error) {
            Ok(slot) => slot.clone(),
            Err(e) => {
                log_warning_with_context(&e, &self.simple_name);
                None
            }
        };
        let attempt_id = request.attempt_id.clone();
        let simple_name = self.simple_name.clone();
        let callback: ReceiveCallback = Box::new(move |outcome| {
            match sink.as_ref().and_then(Weak::upgrade) {
                Some(sink) => sink.on_completion(&attempt_id, outcome),
                None => log::info!(
                    "Completion sink of {} is gone, dropping receive result of attemptId={}",
                    simple_name,
                    attempt_id
                ),
            }
        });

        let timeout = consumer.config().receive_timeout();
        self.transport.receive_message(
            &self.message_queue.endpoint,
            metadata,
            request,
            timeout,
            callback,
        );
    }
}

impl Drop for ProcessQueue {
    fn drop(&mut self) {
        log::info!(
            "ProcessQueue={} should have been re-balanced away, thus, is dropped",
            self.simple_name
        );
    }
}

fn saturating_sub(counter: &AtomicU64, amount: u64) {
    counter
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
            Some(current.saturating_sub(amount))
        })
        .ok();
}
