//! Test modules for the consumer
//!
//! Tests are organized by functional area. Shared fixtures live here: a
//! scripted owner, a transport that keeps callbacks for the test to fire,
//! and a polling helper for asynchronous assertions.


use crate::config::ConsumerConfig;
use crate::consumer::api::{ConsumerContext, ProcessQueue};
use crate::protocol::{FilterExpression, Message, MessageQueue, Metadata, ReceiveMessageRequest};
use crate::transport::{ClientTransport, ReceiveCallback};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::runtime::Handle;

pub(crate) fn test_queue() -> MessageQueue {
    MessageQueue::new("TestTopic", "broker-a", 0, "10.0.0.1:8081")
}

pub(crate) fn message_of(body_len: usize) -> Arc<Message> {
    Arc::new(Message::new("TestTopic", vec![b'x'; body_len]))
}

/// Owner that records what process queues ask of it
pub(crate) struct TestConsumer {
    config: ConsumerConfig,
    filters: Mutex<HashMap<String, FilterExpression>>,
    runtime: Handle,
    dispatched: Mutex<Vec<Arc<Message>>>,
    receives: Mutex<Vec<(MessageQueue, Option<String>)>>,
}

impl TestConsumer {
    pub(crate) fn new(config: ConsumerConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            filters: Mutex::new(HashMap::new()),
            runtime: Handle::current(),
            dispatched: Mutex::new(Vec::new()),
            receives: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn with_defaults() -> Arc<Self> {
        Self::new(ConsumerConfig::new("GID_test"))
    }

    pub(crate) fn set_filter(&self, topic: &str, expression: FilterExpression) {
        self.filters
            .lock()
            .unwrap()
            .insert(topic.to_string(), expression);
    }

    pub(crate) fn dispatched(&self) -> Vec<Arc<Message>> {
        self.dispatched.lock().unwrap().clone()
    }

    pub(crate) fn receives(&self) -> Vec<(MessageQueue, Option<String>)> {
        self.receives.lock().unwrap().clone()
    }

    pub(crate) fn owner(self: &Arc<Self>) -> Weak<dyn ConsumerContext> {
        let weak: Weak<TestConsumer> = Arc::downgrade(self);
        weak
    }
}

impl ConsumerContext for TestConsumer {
    fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    fn client_id(&self) -> &str {
        "test-host@1#0"
    }

    fn filter_expression(&self, topic: &str) -> Option<FilterExpression> {
        self.filters.lock().unwrap().get(topic).cloned()
    }

    fn scheduler(&self) -> Handle {
        self.runtime.clone()
    }

    fn dispatch(&self, _process_queue: &Arc<ProcessQueue>, messages: &[Arc<Message>]) {
        self.dispatched.lock().unwrap().extend(messages.iter().cloned());
    }

    fn receive_message(&self, queue: &MessageQueue, attempt_id: Option<String>) {
        self.receives
            .lock()
            .unwrap()
            .push((queue.clone(), attempt_id));
    }
}

pub(crate) struct RecordedCall {
    pub endpoint: String,
    pub metadata: Metadata,
    pub request: ReceiveMessageRequest,
    pub timeout: Duration,
    callback: Option<ReceiveCallback>,
}

/// Transport that never completes on its own
#[derive(Default)]
pub(crate) struct RecordingTransport {
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<ReceiveMessageRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|call| call.request.clone())
            .collect()
    }

    pub(crate) fn inspect<R>(&self, index: usize, f: impl FnOnce(&RecordedCall) -> R) -> R {
        f(&self.calls.lock().unwrap()[index])
    }

    pub(crate) fn take_callback(&self, index: usize) -> ReceiveCallback {
        self.calls.lock().unwrap()[index]
            .callback
            .take()
            .expect("callback already taken")
    }
}

impl ClientTransport for RecordingTransport {
    fn receive_message(
        &self,
        endpoint: &str,
        metadata: Metadata,
        request: ReceiveMessageRequest,
        timeout: Duration,
        callback: ReceiveCallback,
    ) {
        self.calls.lock().unwrap().push(RecordedCall {
            endpoint: endpoint.to_string(),
            metadata,
            request,
            timeout,
            callback: Some(callback),
        });
    }
}

pub(crate) fn process_queue_for(
    consumer: &Arc<TestConsumer>,
    transport: &Arc<RecordingTransport>,
) -> Arc<ProcessQueue> {
    let transport: Arc<dyn ClientTransport> = transport.clone();
    Arc::new(ProcessQueue::new(
        test_queue(),
        FilterExpression::match_all(),
        consumer.owner(),
        transport,
    ))
}

/// Poll `condition` until it holds or two seconds pass
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
