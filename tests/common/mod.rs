//! Common test utilities and helpers
//!
//! Shared fixtures for the integration tests: a push consumer wired to the
//! loopback transport and a polling helper for asynchronous assertions.

use popqueue::config::ConsumerConfig;
use popqueue::consumer::api::{ChannelDispatcher, Delivery, PushConsumer};
use popqueue::protocol::{Message, MessageQueue, ReceiveMessageResult};
use popqueue::transport::LoopbackTransport;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

pub struct Harness {
    pub consumer: Arc<PushConsumer>,
    pub transport: Arc<LoopbackTransport>,
    pub deliveries: UnboundedReceiver<Delivery>,
}

pub fn fast_config(group: &str) -> ConsumerConfig {
    let mut config = ConsumerConfig::new(group);
    config.throttled_retry_delay = Duration::from_millis(20);
    config.failure_retry_delay = Duration::from_millis(20);
    config.cache_full_retry_delay = Duration::from_millis(20);
    config
}

pub fn start_consumer(config: ConsumerConfig) -> Harness {
    let runtime = Handle::current();
    let transport = Arc::new(LoopbackTransport::new(runtime.clone()));
    let (dispatcher, deliveries) = ChannelDispatcher::new();
    let consumer = PushConsumer::new(config, transport.clone(), Arc::new(dispatcher), runtime)
        .expect("valid consumer configuration");
    Harness {
        consumer,
        transport,
        deliveries,
    }
}

pub fn partition(queue_id: i32) -> MessageQueue {
    MessageQueue::new("OrderTopic", "broker-a", queue_id, "10.0.0.1:8081")
}

pub fn batch(queue: &MessageQueue, count: usize, body_len: usize) -> ReceiveMessageResult {
    let messages = (0..count)
        .map(|i| {
            Arc::new(
                Message::new(queue.topic.clone(), vec![0u8; body_len])
                    .with_message_id(format!("{}-{}", queue.queue_id, i)),
            )
        })
        .collect();
    ReceiveMessageResult::new("10.0.0.1", messages)
}

/// Poll `condition` until it holds or five seconds pass
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
