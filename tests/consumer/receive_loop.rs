//! Receive loop tests against the loopback transport

use crate::common::{batch, fast_config, partition, start_consumer, wait_until};
use popqueue::protocol::ReceiveError;
use std::collections::HashSet;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_messages_from_every_partition_are_delivered() {
    let mut harness = start_consumer(fast_config("GID_orders"));
    for queue_id in 0..3 {
        harness.consumer.assign(partition(queue_id)).unwrap();
    }

    for queue_id in 0..3 {
        assert!(harness
            .transport
            .complete(&partition(queue_id), Ok(batch(&partition(queue_id), 4, 16))));
    }

    let mut seen = HashSet::new();
    for _ in 0..12 {
        let delivery = harness.deliveries.recv().await.unwrap();
        seen.insert(delivery.message.message_id.clone());
        delivery.release();
    }
    assert_eq!(seen.len(), 12);

    let transport = harness.transport.clone();
    assert!(wait_until(|| transport.parked_count() == 3).await);
    for queue_id in 0..3 {
        let process_queue = harness.consumer.process_queue(&partition(queue_id)).unwrap();
        assert_eq!(process_queue.cached_message_quantity(), 0);
        assert_eq!(process_queue.cached_message_memory(), 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_throttled_broker_is_retried_with_same_attempt() {
    let harness = start_consumer(fast_config("GID_orders"));
    harness.consumer.assign(partition(0)).unwrap();

    harness
        .transport
        .complete(&partition(0), Err(ReceiveError::TooManyRequests));

    let transport = harness.transport.clone();
    assert!(wait_until(|| transport.request_count() == 2).await);
    let requests = harness.transport.requests();
    assert_eq!(requests[0].request.attempt_id, requests[1].request.attempt_id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_memory_threshold_pauses_until_release() {
    let mut config = fast_config("GID_orders");
    config.max_cached_message_memory = 1024;
    let mut harness = start_consumer(config);
    harness.consumer.assign(partition(0)).unwrap();

    harness
        .transport
        .complete(&partition(0), Ok(batch(&partition(0), 2, 512)));
    let first = harness.deliveries.recv().await.unwrap();
    let second = harness.deliveries.recv().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.transport.request_count(), 1);

    first.release();
    let transport = harness.transport.clone();
    assert!(wait_until(|| transport.request_count() == 2).await);
    second.release();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_broker_failures_keep_the_loop_alive() {
    let mut harness = start_consumer(fast_config("GID_orders"));
    let queue = partition(0);
    harness.transport.enqueue(
        &queue,
        Err(ReceiveError::Broker {
            code: 50001,
            message: "internal".to_string(),
        }),
    );
    harness.transport.enqueue(&queue, Err(ReceiveError::NoContent));
    harness.transport.enqueue(&queue, Ok(batch(&queue, 1, 8)));

    harness.consumer.assign(queue.clone()).unwrap();

    let delivery = harness.deliveries.recv().await.unwrap();
    assert_eq!(delivery.message_queue, queue);
    delivery.release();
    let transport = harness.transport.clone();
    assert!(wait_until(|| transport.request_count() == 4 && transport.parked_count() == 1).await);
}
