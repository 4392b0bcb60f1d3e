//! Assignment, revocation and expiration tests

use crate::common::{batch, fast_config, partition, start_consumer};
use popqueue::config::ConsumerConfig;
use popqueue::consumer::api::{ChannelDispatcher, PushConsumer};
use popqueue::core::time::MockTimeProvider;
use popqueue::transport::LoopbackTransport;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

#[tokio::test]
async fn test_revoked_partition_drops_in_flight_result() {
    let mut harness = start_consumer(fast_config("GID_orders"));
    harness.consumer.assign(partition(0)).unwrap();
    harness.consumer.assign(partition(1)).unwrap();

    harness.consumer.revoke(&partition(0)).unwrap();
    harness
        .transport
        .complete(&partition(0), Ok(batch(&partition(0), 2, 8)));
    harness
        .transport
        .complete(&partition(1), Ok(batch(&partition(1), 1, 8)));

    let delivery = harness.deliveries.recv().await.unwrap();
    assert_eq!(delivery.message_queue, partition(1));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(harness.deliveries.try_recv().is_err());
    assert_eq!(harness.consumer.assigned_queues(), vec![partition(1)]);
}

#[tokio::test]
async fn test_release_after_revocation_is_harmless() {
    let mut harness = start_consumer(fast_config("GID_orders"));
    harness.consumer.assign(partition(0)).unwrap();
    harness
        .transport
        .complete(&partition(0), Ok(batch(&partition(0), 1, 8)));
    let delivery = harness.deliveries.recv().await.unwrap();

    harness.consumer.revoke(&partition(0)).unwrap();

    delivery.release();
    assert!(harness.consumer.process_queue(&partition(0)).is_none());
}

#[tokio::test]
async fn test_reassigned_partition_starts_with_empty_cache() {
    let mut harness = start_consumer(fast_config("GID_orders"));
    harness.consumer.assign(partition(0)).unwrap();
    harness
        .transport
        .complete(&partition(0), Ok(batch(&partition(0), 3, 8)));
    for _ in 0..3 {
        harness.deliveries.recv().await.unwrap();
    }

    harness.consumer.revoke(&partition(0)).unwrap();
    assert!(harness.consumer.assign(partition(0)).unwrap());

    let process_queue = harness.consumer.process_queue(&partition(0)).unwrap();
    assert_eq!(process_queue.cached_message_quantity(), 0);
}

#[tokio::test]
async fn test_expiration_sweep_removes_abandoned_partitions() {
    let clock = MockTimeProvider::new();
    let runtime = Handle::current();
    let transport = Arc::new(LoopbackTransport::new(runtime.clone()));
    let (dispatcher, _deliveries) = ChannelDispatcher::new();
    let consumer = PushConsumer::with_time_provider(
        ConsumerConfig::new("GID_orders"),
        transport,
        Arc::new(dispatcher),
        runtime,
        Arc::new(clock.clone()),
    )
    .unwrap();
    consumer.assign(partition(0)).unwrap();

    let sweep = consumer
        .spawn_expiration_sweep(Duration::from_millis(10))
        .unwrap();
    clock.advance_time(Duration::from_secs(300));

    let mut drained = false;
    for _ in 0..200 {
        if consumer.assigned_queues().is_empty() {
            drained = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(drained);

    consumer.shutdown().unwrap();
    tokio::time::timeout(Duration::from_secs(1), sweep)
        .await
        .unwrap()
        .unwrap();
}
