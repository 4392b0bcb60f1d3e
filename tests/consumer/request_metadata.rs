//! Attempt id and request header tests

use crate::common::{fast_config, partition, start_consumer};
use popqueue::config::Credentials;
use popqueue::core::unique_id::next_attempt_id;
use popqueue::protocol::signature::{AUTHORIZATION_KEY, CLIENT_ID_KEY, DATE_TIME_KEY};
use std::collections::HashSet;
use std::thread;

#[test]
fn test_attempt_ids_are_unique_across_threads() {
    let handles: Vec<_> = (0..8)
        .map(|_| {
            thread::spawn(|| {
                (0..1000)
                    .map(|_| next_attempt_id().unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert_eq!(id.len(), 36);
            assert!(seen.insert(id));
        }
    }
    assert_eq!(seen.len(), 8000);
}

#[tokio::test]
async fn test_requests_carry_signed_headers() {
    let mut config = fast_config("GID_orders");
    config.credentials = Some(Credentials::new("ak", "sk"));
    let harness = start_consumer(config);

    harness.consumer.assign(partition(0)).unwrap();

    let recorded = &harness.transport.requests()[0];
    let authorization = recorded.metadata.get(AUTHORIZATION_KEY).unwrap();
    assert!(authorization.starts_with("MQv2-HMAC-SHA1 Credential=ak, SignedHeaders=x-mq-date-time, Signature="));
    assert!(recorded.metadata.contains_key(DATE_TIME_KEY));
    assert!(recorded.metadata.get(CLIENT_ID_KEY).unwrap().contains('@'));
}

#[tokio::test]
async fn test_unsigned_requests_without_credentials() {
    let harness = start_consumer(fast_config("GID_orders"));

    harness.consumer.assign(partition(0)).unwrap();

    let recorded = &harness.transport.requests()[0];
    assert!(!recorded.metadata.contains_key(AUTHORIZATION_KEY));
    assert_eq!(recorded.request.attempt_id.len(), 36);
}
