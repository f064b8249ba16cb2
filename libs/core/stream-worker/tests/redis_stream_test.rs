//! Redis Streams source against a real server. Need Docker: `cargo test -- --ignored`.

use std::time::Duration;
use stream_worker::{BrokerConfig, MessageSource, RedisStreamSource, StreamProducer};
use test_utils::{TestDataBuilder, TestRedis};

fn broker(redis: &TestRedis, topic: &str) -> BrokerConfig {
    BrokerConfig::new(redis.connection_string(), topic).with_poll_interval_ms(20)
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_unacknowledged_entries_replay_after_restart() {
    let redis = TestRedis::new().await;
    let topic = TestDataBuilder::from_test_name("replay").name("stream", "events");
    let producer = StreamProducer::new(redis.connection(), topic.clone());

    producer.publish(Some("user-1"), br#"{"n":1}"#).await.unwrap();
    producer.publish(None, br#"{"n":2}"#).await.unwrap();

    // First run: both entries delivered, none acknowledged
    let mut first = RedisStreamSource::connect(redis.connection(), broker(&redis, &topic)).await.unwrap();
    let m1 = first.fetch().await.unwrap();
    assert_eq!(m1.payload, br#"{"n":1}"#);
    assert_eq!(m1.key.as_deref(), Some("user-1"));
    first.close().await.unwrap();

    // Restart under the same consumer name replays the backlog in order
    let mut second = RedisStreamSource::connect(redis.connection(), broker(&redis, &topic)).await.unwrap();
    let replayed = second.fetch().await.unwrap();
    assert_eq!(replayed.id, m1.id);
    second.commit(&replayed).await.unwrap();

    let m2 = second.fetch().await.unwrap();
    assert_eq!(m2.payload, br#"{"n":2}"#);
    second.commit(&m2).await.unwrap();
    second.close().await.unwrap();

    // Everything acknowledged: nothing comes back
    let mut third = RedisStreamSource::connect(redis.connection(), broker(&redis, &topic)).await.unwrap();
    let next = tokio::time::timeout(Duration::from_millis(300), third.fetch()).await;
    assert!(next.is_err(), "no entries should be redelivered");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_new_entries_arrive_while_polling() {
    let redis = TestRedis::new().await;
    let topic = TestDataBuilder::from_test_name("polling").name("stream", "events");

    let mut source = RedisStreamSource::connect(redis.connection(), broker(&redis, &topic)).await.unwrap();
    let producer = StreamProducer::new(redis.connection(), topic.clone());

    let publisher = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        producer.publish_json(None, &serde_json::json!({"event_type": "ping"})).await.unwrap();
    });

    let message = tokio::time::timeout(Duration::from_secs(2), source.fetch())
        .await
        .expect("entry should arrive")
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&message.payload).unwrap();
    assert_eq!(value["event_type"], "ping");

    publisher.await.unwrap();
}
