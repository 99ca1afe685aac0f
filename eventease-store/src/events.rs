use async_trait::async_trait;
use eventease_core::notify::{changed_event, ChangeNotifier};
use eventease_core::{CoreError, CoreResult, InquiryChange};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{error, info};

#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
}

impl EventProducer {
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer })
    }

    pub async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(topic)
            .key(key)
            .payload(payload);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                info!(
                    "Sent message to {}/{}: partition {} offset {}",
                    topic, key, delivery.partition, delivery.offset
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send message to {}: {}", topic, e);
                Err(e)
            }
        }
    }
}

/// Publishes every committed inquiry change as JSON, keyed by inquiry id so
/// one inquiry's changes stay on one partition in order.
pub struct KafkaChangeNotifier {
    producer: EventProducer,
    topic: String,
}

impl KafkaChangeNotifier {
    pub fn new(producer: EventProducer, topic: impl Into<String>) -> Self {
        Self {
            producer,
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl ChangeNotifier for KafkaChangeNotifier {
    async fn notify(&self, change: &InquiryChange) -> CoreResult<()> {
        let event = changed_event(change);
        let payload = serde_json::to_string(&event)
            .map_err(|e| CoreError::InternalError(format!("could not encode change event: {}", e)))?;

        self.producer
            .publish(&self.topic, &event.key(), &payload)
            .await
            .map_err(|e| CoreError::TransportError(e.to_string()))
    }
}
