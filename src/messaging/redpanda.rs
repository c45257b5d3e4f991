use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
};

use super::{EventPublisher, PublishError};
use crate::domain::order::OrderEvent;
use crate::utils::{retry_on_transient, CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryConfig};

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RedpandaPublisher {
    producer: FutureProducer,
    topic: String,
    circuit_breaker: CircuitBreaker,
    retry: RetryConfig,
}

impl RedpandaPublisher {
    pub fn new(brokers: &str, topic: impl Into<String>) -> anyhow::Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            // Per-key ordering survives producer retries
            .set("enable.idempotence", "true")
            .create()
            .context("Failed to create Redpanda producer")?;

        let cb_config = CircuitBreakerConfig {
            failure_threshold: 5,
            open_for: Duration::from_secs(30),
            success_threshold: 3,
        };

        let topic = topic.into();
        tracing::info!(brokers, topic = %topic, "✅ Redpanda producer ready");

        Ok(Self {
            producer,
            topic,
            circuit_breaker: CircuitBreaker::new("redpanda", cb_config),
            retry: RetryConfig::conservative(),
        })
    }

    pub async fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state().await
    }

    async fn send(&self, key: &str, payload: &str) -> Result<(), PublishError> {
        let record = FutureRecord::to(&self.topic).key(key).payload(payload);

        self.producer
            .send(record, Timeout::After(SEND_TIMEOUT))
            .await
            .map(|_| ())
            .map_err(|(e, _)| PublishError::Broker(e))
    }
}

#[async_trait]
impl EventPublisher for RedpandaPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_string(event)?;
        let key = event.partition_key();

        let (key_ref, payload_ref) = (key.as_str(), payload.as_str());
        let result = retry_on_transient(self.retry.clone(), move |attempt| async move {
            tracing::debug!(attempt, key = key_ref, "Sending record to Redpanda");
            self.circuit_breaker
                .call(self.send(key_ref, payload_ref))
                .await
                .map_err(PublishError::from)
        })
        .await
        .into_result();

        match &result {
            Ok(()) => tracing::info!(
                topic = %self.topic,
                key = %key,
                event_type = event.event_type.as_str(),
                "📤 Published to Redpanda"
            ),
            Err(PublishError::CircuitOpen(_)) => tracing::error!(
                topic = %self.topic,
                "Circuit breaker open - Redpanda unavailable"
            ),
            Err(e) => tracing::error!(
                error = %e,
                topic = %self.topic,
                "Failed to publish to Redpanda"
            ),
        }

        result
    }
}
