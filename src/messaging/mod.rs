// ============================================================================
// Event Publisher Port - ordered, keyed append to the event log
// ============================================================================
//
// Every record is keyed by order id so the log keeps per-order ordering.
// Nothing is guaranteed across orders. The orchestrator only ever writes
// here; reading is the change feed's job.
//
// Variants:
// - redpanda - Kafka-protocol producer behind a circuit breaker
// - noop     - used when no broker is configured
// - memory   - in-process log, doubles as a change feed source for tests
//
// ============================================================================

mod memory;
mod noop;
mod redpanda;

pub use memory::InMemoryEventBus;
pub use noop::NoopPublisher;
pub use redpanda::RedpandaPublisher;

use async_trait::async_trait;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};

use crate::domain::order::{Order, OrderEvent, OrderStatus};
use crate::utils::{CircuitBreakerError, IsTransient};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("broker rejected record: {0}")]
    Broker(#[from] KafkaError),

    #[error("circuit '{0}' is open, broker considered unavailable")]
    CircuitOpen(&'static str),
}

impl From<CircuitBreakerError<PublishError>> for PublishError {
    fn from(e: CircuitBreakerError<PublishError>) -> Self {
        match e {
            CircuitBreakerError::CircuitOpen(name) => PublishError::CircuitOpen(name),
            CircuitBreakerError::OperationFailed(inner) => inner,
        }
    }
}

impl IsTransient for PublishError {
    fn is_transient(&self) -> bool {
        match self {
            PublishError::Broker(e) => matches!(
                e.rdkafka_error_code(),
                Some(
                    RDKafkaErrorCode::QueueFull
                        | RDKafkaErrorCode::MessageTimedOut
                        | RDKafkaErrorCode::RequestTimedOut
                        | RDKafkaErrorCode::BrokerTransportFailure
                        | RDKafkaErrorCode::AllBrokersDown
                        | RDKafkaErrorCode::LeaderNotAvailable
                        | RDKafkaErrorCode::NotLeaderForPartition
                )
            ),
            PublishError::Encode(_) | PublishError::CircuitOpen(_) => false,
        }
    }
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Append one event, keyed by its order id.
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError>;

    async fn publish_created(&self, order: &Order) -> Result<(), PublishError> {
        self.publish(&OrderEvent::created(order)).await
    }

    async fn publish_updated(&self, order: &Order) -> Result<(), PublishError> {
        self.publish(&OrderEvent::updated(order)).await
    }

    async fn publish_status_changed(
        &self,
        order: &Order,
        old_status: OrderStatus,
        new_status: OrderStatus,
    ) -> Result<(), PublishError> {
        self.publish(&OrderEvent::status_changed(order, old_status, new_status))
            .await
    }
}
