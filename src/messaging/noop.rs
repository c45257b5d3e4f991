use async_trait::async_trait;

use super::{EventPublisher, PublishError};
use crate::domain::order::OrderEvent;

/// Publisher used when no broker is configured. Accepts and discards.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError> {
        tracing::debug!(
            order_id = %event.order_id,
            event_type = event.event_type.as_str(),
            "No broker configured, event discarded"
        );
        Ok(())
    }
}
