use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use super::{EventPublisher, PublishError};
use crate::change_feed::{FeedError, FeedReader, FeedSource};
use crate::domain::order::OrderEvent;

const LIVE_CAPACITY: usize = 1024;

/// In-process event log.
///
/// Keeps every record in publication order (key plus payload bytes) and
/// fans each one out live to readers opened through [`FeedSource`].
/// Readers only see records published after they opened, like a Kafka
/// consumer starting at the tail.
pub struct InMemoryEventBus {
    log: Mutex<Vec<(String, Vec<u8>)>>,
    live: broadcast::Sender<Vec<u8>>,
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        let (live, _) = broadcast::channel(LIVE_CAPACITY);
        Self {
            log: Mutex::new(Vec::new()),
            live,
        }
    }

    /// Append a raw payload under `key`, bypassing encoding.
    pub async fn publish_raw(&self, key: impl Into<String>, payload: Vec<u8>) {
        self.log.lock().await.push((key.into(), payload.clone()));
        // No receivers is fine
        let _ = self.live.send(payload);
    }

    /// Every decodable event for one order, in publication order.
    pub async fn events_for(&self, order_id: Uuid) -> Vec<OrderEvent> {
        let key = order_id.to_string();
        self.log
            .lock()
            .await
            .iter()
            .filter(|(k, _)| *k == key)
            .filter_map(|(_, payload)| serde_json::from_slice(payload).ok())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.log.lock().await.len()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(event)?;
        self.publish_raw(event.partition_key(), payload).await;
        Ok(())
    }
}

#[async_trait]
impl FeedSource for InMemoryEventBus {
    async fn open_reader(&self) -> Result<Box<dyn FeedReader>, FeedError> {
        Ok(Box::new(BusReader {
            rx: self.live.subscribe(),
        }))
    }
}

struct BusReader {
    rx: broadcast::Receiver<Vec<u8>>,
}

#[async_trait]
impl FeedReader for BusReader {
    async fn next_record(&mut self) -> Result<Vec<u8>, FeedError> {
        loop {
            match self.rx.recv().await {
                Ok(payload) => return Ok(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "In-memory feed reader lagged, records skipped");
                }
                Err(broadcast::error::RecvError::Closed) => return Err(FeedError::Closed),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{NewOrderItem, Order, OrderEventType, OrderStatus};
    use rust_decimal::Decimal;

    fn order() -> Order {
        Order::create("cust-1", vec![NewOrderItem::new("p1", "Widget", 1, Decimal::ONE)]).unwrap()
    }

    #[tokio::test]
    async fn test_events_are_keyed_by_order() {
        let bus = InMemoryEventBus::new();
        let first = order();
        let second = order();

        bus.publish_created(&first).await.unwrap();
        bus.publish_created(&second).await.unwrap();
        bus.publish_status_changed(&first, OrderStatus::Pending, OrderStatus::Confirmed)
            .await
            .unwrap();

        let events = bus.events_for(first.id).await;
        let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(types, vec![OrderEventType::Created, OrderEventType::StatusChanged]);
        assert_eq!(bus.len().await, 3);
    }

    #[tokio::test]
    async fn test_reader_starts_at_tail() {
        let bus = InMemoryEventBus::new();
        bus.publish_raw("before", b"old".to_vec()).await;

        let mut reader = bus.open_reader().await.unwrap();
        bus.publish_raw("after", b"new".to_vec()).await;

        assert_eq!(reader.next_record().await.unwrap(), b"new".to_vec());
    }

    #[tokio::test]
    async fn test_readers_are_independent() {
        let bus = InMemoryEventBus::new();
        let mut a = bus.open_reader().await.unwrap();
        let mut b = bus.open_reader().await.unwrap();

        bus.publish_raw("k", b"one".to_vec()).await;
        bus.publish_raw("k", b"two".to_vec()).await;

        assert_eq!(a.next_record().await.unwrap(), b"one".to_vec());
        assert_eq!(a.next_record().await.unwrap(), b"two".to_vec());
        assert_eq!(b.next_record().await.unwrap(), b"one".to_vec());
    }
}
