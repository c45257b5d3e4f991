use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::aggregate::Order;
use super::value_objects::OrderStatus;

// ============================================================================
// Order Events - lifecycle records written to the event log
// ============================================================================
//
// One JSON object per record. The partition key is always the order id so
// every consumer sees one order's events in publication order.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEventType {
    #[serde(rename = "order.created")]
    Created,
    #[serde(rename = "order.updated")]
    Updated,
    #[serde(rename = "order.status_changed")]
    StatusChanged,
}

impl OrderEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderEventType::Created => "order.created",
            OrderEventType::Updated => "order.updated",
            OrderEventType::StatusChanged => "order.status_changed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub event_type: OrderEventType,
    pub order_id: Uuid,
    pub customer_id: String,
    /// Status of the order at the time of the event.
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_status: Option<OrderStatus>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub version: i64,
    pub occurred_at: DateTime<Utc>,
}

impl OrderEvent {
    fn from_order(event_type: OrderEventType, order: &Order) -> Self {
        Self {
            event_type,
            order_id: order.id,
            customer_id: order.customer_id.clone(),
            status: order.status,
            old_status: None,
            new_status: None,
            total: order.total,
            version: order.version,
            occurred_at: Utc::now(),
        }
    }

    pub fn created(order: &Order) -> Self {
        Self::from_order(OrderEventType::Created, order)
    }

    pub fn updated(order: &Order) -> Self {
        Self::from_order(OrderEventType::Updated, order)
    }

    pub fn status_changed(order: &Order, old_status: OrderStatus, new_status: OrderStatus) -> Self {
        Self {
            old_status: Some(old_status),
            new_status: Some(new_status),
            ..Self::from_order(OrderEventType::StatusChanged, order)
        }
    }

    /// Ordering key for the underlying log.
    pub fn partition_key(&self) -> String {
        self.order_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::NewOrderItem;

    fn order() -> Order {
        let mut order =
            Order::create("cust-1", vec![NewOrderItem::new("p1", "Widget", 2, Decimal::new(1050, 2))])
                .unwrap();
        order.version = 1;
        order
    }

    #[test]
    fn test_created_event_wire_shape() {
        let order = order();
        let value = serde_json::to_value(OrderEvent::created(&order)).unwrap();

        assert_eq!(value["event_type"], "order.created");
        assert_eq!(value["order_id"], order.id.to_string());
        assert_eq!(value["customer_id"], "cust-1");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["total"], 21.0);
        assert_eq!(value["version"], 1);
        assert!(value.get("old_status").is_none());
        assert!(value.get("new_status").is_none());
        assert!(value["occurred_at"].as_str().is_some());
    }

    #[test]
    fn test_status_changed_carries_both_statuses() {
        let mut order = order();
        order.status = OrderStatus::Confirmed;

        let event = OrderEvent::status_changed(&order, OrderStatus::Pending, OrderStatus::Confirmed);
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["event_type"], "order.status_changed");
        assert_eq!(value["status"], "confirmed");
        assert_eq!(value["old_status"], "pending");
        assert_eq!(value["new_status"], "confirmed");
        assert_eq!(event.partition_key(), order.id.to_string());
    }

    #[test]
    fn test_event_parses_from_wire_payload() {
        let payload = r#"{
            "event_type": "order.updated",
            "order_id": "5f0c6a55-4cf1-4b8e-9d39-0c2a43a6bd4b",
            "customer_id": "cust-9",
            "status": "shipped",
            "total": 12.5,
            "version": 7,
            "occurred_at": "2026-01-02T03:04:05Z"
        }"#;

        let event: OrderEvent = serde_json::from_str(payload).unwrap();
        assert_eq!(event.event_type, OrderEventType::Updated);
        assert_eq!(event.status, OrderStatus::Shipped);
        assert_eq!(event.total, Decimal::new(125, 1));
        assert_eq!(event.old_status, None);
    }
}
