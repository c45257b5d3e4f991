use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::ValidationError;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Lifecycle status of an order.
///
/// `Delivered` and `Cancelled` are terminal. The transition table lives in
/// [`OrderStatus::can_transition_to`] and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Answers the order state machine.
    ///
    /// Once shipped, an order can no longer be cancelled.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Processing)
                | (Confirmed, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidStatus(s.to_string()))
    }
}

/// An item as supplied by a caller, before it is attached to an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: i32,
    pub price: Decimal,
}

impl NewOrderItem {
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        quantity: i32,
        price: Decimal,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            quantity,
            price,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_line(&self.product_id, &self.name, self.quantity, self.price)
    }
}

/// An item owned by an order. Identity and subtotal are assigned on attach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: String,
    pub name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

impl OrderItem {
    /// Attach a caller-supplied item: fresh identity, derived subtotal.
    ///
    /// Fails with `AmountOverflow` when `price * quantity` does not fit in a
    /// `Decimal`.
    pub fn attach(item: NewOrderItem) -> Result<Self, ValidationError> {
        let subtotal = subtotal_of(item.price, item.quantity)?;
        Ok(Self {
            id: Uuid::new_v4(),
            product_id: item.product_id,
            name: item.name,
            quantity: item.quantity,
            price: item.price,
            subtotal,
        })
    }

    pub fn calculate_subtotal(&self) -> Result<Decimal, ValidationError> {
        subtotal_of(self.price, self.quantity)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_line(&self.product_id, &self.name, self.quantity, self.price)
    }
}

fn subtotal_of(price: Decimal, quantity: i32) -> Result<Decimal, ValidationError> {
    price
        .checked_mul(Decimal::from(quantity))
        .ok_or(ValidationError::AmountOverflow)
}

fn validate_line(
    product_id: &str,
    name: &str,
    quantity: i32,
    price: Decimal,
) -> Result<(), ValidationError> {
    if product_id.trim().is_empty() {
        return Err(ValidationError::MissingProductId);
    }
    if name.trim().is_empty() {
        return Err(ValidationError::MissingProductName);
    }
    if quantity <= 0 {
        return Err(ValidationError::InvalidQuantity(quantity));
    }
    if price <= Decimal::ZERO {
        return Err(ValidationError::InvalidPrice(price));
    }
    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn allowed() -> Vec<(OrderStatus, OrderStatus)> {
        use OrderStatus::*;
        vec![
            (Pending, Confirmed),
            (Pending, Cancelled),
            (Confirmed, Processing),
            (Confirmed, Cancelled),
            (Processing, Shipped),
            (Processing, Cancelled),
            (Shipped, Delivered),
        ]
    }

    #[test]
    fn test_transition_table_is_closed() {
        let allowed = allowed();
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_concrete_transitions() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Shipped));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for terminal in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            assert!(terminal.is_terminal());
            for to in OrderStatus::ALL {
                assert!(!terminal.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_status_parsing() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!(matches!(
            "archived".parse::<OrderStatus>(),
            Err(ValidationError::InvalidStatus(s)) if s == "archived"
        ));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }

    #[test]
    fn test_attach_assigns_identity_and_subtotal() {
        let item = OrderItem::attach(NewOrderItem::new("p1", "Widget", 2, Decimal::new(1050, 2))).unwrap();
        assert_eq!(item.subtotal, Decimal::new(2100, 2));
        assert_eq!(item.calculate_subtotal(), Ok(item.subtotal));

        let again = OrderItem::attach(NewOrderItem::new("p1", "Widget", 2, Decimal::new(1050, 2))).unwrap();
        assert_ne!(item.id, again.id);
    }

    #[test]
    fn test_attach_rejects_subtotal_overflow() {
        let line = NewOrderItem::new("p1", "Widget", 10, Decimal::MAX);
        assert!(line.validate().is_ok());

        assert_eq!(OrderItem::attach(line).unwrap_err(), ValidationError::AmountOverflow);
    }

    #[test]
    fn test_item_validation() {
        let ok = NewOrderItem::new("p1", "Widget", 1, Decimal::ONE);
        assert!(ok.validate().is_ok());

        let cases = [
            (NewOrderItem::new("", "Widget", 1, Decimal::ONE), ValidationError::MissingProductId),
            (NewOrderItem::new("p1", " ", 1, Decimal::ONE), ValidationError::MissingProductName),
            (NewOrderItem::new("p1", "Widget", 0, Decimal::ONE), ValidationError::InvalidQuantity(0)),
            (
                NewOrderItem::new("p1", "Widget", 1, Decimal::ZERO),
                ValidationError::InvalidPrice(Decimal::ZERO),
            ),
        ];

        for (item, expected) in cases {
            assert_eq!(item.validate().unwrap_err(), expected);
        }
    }
}
