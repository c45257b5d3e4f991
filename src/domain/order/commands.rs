use serde::{Deserialize, Serialize};

use super::aggregate::Order;
use super::value_objects::{NewOrderItem, OrderStatus};

// ============================================================================
// Order Commands & Queries - Represent caller intent
// ============================================================================

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub customer_id: String,
    pub items: Vec<NewOrderItem>,
}

/// Partial update. `None` leaves the field untouched; supplied items replace
/// the existing ones wholesale.
#[derive(Debug, Clone, Default)]
pub struct UpdateOrder {
    pub items: Option<Vec<NewOrderItem>>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ListOrders {
    pub page: i64,
    pub page_size: i64,
    pub status: Option<OrderStatus>,
    pub customer_id: Option<String>,
}

impl ListOrders {
    /// Page clamped to >= 1.
    pub fn normalized_page(&self) -> i64 {
        self.page.max(1)
    }

    /// Page size defaulted to 20 when unset or non-positive, capped at 100.
    pub fn normalized_page_size(&self) -> i64 {
        if self.page_size < 1 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size.min(MAX_PAGE_SIZE)
        }
    }

    /// Rows to skip. Saturates so an absurd page yields an empty result
    /// rather than a wrapped, negative offset.
    pub fn offset(&self) -> i64 {
        (self.normalized_page() - 1).saturating_mul(self.normalized_page_size())
    }

    /// Customer filter, ignoring a blank id.
    pub fn customer_filter(&self) -> Option<&str> {
        self.customer_id
            .as_deref()
            .filter(|customer_id| !customer_id.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedOrders {
    pub orders: Vec<Order>,
    pub page: i64,
    pub page_size: i64,
    pub total_count: i64,
    pub total_pages: i64,
}

impl PaginatedOrders {
    pub fn total_pages(total_count: i64, page_size: i64) -> i64 {
        if page_size <= 0 {
            return 0;
        }
        (total_count + page_size - 1) / page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_clamping() {
        let req = ListOrders { page: -3, page_size: 0, ..Default::default() };
        assert_eq!(req.normalized_page(), 1);
        assert_eq!(req.normalized_page_size(), DEFAULT_PAGE_SIZE);

        let req = ListOrders { page: 4, page_size: 500, ..Default::default() };
        assert_eq!(req.normalized_page(), 4);
        assert_eq!(req.normalized_page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_offset_saturates_for_huge_pages() {
        let req = ListOrders { page: 3, page_size: 10, ..Default::default() };
        assert_eq!(req.offset(), 20);

        let req = ListOrders { page: i64::MAX, page_size: 10, ..Default::default() };
        assert_eq!(req.offset(), i64::MAX);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(PaginatedOrders::total_pages(25, 10), 3);
        assert_eq!(PaginatedOrders::total_pages(20, 10), 2);
        assert_eq!(PaginatedOrders::total_pages(0, 10), 0);
        assert_eq!(PaginatedOrders::total_pages(1, 100), 1);
    }

    #[test]
    fn test_blank_customer_filter_is_ignored() {
        let req = ListOrders { customer_id: Some("  ".into()), ..Default::default() };
        assert!(req.customer_filter().is_none());

        let req = ListOrders { customer_id: Some("cust-1".into()), ..Default::default() };
        assert_eq!(req.customer_filter(), Some("cust-1"));
    }
}
