use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use rust_decimal::Decimal;

use super::*;
use crate::domain::order::{NewOrderItem, Order, OrderEventType};
use crate::messaging::{EventPublisher, InMemoryEventBus};

// ============================================================================
// Helpers
// ============================================================================

fn metrics() -> Arc<Metrics> {
    Arc::new(Metrics::new().unwrap())
}

fn order(status: OrderStatus) -> Order {
    let mut order = Order::create("cust-1", vec![NewOrderItem::new("p1", "Widget", 1, Decimal::ONE)]).unwrap();
    order.status = status;
    order.version = 1;
    order
}

async fn next(stream: &mut WatchStream) -> Option<Result<OrderEvent, OrderError>> {
    tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("watch stream stalled")
}

/// Source whose readers fail on the first read.
struct BrokenSource;

struct BrokenReader;

#[async_trait]
impl FeedSource for BrokenSource {
    async fn open_reader(&self) -> Result<Box<dyn FeedReader>, FeedError> {
        Ok(Box::new(BrokenReader))
    }
}

#[async_trait]
impl FeedReader for BrokenReader {
    async fn next_record(&mut self) -> Result<Vec<u8>, FeedError> {
        Err(FeedError::Read("broker connection reset".to_string()))
    }
}

struct UnreachableSource;

#[async_trait]
impl FeedSource for UnreachableSource {
    async fn open_reader(&self) -> Result<Box<dyn FeedReader>, FeedError> {
        Err(FeedError::Open("no brokers reachable".to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_watch_without_broker_is_unavailable() {
    let feed = ChangeFeed::disabled(metrics());

    let result = feed.watch(&[], CancellationToken::new()).await;
    assert!(matches!(result, Err(OrderError::Unavailable(_))));
}

#[tokio::test]
async fn test_watch_with_unreachable_broker_is_unavailable() {
    let feed = ChangeFeed::new(Arc::new(UnreachableSource), metrics());

    let result = feed.watch(&[], CancellationToken::new()).await;
    assert!(matches!(result, Err(OrderError::Unavailable(_))));
}

#[tokio::test]
async fn test_watcher_receives_events_published_after_it_opened() {
    let bus = Arc::new(InMemoryEventBus::new());
    let feed = ChangeFeed::new(bus.clone(), metrics());

    let early = order(OrderStatus::Pending);
    bus.publish_created(&early).await.unwrap();

    let mut stream = feed.watch(&[], CancellationToken::new()).await.unwrap();

    let late = order(OrderStatus::Pending);
    bus.publish_created(&late).await.unwrap();

    let event = next(&mut stream).await.unwrap().unwrap();
    assert_eq!(event.order_id, late.id);
    assert_eq!(event.event_type, OrderEventType::Created);
}

#[tokio::test]
async fn test_status_filter_forwards_only_matching_events() {
    let bus = Arc::new(InMemoryEventBus::new());
    let feed = ChangeFeed::new(bus.clone(), metrics());
    let mut stream = feed
        .watch(&[OrderStatus::Shipped, OrderStatus::Delivered], CancellationToken::new())
        .await
        .unwrap();

    bus.publish_updated(&order(OrderStatus::Pending)).await.unwrap();
    let shipped = order(OrderStatus::Shipped);
    bus.publish_status_changed(&shipped, OrderStatus::Processing, OrderStatus::Shipped)
        .await
        .unwrap();

    let event = next(&mut stream).await.unwrap().unwrap();
    assert_eq!(event.order_id, shipped.id);
    assert_eq!(event.new_status, Some(OrderStatus::Shipped));
}

#[tokio::test]
async fn test_concurrent_watchers_each_get_every_event() {
    let bus = Arc::new(InMemoryEventBus::new());
    let feed = ChangeFeed::new(bus.clone(), metrics());

    let mut first = feed.watch(&[], CancellationToken::new()).await.unwrap();
    let mut second = feed.watch(&[], CancellationToken::new()).await.unwrap();

    let a = order(OrderStatus::Pending);
    let b = order(OrderStatus::Pending);
    bus.publish_created(&a).await.unwrap();
    bus.publish_created(&b).await.unwrap();

    for stream in [&mut first, &mut second] {
        assert_eq!(next(stream).await.unwrap().unwrap().order_id, a.id);
        assert_eq!(next(stream).await.unwrap().unwrap().order_id, b.id);
    }
}

#[tokio::test]
async fn test_unparsable_records_are_skipped() {
    let bus = Arc::new(InMemoryEventBus::new());
    let metrics = metrics();
    let feed = ChangeFeed::new(bus.clone(), metrics.clone());
    let mut stream = feed.watch(&[], CancellationToken::new()).await.unwrap();

    bus.publish_raw("garbage", b"{not json".to_vec()).await;
    let good = order(OrderStatus::Pending);
    bus.publish_created(&good).await.unwrap();

    assert_eq!(next(&mut stream).await.unwrap().unwrap().order_id, good.id);
    assert_eq!(metrics.records_dropped.with_label_values(&["unparsable"]).get(), 1);
}

#[tokio::test]
async fn test_cancellation_ends_stream_cleanly() {
    let bus = Arc::new(InMemoryEventBus::new());
    let metrics = metrics();
    let feed = ChangeFeed::new(bus.clone(), metrics.clone());
    let cancel = CancellationToken::new();

    let mut stream = feed.watch(&[], cancel.clone()).await.unwrap();
    cancel.cancel();

    assert!(next(&mut stream).await.is_none());
    assert_eq!(metrics.active_watchers.get(), 0);
}

#[tokio::test]
async fn test_cancellation_ends_session_blocked_on_full_buffer() {
    let bus = Arc::new(InMemoryEventBus::new());
    let metrics = metrics();
    let feed = ChangeFeed::new(bus.clone(), metrics.clone());
    let cancel = CancellationToken::new();

    // Never read, so the session fills its buffer and waits on the send
    let _stream = feed.watch(&[], cancel.clone()).await.unwrap();
    for _ in 0..SESSION_BUFFER + 16 {
        bus.publish_created(&order(OrderStatus::Pending)).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(metrics.active_watchers.get(), 1);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), async {
        while metrics.active_watchers.get() != 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("cancelled session stayed blocked on a full buffer");
}

#[tokio::test]
async fn test_read_failure_is_surfaced_then_stream_ends() {
    let feed = ChangeFeed::new(Arc::new(BrokenSource), metrics());
    let mut stream = feed.watch(&[], CancellationToken::new()).await.unwrap();

    assert!(matches!(next(&mut stream).await, Some(Err(OrderError::Unavailable(_)))));
    assert!(next(&mut stream).await.is_none());
}

#[tokio::test]
async fn test_dropping_stream_releases_session() {
    let bus = Arc::new(InMemoryEventBus::new());
    let metrics = metrics();
    let feed = ChangeFeed::new(bus.clone(), metrics.clone());
    let cancel = CancellationToken::new();

    let stream = feed.watch(&[], cancel.clone()).await.unwrap();
    drop(stream);

    assert!(cancel.is_cancelled());
    tokio::time::timeout(Duration::from_secs(2), async {
        while metrics.active_watchers.get() != 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("watch session did not shut down");
}
