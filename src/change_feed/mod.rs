// ============================================================================
// Change Feed - live, status-filtered fan-out of the event log
// ============================================================================
//
// Each watch session opens its own reader positioned at the current tail,
// so concurrent watchers never share or disturb a read position. A session
// is one spawned task feeding a bounded channel:
//
//   FeedReader --(bytes)--> pump task --(OrderEvent)--> WatchStream
//
// The pump stops when the session is cancelled or the stream is dropped
// (both clean), or when the reader fails (surfaced as the last item).
// Records that do not parse as an OrderEvent are skipped.
//
// ============================================================================

mod kafka;

pub use kafka::KafkaFeedSource;

use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures_util::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::order::{OrderError, OrderEvent, OrderStatus};
use crate::metrics::Metrics;

const SESSION_BUFFER: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("failed to open feed reader: {0}")]
    Open(String),

    #[error("feed read failed: {0}")]
    Read(String),

    #[error("feed closed")]
    Closed,
}

/// Opens independent readers over the event log.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// A fresh reader that sees only records published after it opened.
    async fn open_reader(&self) -> Result<Box<dyn FeedReader>, FeedError>;
}

#[async_trait]
pub trait FeedReader: Send {
    /// Wait for the next raw record payload.
    async fn next_record(&mut self) -> Result<Vec<u8>, FeedError>;
}

pub struct ChangeFeed {
    source: Option<Arc<dyn FeedSource>>,
    metrics: Arc<Metrics>,
}

impl ChangeFeed {
    pub fn new(source: Arc<dyn FeedSource>, metrics: Arc<Metrics>) -> Self {
        Self {
            source: Some(source),
            metrics,
        }
    }

    /// A feed with no broker behind it; every watch is refused.
    pub fn disabled(metrics: Arc<Metrics>) -> Self {
        Self { source: None, metrics }
    }

    pub fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    /// Start a watch session.
    ///
    /// An empty `statuses` forwards every event. The session ends cleanly
    /// when `cancel` fires or the returned stream is dropped.
    pub async fn watch(&self, statuses: &[OrderStatus], cancel: CancellationToken) -> Result<WatchStream, OrderError> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| OrderError::Unavailable("change feed is not configured".to_string()))?;

        let reader = source
            .open_reader()
            .await
            .map_err(|e| OrderError::Unavailable(e.to_string()))?;

        let filter: HashSet<OrderStatus> = statuses.iter().copied().collect();
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);

        tracing::info!(statuses = ?filter, "🚀 Watch session started");
        tokio::spawn(pump(reader, filter, tx, cancel.clone(), self.metrics.clone()));

        Ok(WatchStream { rx, _cancel_on_drop: cancel.drop_guard() })
    }
}

async fn pump(
    mut reader: Box<dyn FeedReader>,
    filter: HashSet<OrderStatus>,
    tx: mpsc::Sender<Result<OrderEvent, OrderError>>,
    cancel: CancellationToken,
    metrics: Arc<Metrics>,
) {
    metrics.active_watchers.inc();

    loop {
        let record = tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tx.closed() => break,
            record = reader.next_record() => record,
        };

        let payload = match record {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "❌ Watch session read failed");
                deliver(&tx, &cancel, Err(OrderError::Unavailable(e.to_string()))).await;
                break;
            }
        };

        let event: OrderEvent = match serde_json::from_slice(&payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unparsable change feed record");
                metrics.record_dropped_record("unparsable");
                continue;
            }
        };

        if !filter.is_empty() && !filter.contains(&event.status) {
            continue;
        }

        if !deliver(&tx, &cancel, Ok(event)).await {
            break;
        }
    }

    metrics.active_watchers.dec();
    tracing::info!("Watch session ended");
}

/// Hand one item to the watcher. A full buffer does not outlive
/// cancellation; returns false once the session should stop.
async fn deliver(
    tx: &mpsc::Sender<Result<OrderEvent, OrderError>>,
    cancel: &CancellationToken,
    item: Result<OrderEvent, OrderError>,
) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = tx.send(item) => sent.is_ok(),
    }
}

/// Lazy, non-restartable sequence of events for one watcher.
pub struct WatchStream {
    rx: mpsc::Receiver<Result<OrderEvent, OrderError>>,
    _cancel_on_drop: tokio_util::sync::DropGuard,
}

impl Stream for WatchStream {
    type Item = Result<OrderEvent, OrderError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests;
