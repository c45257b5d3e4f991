use std::convert::Infallible;

use actix_web::web::{self, Bytes};
use actix_web::HttpResponse;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::orders::parse_status;
use super::{ApiError, AppState, ErrorBody};
use crate::domain::order::{OrderError, OrderEvent};

#[derive(Debug, Default, Deserialize)]
pub struct WatchQuery {
    /// Comma-separated statuses; empty means every event.
    pub statuses: Option<String>,
}

/// Stream matching events as newline-delimited JSON until the client hangs up.
///
/// A client disconnect drops the body stream, which cancels the session.
pub async fn watch_orders(state: web::Data<AppState>, query: web::Query<WatchQuery>) -> Result<HttpResponse, ApiError> {
    let statuses = query
        .statuses
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(parse_status)
        .collect::<Result<Vec<_>, _>>()?;

    let stream = state.change_feed.watch(&statuses, CancellationToken::new()).await?;
    let body = stream.map(|item| Ok::<_, Infallible>(encode_line(item)));

    Ok(HttpResponse::Ok()
        .content_type("application/x-ndjson")
        .streaming(body))
}

fn encode_line(item: Result<OrderEvent, OrderError>) -> Bytes {
    let encoded = match &item {
        Ok(event) => serde_json::to_vec(event),
        Err(e) => serde_json::to_vec(&ErrorBody {
            error: e.to_string(),
            code: e.code(),
        }),
    };

    let mut line = encoded.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to encode watch record");
        br#"{"error":"encoding failed","code":"INTERNAL_ERROR"}"#.to_vec()
    });
    line.push(b'\n');
    Bytes::from(line)
}
