// ============================================================================
// REST Adapter - decodes HTTP into orchestrator calls and back
// ============================================================================
//
// Routes:
//   POST   /api/v1/orders               create
//   GET    /api/v1/orders               list (page, page_size, status, customer_id)
//   GET    /api/v1/orders/watch         NDJSON change feed (statuses=a,b)
//   GET    /api/v1/orders/{id}          get
//   PUT    /api/v1/orders/{id}          partial update (items, status)
//   PATCH  /api/v1/orders/{id}/status   status transition
//   DELETE /api/v1/orders/{id}          soft delete
//   GET    /healthz, /readyz            liveness / readiness
//
// Every route runs behind `logging::log_request`, which tags the request
// with an `x-request-id` and writes one access log line per request.
//
// ============================================================================

mod error;
mod logging;
mod orders;
mod probes;
mod watch;

pub use error::{ApiError, ErrorBody};
pub use logging::REQUEST_ID_HEADER;

use std::sync::Arc;

use actix_web::{error::JsonPayloadError, middleware, web, App, HttpRequest, HttpServer};

use crate::change_feed::ChangeFeed;
use crate::health::Readiness;
use crate::orchestrator::OrderOrchestrator;

pub struct AppState {
    pub orchestrator: OrderOrchestrator,
    pub change_feed: Arc<ChangeFeed>,
    pub readiness: Readiness,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .service(
            web::scope("")
                .wrap(middleware::from_fn(logging::log_request))
                .route("/healthz", web::get().to(probes::healthz))
                .route("/readyz", web::get().to(probes::readyz))
                .service(
                    web::scope("/api/v1/orders")
                        .route("", web::post().to(orders::create_order))
                        .route("", web::get().to(orders::list_orders))
                        // Before /{id} so "watch" is not taken for an id
                        .route("/watch", web::get().to(watch::watch_orders))
                        .route("/{id}", web::get().to(orders::get_order))
                        .route("/{id}", web::put().to(orders::update_order))
                        .route("/{id}", web::delete().to(orders::delete_order))
                        .route("/{id}/status", web::patch().to(orders::update_order_status)),
                ),
        );
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::bad_request("INVALID_REQUEST", err.to_string()).into()
}

pub async fn start_api_server(state: web::Data<AppState>, port: u16) -> std::io::Result<()> {
    tracing::info!("🚀 Starting order API on http://0.0.0.0:{}", port);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}
