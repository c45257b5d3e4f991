use actix_web::{web, HttpResponse};

use super::AppState;

/// Liveness: the process is up and serving.
pub async fn healthz(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": state.readiness.version(),
    }))
}

/// Readiness: 503 when a required dependency is down.
pub async fn readyz(state: web::Data<AppState>) -> HttpResponse {
    let report = state.readiness.report().await;

    if report.status.is_unhealthy() {
        HttpResponse::ServiceUnavailable().json(report)
    } else {
        HttpResponse::Ok().json(report)
    }
}
