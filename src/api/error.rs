use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::domain::order::OrderError;

// ============================================================================
// HTTP Error Mapping
// ============================================================================
//
// NotFound -> 404, Validation/InvalidTransition -> 400,
// ConcurrentModification -> 409, Unavailable -> 503, anything else -> 500.
// Internal details are logged, never returned.
//
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Malformed request that never reached the orchestrator.
    #[error("{message}")]
    BadRequest { code: &'static str, message: String },
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code,
            message: message.into(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Order(e) => e.code(),
            ApiError::BadRequest { code, .. } => code,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Order(e) => match e {
                OrderError::Validation(_) | OrderError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
                OrderError::NotFound(_) => StatusCode::NOT_FOUND,
                OrderError::ConcurrentModification(_) => StatusCode::CONFLICT,
                OrderError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                OrderError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "❌ Request failed with internal error");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(ErrorBody {
            error,
            code: self.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderStatus, ValidationError};
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (OrderError::NotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (OrderError::Validation(ValidationError::NoItems), StatusCode::BAD_REQUEST),
            (
                OrderError::InvalidTransition {
                    from: OrderStatus::Confirmed,
                    to: OrderStatus::Shipped,
                },
                StatusCode::BAD_REQUEST,
            ),
            (OrderError::ConcurrentModification(Uuid::nil()), StatusCode::CONFLICT),
            (OrderError::Unavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (
                OrderError::Internal(anyhow::anyhow!("disk on fire")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code(), expected);
        }
    }

    #[actix_web::test]
    async fn test_internal_details_are_not_leaked() {
        let response = ApiError::from(OrderError::Internal(anyhow::anyhow!("password=hunter2"))).error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["code"], "INTERNAL_ERROR");
        assert_eq!(value["error"], "internal server error");
    }
}
