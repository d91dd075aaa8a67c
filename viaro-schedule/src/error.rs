use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use viaro_domain::error::ServiceError;

/// API-facing error: the shared taxonomy plus the HTTP-only identity
/// rejections that the domain deliberately does not model.
#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    Unauthenticated(String),
    Forbidden(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Service(err) => {
                let status = match &err {
                    ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                    ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                    ServiceError::Capacity { .. } | ServiceError::Conflict(_) => StatusCode::CONFLICT,
                    ServiceError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    ServiceError::ReconciliationRequired(_) => {
                        tracing::error!(reconciliation = true, "{err}");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.code(), err.to_string())
            }
            ApiError::Unauthenticated(message) => (StatusCode::UNAUTHORIZED, "unauthenticated", message),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, "forbidden", message),
        };

        let body = Json(json!({
            "error": code,
            "message": message,
        }));
        (status, body).into_response()
    }
}
