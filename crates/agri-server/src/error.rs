//! HTTP mapping for domain errors. Status codes come from
//! `AgriError::http_status`; internal details are logged, never leaked.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use agri_core::AgriError;

pub struct AppError(pub AgriError);

impl From<AgriError> for AppError {
    fn from(err: AgriError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = match &self.0 {
            AgriError::Validation(fields) => json!({
                "message": "validation failed",
                "errors": fields,
            }),
            AgriError::Internal(e) => {
                tracing::error!("internal error: {:#}", e);
                json!({ "message": "internal server error" })
            }
            other => json!({ "message": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
