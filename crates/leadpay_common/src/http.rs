use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::{HttpStatusCode, LeadpayError};

pub mod client;

/// Extension trait for LeadpayError to convert it to an Axum HTTP response.
pub trait IntoHttpResponse {
    /// Converts the error into an Axum HTTP response.
    fn into_http_response(self) -> Response;
}

impl IntoHttpResponse for LeadpayError {
    fn into_http_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // The web client reads `error` as a plain string.
        let body = Json(json!({ "error": self.to_string() }));

        (status_code, body).into_response()
    }
}

impl IntoResponse for LeadpayError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}
