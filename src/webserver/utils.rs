/// Shared response helpers for API routes
///
/// Every JSON endpoint answers with the same envelope so clients can branch
/// on `success` without inspecting status codes first.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

/// Wrap a payload in the standard success envelope
pub fn success_response<T: Serialize>(data: T) -> Response {
    let body = json!({
        "success": true,
        "data": data,
        "error": null,
        "timestamp": chrono::Utc::now(),
    });

    (StatusCode::OK, Json(body)).into_response()
}

/// Wrap an error in the standard failure envelope
pub fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = json!({
        "success": false,
        "data": null,
        "error": {
            "code": code,
            "message": message,
        },
        "timestamp": chrono::Utc::now(),
    });

    (status, Json(body)).into_response()
}
