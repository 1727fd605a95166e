use axum::{
    extract::State, http::StatusCode, response::IntoResponse, response::Response, routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    arguments::is_debug_webserver_enabled,
    jar::types::AnalyticsSummary,
    logger::{log, LogTag},
    webserver::state::AppState,
};

/// Create analytics routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/analytics", get(get_analytics))
}

/// GET /api/analytics
///
/// `configured` is reported at the top level on every branch, including
/// failures: a missing credential is a supported deployment, not an error,
/// and clients render the two cases differently.
async fn get_analytics(State(state): State<Arc<AppState>>) -> Response {
    if is_debug_webserver_enabled() {
        log(LogTag::Webserver, "DEBUG", "Analytics summary requested");
    }

    if !state.analytics.is_configured() {
        return (StatusCode::OK, Json(success_body(false, None))).into_response();
    }

    match state.analytics.fetch_summary(false).await {
        Some(summary) => (StatusCode::OK, Json(success_body(true, Some(&summary)))).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(failure_body(
                true,
                "analytics_unavailable",
                "Analytics source is configured but returned no data",
            )),
        )
            .into_response(),
    }
}

fn success_body(configured: bool, summary: Option<&AnalyticsSummary>) -> Value {
    json!({
        "success": true,
        "configured": configured,
        "data": summary,
        "error": null,
        "timestamp": chrono::Utc::now(),
    })
}

fn failure_body(configured: bool, code: &str, message: &str) -> Value {
    json!({
        "success": false,
        "configured": configured,
        "data": null,
        "error": {
            "code": code,
            "message": message,
        },
        "timestamp": chrono::Utc::now(),
    })
}
