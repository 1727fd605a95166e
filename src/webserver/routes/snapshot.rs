use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    arguments::is_debug_webserver_enabled,
    jar::types::{CacheStatus, ProfitabilitySnapshot},
    logger::{log, LogTag},
    webserver::{
        state::AppState,
        utils::{error_response, success_response},
    },
};

/// Snapshot query parameters
#[derive(Debug, Deserialize)]
pub struct SnapshotQuery {
    /// Bypass the cache and force a synchronous live run
    #[serde(default)]
    pub refresh: bool,
}

/// Snapshot payload: the verdict plus serving metadata
#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    #[serde(flatten)]
    pub snapshot: ProfitabilitySnapshot,
    pub data_source: &'static str,
    pub data_source_type: &'static str,
    pub cache_status: CacheStatus,
    pub data_age_seconds: i64,
}

/// Create snapshot routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/snapshot", get(get_snapshot))
}

/// GET /api/snapshot?refresh=<bool>
async fn get_snapshot(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SnapshotQuery>,
) -> Response {
    if is_debug_webserver_enabled() {
        log(
            LogTag::Webserver,
            "DEBUG",
            &format!("Snapshot requested (refresh={})", query.refresh),
        );
    }

    match state.snapshots.get_snapshot(query.refresh).await {
        Ok(served) => {
            let provenance = served.snapshot.provenance;
            success_response(SnapshotResponse {
                snapshot: served.snapshot,
                data_source: provenance.source_label(),
                data_source_type: provenance.as_str(),
                cache_status: served.cache_status,
                data_age_seconds: served.data_age_seconds,
            })
        }
        Err(e) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "snapshot_unavailable",
            &format!("No snapshot available: {}", e),
        ),
    }
}
