use crate::webserver::state::AppState;
use axum::Router;
use std::sync::Arc;

pub mod analytics;
pub mod snapshot;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new().nest("/api", api_routes()).with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(snapshot::routes())
        .merge(analytics::routes())
}
