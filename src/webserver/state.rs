/// Shared application state for the webserver
///
/// Holds the snapshot service and the analytics source so route handlers can
/// serve cached data without owning any pipeline wiring themselves.
use crate::config::WebserverConfig;
use crate::jar::aggregator::Aggregator;
use crate::jar::service::SnapshotService;
use crate::sources::dune::AnalyticsSource;
use std::sync::Arc;

/// Shared application state passed to all route handlers
#[derive(Clone)]
pub struct AppState {
    /// Webserver configuration
    pub config: Arc<WebserverConfig>,

    /// Cache-fronted snapshot service
    pub snapshots: Arc<SnapshotService<Aggregator>>,

    /// Analytics source, queried directly by the analytics endpoint
    pub analytics: Arc<AnalyticsSource>,
}

impl AppState {
    pub fn new(
        config: WebserverConfig,
        snapshots: Arc<SnapshotService<Aggregator>>,
        analytics: Arc<AnalyticsSource>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            snapshots,
            analytics,
        }
    }
}
