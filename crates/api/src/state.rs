use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::fetch::FileFetcher;

/// Shared application state available to all handlers via axum's `State` extractor.
///
/// Holds only shareable handles. Per-request resources such as the ingestion
/// store are built inside the handler that needs them.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: freightdoc_db::DbPool,
    /// Server configuration (read-only after startup).
    pub config: Arc<ServerConfig>,
    /// Downloads prefat files referenced by URL.
    pub fetcher: FileFetcher,
    /// Cancelled when the server starts shutting down. Batches in flight stop
    /// before their next manifest.
    pub shutdown: CancellationToken,
}
