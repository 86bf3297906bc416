//! `GET /health`: database reachability, pool usage and migration level.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use freightdoc_db::{DbPool, MigrationState};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` when the database answers and its schema matches this build,
    /// `degraded` otherwise. The endpoint itself always answers 200.
    pub status: &'static str,
    pub version: &'static str,
    pub database: DatabaseHealth,
    /// Absent when the database could not be queried.
    pub migrations: Option<MigrationHealth>,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub reachable: bool,
    pub pool_size: u32,
    pub idle_connections: usize,
    pub max_connections: u32,
}

#[derive(Debug, Serialize)]
pub struct MigrationHealth {
    #[serde(flatten)]
    pub state: MigrationState,
    pub current: bool,
}

impl DatabaseHealth {
    fn of(pool: &DbPool, reachable: bool) -> Self {
        Self {
            reachable,
            pool_size: pool.size(),
            idle_connections: pool.num_idle(),
            max_connections: pool.options().get_max_connections(),
        }
    }
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let reachable = freightdoc_db::health_check(&state.pool).await.is_ok();

    let migrations = if reachable {
        match freightdoc_db::migration_state(&state.pool).await {
            Ok(state) => Some(MigrationHealth {
                current: state.is_current(),
                state,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read migration state");
                None
            }
        }
    } else {
        None
    };

    let healthy = migrations.as_ref().is_some_and(|m| m.current);
    Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database: DatabaseHealth::of(&state.pool, reachable),
        migrations,
    })
}

/// Mounted at the root, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
