use serde::Serialize;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// Default pool size when none is configured.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Migrations embedded at build time.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded SQL migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Applied migrations compared with the ones embedded in this build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationState {
    pub applied: i64,
    pub latest_applied: Option<i64>,
    pub latest_embedded: Option<i64>,
}

impl MigrationState {
    /// The newest embedded migration has been applied.
    pub fn is_current(&self) -> bool {
        self.latest_applied == self.latest_embedded
    }
}

/// Read the migration bookkeeping table.
pub async fn migration_state(pool: &DbPool) -> Result<MigrationState, sqlx::Error> {
    let (applied, latest_applied): (i64, Option<i64>) =
        sqlx::query_as("SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success")
            .fetch_one(pool)
            .await?;
    Ok(MigrationState {
        applied,
        latest_applied,
        latest_embedded: MIGRATOR.iter().map(|m| m.version).max(),
    })
}
