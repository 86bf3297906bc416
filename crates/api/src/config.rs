use freightdoc_pipeline::EmptyShipmentPolicy;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// `DATABASE_URL` is read separately by the binary and has no default.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `60`). Large batches are
    /// processed inside a single request.
    pub request_timeout_secs: u64,
    /// Maximum pool size (default: `20`).
    pub db_max_connections: u32,
    /// What to do with a manifest whose invoices all failed (default: `commit`).
    pub empty_shipment_policy: EmptyShipmentPolicy,
    /// Timeout for downloading a prefat file, in seconds (default: `30`).
    pub prefat_fetch_timeout_secs: u64,
    /// Largest prefat file accepted, in bytes (default: 10 MiB).
    pub prefat_max_bytes: usize,
}

/// Default cap on a downloaded prefat file.
pub const DEFAULT_PREFAT_MAX_BYTES: usize = 10 * 1024 * 1024;

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `3000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `60`                       |
    /// | `DB_MAX_CONNECTIONS`    | `20`                       |
    /// | `EMPTY_SHIPMENT_POLICY` | `commit`                   |
    /// | `PREFAT_FETCH_TIMEOUT_SECS` | `30`                   |
    /// | `PREFAT_MAX_BYTES`      | `10485760`                 |
    ///
    /// Panics on malformed values so a bad deployment fails at startup.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());

        let port: u16 = lookup("PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = lookup("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "60".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let db_max_connections: u32 = lookup("DB_MAX_CONNECTIONS")
            .map(|raw| {
                raw.parse()
                    .expect("DB_MAX_CONNECTIONS must be a valid u32")
            })
            .unwrap_or(freightdoc_db::DEFAULT_MAX_CONNECTIONS);

        let empty_shipment_policy = lookup("EMPTY_SHIPMENT_POLICY")
            .map(|raw| {
                raw.parse::<EmptyShipmentPolicy>()
                    .unwrap_or_else(|err| panic!("EMPTY_SHIPMENT_POLICY: {err}"))
            })
            .unwrap_or_default();

        let prefat_fetch_timeout_secs: u64 = lookup("PREFAT_FETCH_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .expect("PREFAT_FETCH_TIMEOUT_SECS must be a valid u64");

        let prefat_max_bytes: usize = lookup("PREFAT_MAX_BYTES")
            .map(|raw| raw.parse().expect("PREFAT_MAX_BYTES must be a valid usize"))
            .unwrap_or(DEFAULT_PREFAT_MAX_BYTES);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            db_max_connections,
            empty_shipment_policy,
            prefat_fetch_timeout_secs,
            prefat_max_bytes,
        }
    }
}
