use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long background workers get to stop after the server does
    /// (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT validation settings.
    pub jwt: JwtConfig,
    /// Which generation scheduler backend to run.
    pub scheduler: SchedulerConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            scheduler: SchedulerConfig::from_env(),
        }
    }
}

/// Where scheduled generation tasks live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerBackend {
    /// Durable `generation_tasks` table drained by a polling dispatcher.
    Postgres,
    /// In-process channel; pending tasks are lost on restart.
    Tokio,
}

/// Generation scheduler settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub backend: SchedulerBackend,
    /// Dispatcher poll interval for the Postgres backend.
    pub poll_interval_ms: u64,
    /// Tasks claimed per poll for the Postgres backend.
    pub batch_size: i64,
}

impl SchedulerConfig {
    /// Load scheduler settings from environment variables.
    ///
    /// | Env Var                  | Default    |
    /// |--------------------------|------------|
    /// | `SCHEDULER_BACKEND`      | `postgres` |
    /// | `SCHEDULER_POLL_MS`      | `1000`     |
    /// | `SCHEDULER_BATCH_SIZE`   | `8`        |
    ///
    /// # Panics
    ///
    /// Panics on an unknown backend name, unparsable numbers, or a zero poll
    /// interval.
    pub fn from_env() -> Self {
        let backend = match std::env::var("SCHEDULER_BACKEND")
            .unwrap_or_else(|_| "postgres".into())
            .to_ascii_lowercase()
            .as_str()
        {
            "postgres" => SchedulerBackend::Postgres,
            "tokio" => SchedulerBackend::Tokio,
            other => panic!("SCHEDULER_BACKEND must be 'postgres' or 'tokio', got '{other}'"),
        };

        let poll_interval_ms: u64 = std::env::var("SCHEDULER_POLL_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("SCHEDULER_POLL_MS must be a valid u64");
        assert!(poll_interval_ms > 0, "SCHEDULER_POLL_MS must be greater than 0");

        let batch_size: i64 = std::env::var("SCHEDULER_BATCH_SIZE")
            .unwrap_or_else(|_| "8".into())
            .parse()
            .expect("SCHEDULER_BATCH_SIZE must be a valid i64");

        Self {
            backend,
            poll_interval_ms,
            batch_size,
        }
    }
}
