use std::time::Duration;

/// Server configuration loaded from environment variables.
///
/// Defaults match the local development setup of the browser client.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Time allowed for in-flight jobs to drain on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Maximum accepted upload body size in bytes (default: `100000000`).
    pub max_upload_bytes: usize,
    /// Number of jobs allowed to run concurrently (default: `8`).
    pub job_workers: usize,
    /// Simulated processing time per job in milliseconds (default: `5000`).
    pub job_simulated_latency_ms: u64,
    /// Scene broadcast period in milliseconds (default: `50`).
    pub scene_tick_ms: u64,
    /// WebSocket ping interval in seconds (default: `30`).
    pub heartbeat_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                                       |
    /// |----------------------------|-----------------------------------------------|
    /// | `HOST`                     | `0.0.0.0`                                     |
    /// | `PORT`                     | `5000`                                        |
    /// | `CORS_ORIGINS`             | `http://localhost:8080,http://localhost:4200` |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                                          |
    /// | `SHUTDOWN_TIMEOUT_SECS`    | `30`                                          |
    /// | `MAX_UPLOAD_BYTES`         | `100000000`                                   |
    /// | `JOB_WORKERS`              | `8`                                           |
    /// | `JOB_SIMULATED_LATENCY_MS` | `5000`                                        |
    /// | `SCENE_TICK_MS`            | `50`                                          |
    /// | `HEARTBEAT_INTERVAL_SECS`  | `30`                                          |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:8080,http://localhost:4200".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host,
            port: env_or("PORT", 5000),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 30),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", 100_000_000),
            job_workers: env_or(
                "JOB_WORKERS",
                hyperspace_core::executor::DEFAULT_MAX_CONCURRENT_JOBS,
            ),
            job_simulated_latency_ms: env_or("JOB_SIMULATED_LATENCY_MS", 5000),
            scene_tick_ms: nonzero_env_or("SCENE_TICK_MS", 50),
            heartbeat_interval_secs: nonzero_env_or("HEARTBEAT_INTERVAL_SECS", 30),
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn job_simulated_latency(&self) -> Duration {
        Duration::from_millis(self.job_simulated_latency_ms)
    }

    pub fn scene_tick(&self) -> Duration {
        Duration::from_millis(self.scene_tick_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

/// Read and parse `key`, falling back to `default` when unset.
///
/// Panics if the variable is set but unparseable: misconfiguration should
/// fail at startup.
fn env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid value: {e}")),
        Err(_) => default,
    }
}

/// [`env_or`] for tick periods, which must be non-zero.
fn nonzero_env_or(key: &str, default: u64) -> u64 {
    require_nonzero(key, env_or(key, default))
}

fn require_nonzero(key: &str, value: u64) -> u64 {
    if value == 0 {
        panic!("{key} must be greater than zero");
    }
    value
}
