use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
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
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Flow script runner configuration.
    pub runner: RunnerConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `5000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".into())
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
            runner: RunnerConfig::from_env(),
        }
    }
}

/// Configuration for the external flow script runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Path to the automation script invoked for every run.
    pub script_path: String,
    /// Python interpreter used to run the script (default: `python3`).
    pub python_bin: String,
    /// Directory where uploaded data files are stored (default: `uploads`).
    pub upload_dir: String,
    /// Maximum wall-clock seconds a run may take (default: `1800`).
    pub run_timeout_secs: u64,
}

impl RunnerConfig {
    /// Load runner configuration from environment variables.
    ///
    /// | Env Var            | Required | Default   |
    /// |--------------------|----------|-----------|
    /// | `FLOW_SCRIPT_PATH` | **yes**  | --        |
    /// | `PYTHON_BIN`       | no       | `python3` |
    /// | `UPLOAD_DIR`       | no       | `uploads` |
    /// | `RUN_TIMEOUT_SECS` | no       | `1800`    |
    ///
    /// # Panics
    ///
    /// Panics if `FLOW_SCRIPT_PATH` is not set or is empty.
    pub fn from_env() -> Self {
        let script_path = std::env::var("FLOW_SCRIPT_PATH")
            .expect("FLOW_SCRIPT_PATH must be set in the environment");
        assert!(!script_path.is_empty(), "FLOW_SCRIPT_PATH must not be empty");

        let python_bin = std::env::var("PYTHON_BIN").unwrap_or_else(|_| "python3".into());

        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into());

        let run_timeout_secs: u64 = std::env::var("RUN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "1800".into())
            .parse()
            .expect("RUN_TIMEOUT_SECS must be a valid u64");

        Self {
            script_path,
            python_bin,
            upload_dir,
            run_timeout_secs,
        }
    }
}
