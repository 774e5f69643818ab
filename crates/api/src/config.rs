use wfb_core::crypto::EncryptionKey;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). Also bounds manual runs.
    pub request_timeout_secs: u64,
    /// How long background tasks get to stop after shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Tick interval of the schedule trigger in seconds (default: `60`).
    pub scheduler_interval_secs: u64,
    /// Maximum database pool size (default: `10`).
    pub db_max_connections: u32,
    /// Session token validation.
    pub jwt: JwtConfig,
    /// Key for integration secrets at rest.
    pub encryption_key: EncryptionKey,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                    |
    /// |------------------------------|----------------------------|
    /// | `HOST`                       | `0.0.0.0`                  |
    /// | `PORT`                       | `3000`                     |
    /// | `CORS_ORIGINS`               | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`      | `30`                       |
    /// | `SCHEDULER_INTERVAL_SECS`    | `60`                       |
    /// | `DB_MAX_CONNECTIONS`         | `10`                       |
    /// | `JWT_SECRET`                 | required                   |
    /// | `INTEGRATION_ENCRYPTION_KEY` | all-zero key (dev only)    |
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

        let scheduler_interval_secs: u64 = std::env::var("SCHEDULER_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("SCHEDULER_INTERVAL_SECS must be a valid u64");

        let db_max_connections: u32 = std::env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("DB_MAX_CONNECTIONS must be a valid u32");

        let jwt = JwtConfig::from_env();

        let encryption_key = match std::env::var("INTEGRATION_ENCRYPTION_KEY") {
            Ok(hex) if !hex.trim().is_empty() => EncryptionKey::from_hex(hex.trim())
                .expect("INTEGRATION_ENCRYPTION_KEY must be 64 hex characters"),
            _ => {
                tracing::warn!(
                    "INTEGRATION_ENCRYPTION_KEY is not set, using the insecure development key"
                );
                EncryptionKey::insecure_default()
            }
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            scheduler_interval_secs,
            db_max_connections,
            jwt,
            encryption_key,
        }
    }
}
