use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    pub cors: CorsConfig,
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. Empty means any origin is accepted.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// How many of a user's most recent logs feed the analytics computation
    pub fetch_limit: i64,
    /// Lookback window used when the request does not name one
    pub default_days: u32,
    /// Largest lookback window accepted over HTTP and by the admin CLI
    pub max_days: u32,
}

impl AnalyticsConfig {
    /// Resolve a requested lookback window, falling back to `default_days`.
    pub fn window_days(&self, requested: Option<u32>) -> anyhow::Result<u32> {
        let days = requested.unwrap_or(self.default_days);
        anyhow::ensure!(
            (1..=self.max_days).contains(&days),
            "days must be between 1 and {}",
            self.max_days
        );
        Ok(days)
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            fetch_limit: 1000,
            default_days: 30,
            max_days: 3650,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let backend_str = var("DATABASE_BACKEND", "sqlite");
        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            "sqlite" => DatabaseBackend::Sqlite,
            other => {
                tracing::warn!(
                    "Unknown DATABASE_BACKEND '{other}', falling back to 'sqlite'. Supported values: sqlite, postgres"
                );
                DatabaseBackend::Sqlite
            }
        };

        let database_url = var("DATABASE_URL", "sqlite://./engagement.db");
        let max_connections = var("DATABASE_MAX_CONNECTIONS", "20")
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let api_host = var("API_HOST", "127.0.0.1");
        let api_port = var("API_PORT", "3001")
            .parse::<u16>()
            .context("API_PORT must be a valid port number")?;

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let defaults = AnalyticsConfig::default();
        let fetch_limit = match lookup("ANALYTICS_FETCH_LIMIT") {
            Some(v) => v
                .parse::<i64>()
                .context("ANALYTICS_FETCH_LIMIT must be an integer")?,
            None => defaults.fetch_limit,
        };
        let default_days = match lookup("ANALYTICS_DEFAULT_DAYS") {
            Some(v) => v
                .parse::<u32>()
                .context("ANALYTICS_DEFAULT_DAYS must be a positive integer")?,
            None => defaults.default_days,
        };
        let max_days = match lookup("ANALYTICS_MAX_DAYS") {
            Some(v) => v
                .parse::<u32>()
                .context("ANALYTICS_MAX_DAYS must be a positive integer")?,
            None => defaults.max_days,
        };

        anyhow::ensure!(fetch_limit > 0, "ANALYTICS_FETCH_LIMIT must be greater than 0");
        anyhow::ensure!(
            default_days >= 1 && default_days <= max_days,
            "ANALYTICS_DEFAULT_DAYS must be between 1 and ANALYTICS_MAX_DAYS"
        );

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            cors: CorsConfig { allowed_origins },
            analytics: AnalyticsConfig {
                fetch_limit,
                default_days,
                max_days,
            },
        })
    }
}
