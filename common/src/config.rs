//! Application configuration.
//!
//! Everything is read from environment variables. An optional `.env` file in the
//! working directory is loaded first; variables already present in the process
//! environment take precedence over it.

use std::str::FromStr;

use crate::errors::{AppError, AppResult};
use crate::models::connection::{ConnectionConfig, DbType, DocumentStoreConfig};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PREVIEW_TABLES: &str = "Customers,Orders,Shippings";
const DEFAULT_PREVIEW_ROW_LIMIT: u32 = 10;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Service name used in logs and health responses.
    pub service_name: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Relational database connection.
    pub database: ConnectionConfig,
    /// Document store connection, when configured.
    pub document_store: Option<DocumentStoreConfig>,
    /// Maximum pooled connections.
    pub max_connections: u32,
    /// Pool acquire timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Table preview settings.
    pub preview: PreviewConfig,
}

/// Table preview settings.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Allow-listed table names, in display order.
    pub tables: Vec<String>,
    /// Maximum rows returned by a preview.
    pub row_limit: u32,
}

impl AppConfig {
    /// Loads `.env` and then the configuration from the process environment.
    pub fn load_with_service(service_name: &str) -> AppResult<Self> {
        load_dotenv();
        Self::from_lookup(service_name, |key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(service_name: &str, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database = connection_from_lookup(&get)?;

        let document_store = get("MONGO_URL").map(|uri| DocumentStoreConfig {
            uri,
            database: get("MONGO_DATABASE"),
        });

        let tables: Vec<String> = get("PREVIEW_TABLES")
            .unwrap_or_else(|| DEFAULT_PREVIEW_TABLES.to_string())
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        if tables.is_empty() {
            return Err(AppError::Config("PREVIEW_TABLES must name at least one table".into()));
        }

        let row_limit = parse_var(&get, "PREVIEW_ROW_LIMIT", DEFAULT_PREVIEW_ROW_LIMIT)?;
        if row_limit == 0 {
            return Err(AppError::Config("PREVIEW_ROW_LIMIT must be at least 1".into()));
        }

        Ok(Self {
            service_name: service_name.to_string(),
            host: get("SERVER_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_var(&get, "SERVER_PORT", DEFAULT_PORT)?,
            database,
            document_store,
            max_connections: parse_var(&get, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            connect_timeout_secs: parse_var(
                &get,
                "DB_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )?,
            preview: PreviewConfig { tables, row_limit },
        })
    }

    /// `host:port` the server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn connection_from_lookup<G>(get: &G) -> AppResult<ConnectionConfig>
where
    G: Fn(&str) -> Option<String>,
{
    let url = get("DATABASE_URL");
    let db_type = match (get("DB_TYPE"), url.as_deref().and_then(DbType::from_url)) {
        (Some(explicit), _) => explicit.parse::<DbType>().map_err(AppError::Config)?,
        (None, Some(inferred)) => inferred,
        (None, None) => DbType::MySQL,
    };

    let config = ConnectionConfig {
        db_type,
        url,
        host: get("DB_HOST"),
        port: get("DB_PORT")
            .map(|v| v.parse::<u16>())
            .transpose()
            .map_err(|_| AppError::Config("DB_PORT must be a port number".into()))?,
        username: get("DB_USER"),
        password: get("DB_PASSWORD"),
        database: get("DB_NAME"),
        file_path: get("DB_FILE"),
        require_tls: parse_var(get, "DB_TLS", true)?,
    };

    if config.url.is_none() {
        match config.db_type {
            DbType::MySQL | DbType::Postgres if config.host.is_none() => {
                return Err(AppError::Config(format!(
                    "{} requires DB_HOST or DATABASE_URL",
                    config.db_type
                )));
            }
            DbType::SQLite if config.file_path.is_none() => {
                return Err(AppError::Config(
                    "sqlite requires DB_FILE or DATABASE_URL".into(),
                ));
            }
            _ => {}
        }
    }

    Ok(config)
}

fn parse_var<G, T>(get: &G, key: &str, default: T) -> AppResult<T>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::Config(format!("invalid value for {}: {}", key, raw))),
        None => Ok(default),
    }
}

/// Load `.env` file from the working directory (best-effort, no error if missing).
pub fn load_dotenv() {
    let env_path = std::path::Path::new(".env");
    let Ok(content) = std::fs::read_to_string(env_path) else {
        return;
    };
    for (key, value) in parse_dotenv(&content) {
        // Only set if not already set by the environment
        if std::env::var(&key).is_err() {
            std::env::set_var(key, value);
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}
