//! Connection configuration models.
//!
//! Describes how the gateway reaches its relational database and document store.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Relational database type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// MySQL / TiDB / MariaDB.
    MySQL,
    /// PostgreSQL database.
    Postgres,
    /// SQLite database.
    SQLite,
}

impl DbType {
    /// Returns the default port for this database type.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            DbType::MySQL => Some(3306),
            DbType::Postgres => Some(5432),
            DbType::SQLite => None,
        }
    }

    /// Infers the database type from a connection URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next()?.to_ascii_lowercase();
        match scheme.as_str() {
            "mysql" | "mariadb" => Some(DbType::MySQL),
            "postgres" | "postgresql" => Some(DbType::Postgres),
            "sqlite" => Some(DbType::SQLite),
            _ => None,
        }
    }
}

impl FromStr for DbType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "tidb" | "mariadb" => Ok(DbType::MySQL),
            "postgres" | "postgresql" | "pg" => Ok(DbType::Postgres),
            "sqlite" => Ok(DbType::SQLite),
            other => Err(format!("unsupported database type: {}", other)),
        }
    }
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::MySQL => write!(f, "mysql"),
            DbType::Postgres => write!(f, "postgres"),
            DbType::SQLite => write!(f, "sqlite"),
        }
    }
}

/// Relational database connection settings.
///
/// Either `url` is set (and wins), or the discrete fields describe the server.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database type.
    pub db_type: DbType,
    /// Full connection URL (overrides the discrete fields).
    #[serde(skip_serializing, default)]
    pub url: Option<String>,
    /// Database host (for network databases).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Database port (for network databases).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Database username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Database password (not serialized).
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    /// Default database name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// SQLite file path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Whether a verified TLS connection is required.
    pub require_tls: bool,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("db_type", &self.db_type)
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("file_path", &self.file_path)
            .field("require_tls", &self.require_tls)
            .finish()
    }
}

impl ConnectionConfig {
    /// Port to connect to, falling back to the type's default.
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| self.db_type.default_port())
    }

    /// Short `type://host:port/db` description without credentials, for logs.
    pub fn describe(&self) -> String {
        if self.url.is_some() {
            return format!("{} (url)", self.db_type);
        }
        match self.db_type {
            DbType::SQLite => format!(
                "sqlite:{}",
                self.file_path.as_deref().unwrap_or(":memory:")
            ),
            _ => format!(
                "{}://{}:{}/{}",
                self.db_type,
                self.host.as_deref().unwrap_or("?"),
                self.effective_port().unwrap_or_default(),
                self.database.as_deref().unwrap_or("")
            ),
        }
    }
}

/// Document store (MongoDB) connection settings.
#[derive(Clone)]
pub struct DocumentStoreConfig {
    /// Connection string.
    pub uri: String,
    /// Database name; falls back to the URI's default database.
    pub database: Option<String>,
}

impl std::fmt::Debug for DocumentStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStoreConfig")
            .field("uri", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}
