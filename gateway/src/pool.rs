//! Relational database pool.
//!
//! One pool per gateway process, of whichever driver the configuration names.
//! Statements are sent with `raw_sql`, i.e. unprepared and without parameter
//! binding, so the database sees exactly the text the user typed.

use std::str::FromStr;
use std::time::{Duration, Instant};

use common::models::connection::{ConnectionConfig, DbType};
use common::models::query::{affected_rows_result, ResultSet, Row};
use common::utils::StatementKind;
use futures::{Stream, TryStreamExt};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions, MySqlSslMode};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Either, MySqlPool, PgPool, SqlitePool};

use crate::convert;

/// Connection pool wrapper for the supported relational databases.
#[derive(Clone)]
pub enum DatabasePool {
    /// MySQL / TiDB / MariaDB connection pool.
    MySQL(MySqlPool),
    /// PostgreSQL connection pool.
    Postgres(PgPool),
    /// SQLite connection pool.
    SQLite(SqlitePool),
}

/// Pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
}

impl DatabasePool {
    /// Opens a pool for `config`.
    ///
    /// For MySQL and PostgreSQL a `DATABASE_URL` keeps its own TLS parameters;
    /// discrete settings get certificate and host verification when
    /// `require_tls` is set, and opportunistic TLS otherwise.
    pub async fn connect(
        config: &ConnectionConfig,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, sqlx::Error> {
        match config.db_type {
            DbType::MySQL => {
                let options = match &config.url {
                    Some(url) => MySqlConnectOptions::from_str(url)?,
                    None => {
                        let mut options = MySqlConnectOptions::new()
                            .host(config.host.as_deref().unwrap_or("localhost"))
                            .port(config.effective_port().unwrap_or(4000));
                        if let Some(username) = &config.username {
                            options = options.username(username);
                        }
                        if let Some(password) = &config.password {
                            options = options.password(password);
                        }
                        if let Some(database) = &config.database {
                            options = options.database(database);
                        }
                        options.ssl_mode(if config.require_tls {
                            MySqlSslMode::VerifyIdentity
                        } else {
                            MySqlSslMode::Preferred
                        })
                    }
                };
                let pool = MySqlPoolOptions::new()
                    .max_connections(max_connections)
                    .acquire_timeout(acquire_timeout)
                    .connect_with(options)
                    .await?;
                Ok(DatabasePool::MySQL(pool))
            }
            DbType::Postgres => {
                let options = match &config.url {
                    Some(url) => PgConnectOptions::from_str(url)?,
                    None => {
                        let mut options = PgConnectOptions::new()
                            .host(config.host.as_deref().unwrap_or("localhost"))
                            .port(config.effective_port().unwrap_or(5432));
                        if let Some(username) = &config.username {
                            options = options.username(username);
                        }
                        if let Some(password) = &config.password {
                            options = options.password(password);
                        }
                        if let Some(database) = &config.database {
                            options = options.database(database);
                        }
                        options.ssl_mode(if config.require_tls {
                            PgSslMode::VerifyFull
                        } else {
                            PgSslMode::Prefer
                        })
                    }
                };
                let pool = PgPoolOptions::new()
                    .max_connections(max_connections)
                    .acquire_timeout(acquire_timeout)
                    .connect_with(options)
                    .await?;
                Ok(DatabasePool::Postgres(pool))
            }
            DbType::SQLite => {
                let options = match (&config.url, &config.file_path) {
                    (Some(url), _) => SqliteConnectOptions::from_str(url)?,
                    (None, Some(path)) => SqliteConnectOptions::new()
                        .filename(path)
                        .create_if_missing(true),
                    (None, None) => SqliteConnectOptions::from_str("sqlite::memory:")?,
                };
                // A single connection that never expires, so in-memory databases survive.
                let pool = SqlitePoolOptions::new()
                    .max_connections(1)
                    .acquire_timeout(acquire_timeout)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(options)
                    .await?;
                Ok(DatabasePool::SQLite(pool))
            }
        }
    }

    /// Database flavor of this pool.
    pub fn db_type(&self) -> DbType {
        match self {
            DatabasePool::MySQL(_) => DbType::MySQL,
            DatabasePool::Postgres(_) => DbType::Postgres,
            DatabasePool::SQLite(_) => DbType::SQLite,
        }
    }

    /// Quotes an identifier in the pool's dialect.
    pub fn quote_identifier(&self, ident: &str) -> String {
        match self {
            DatabasePool::MySQL(_) => format!("`{}`", ident.replace('`', "``")),
            DatabasePool::Postgres(_) | DatabasePool::SQLite(_) => {
                format!("\"{}\"", ident.replace('"', "\"\""))
            }
        }
    }

    /// Runs user SQL, one or more statements.
    ///
    /// Every row the driver streams back is returned, in order, including rows
    /// of `RETURNING` clauses and of later statements in a batch. When no row
    /// comes back, a row-returning statement yields an empty set and anything
    /// else a single `affected_rows` summary row.
    pub async fn run(&self, sql: &str) -> Result<ResultSet, sqlx::Error> {
        let (rows, affected) = match self {
            DatabasePool::MySQL(pool) => {
                let steps = sqlx::raw_sql(sql)
                    .fetch_many(pool)
                    .map_ok(|step| step.map_left(|done| done.rows_affected()));
                drain(steps, convert::mysql_row).await?
            }
            DatabasePool::Postgres(pool) => {
                let steps = sqlx::raw_sql(sql)
                    .fetch_many(pool)
                    .map_ok(|step| step.map_left(|done| done.rows_affected()));
                drain(steps, convert::postgres_row).await?
            }
            DatabasePool::SQLite(pool) => {
                let steps = sqlx::raw_sql(sql)
                    .fetch_many(pool)
                    .map_ok(|step| step.map_left(|done| done.rows_affected()));
                drain(steps, convert::sqlite_row).await?
            }
        };

        if !rows.is_empty() || StatementKind::of(sql) == StatementKind::Rows {
            Ok(rows)
        } else {
            Ok(affected_rows_result(affected))
        }
    }

    /// Fetches all rows of a statement, converted to JSON rows.
    pub async fn fetch_rows(&self, sql: &str) -> Result<ResultSet, sqlx::Error> {
        match self {
            DatabasePool::MySQL(pool) => {
                let rows = sqlx::raw_sql(sql).fetch_all(pool).await?;
                Ok(rows.iter().map(convert::mysql_row).collect())
            }
            DatabasePool::Postgres(pool) => {
                let rows = sqlx::raw_sql(sql).fetch_all(pool).await?;
                Ok(rows.iter().map(convert::postgres_row).collect())
            }
            DatabasePool::SQLite(pool) => {
                let rows = sqlx::raw_sql(sql).fetch_all(pool).await?;
                Ok(rows.iter().map(convert::sqlite_row).collect())
            }
        }
    }

    /// Executes SQL and returns the number of affected rows.
    pub async fn execute(&self, sql: &str) -> Result<u64, sqlx::Error> {
        let affected = match self {
            DatabasePool::MySQL(pool) => sqlx::raw_sql(sql).execute(pool).await?.rows_affected(),
            DatabasePool::Postgres(pool) => sqlx::raw_sql(sql).execute(pool).await?.rows_affected(),
            DatabasePool::SQLite(pool) => sqlx::raw_sql(sql).execute(pool).await?.rows_affected(),
        };
        Ok(affected)
    }

    /// Fetches up to `limit` rows of `table`.
    ///
    /// `table` must come from the allow-list; it is quoted, never escaped from
    /// arbitrary input.
    pub async fn preview(&self, table: &str, limit: u32) -> Result<ResultSet, sqlx::Error> {
        let sql = format!("SELECT * FROM {} LIMIT {}", self.quote_identifier(table), limit);
        self.fetch_rows(&sql).await
    }

    /// Round-trips `SELECT 1` and returns the latency.
    pub async fn ping(&self) -> Result<Duration, sqlx::Error> {
        let start = Instant::now();
        match self {
            DatabasePool::MySQL(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
            DatabasePool::SQLite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
        }
        Ok(start.elapsed())
    }

    /// Current pool occupancy.
    pub fn stats(&self) -> PoolStats {
        match self {
            DatabasePool::MySQL(pool) => PoolStats { size: pool.size(), idle: pool.num_idle() },
            DatabasePool::Postgres(pool) => PoolStats { size: pool.size(), idle: pool.num_idle() },
            DatabasePool::SQLite(pool) => PoolStats { size: pool.size(), idle: pool.num_idle() },
        }
    }

    /// Closes every connection of the pool.
    pub async fn close(&self) {
        match self {
            DatabasePool::MySQL(pool) => pool.close().await,
            DatabasePool::Postgres(pool) => pool.close().await,
            DatabasePool::SQLite(pool) => pool.close().await,
        }
    }
}

/// Collects converted rows and the summed affected-row counts of a result stream.
async fn drain<R, S>(mut steps: S, convert: fn(&R) -> Row) -> Result<(ResultSet, u64), sqlx::Error>
where
    S: Stream<Item = Result<Either<u64, R>, sqlx::Error>> + Unpin,
{
    let mut rows = ResultSet::new();
    let mut affected = 0;
    while let Some(step) = steps.try_next().await? {
        match step {
            Either::Left(count) => affected += count,
            Either::Right(row) => rows.push(convert(&row)),
        }
    }
    Ok((rows, affected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sqlite_config() -> ConnectionConfig {
        ConnectionConfig {
            db_type: DbType::SQLite,
            url: None,
            host: None,
            port: None,
            username: None,
            password: None,
            database: None,
            file_path: None,
            require_tls: false,
        }
    }

    async fn memory_pool() -> DatabasePool {
        DatabasePool::connect(&sqlite_config(), 1, Duration::from_secs(5))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_rows_and_affected_rows() {
        let pool = memory_pool().await;
        let created = pool
            .run("CREATE TABLE t (id INTEGER, name TEXT, score REAL, raw BLOB)")
            .await
            .unwrap();
        assert_eq!(created[0]["affected_rows"], json!(0));

        let inserted = pool
            .run("INSERT INTO t VALUES (1, 'a', 1.5, x'ff00'), (2, NULL, NULL, NULL)")
            .await
            .unwrap();
        assert_eq!(inserted, vec![json!({ "affected_rows": 2 }).as_object().unwrap().clone()]);

        let rows = pool.run("SELECT * FROM t ORDER BY id").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            serde_json::Value::Object(rows[0].clone()),
            json!({ "id": 1, "name": "a", "score": 1.5, "raw": "0xff00" })
        );
        assert_eq!(rows[1]["name"], serde_json::Value::Null);
        let columns: Vec<&String> = rows[0].keys().collect();
        assert_eq!(columns, ["id", "name", "score", "raw"]);
    }

    #[tokio::test]
    async fn test_returning_clause_yields_rows() {
        let pool = memory_pool().await;
        pool.run("CREATE TABLE t (id INTEGER, name TEXT)").await.unwrap();

        let rows = pool
            .run("INSERT INTO t VALUES (7, 'x') RETURNING id, name")
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(serde_json::Value::Object(rows[0].clone()), json!({ "id": 7, "name": "x" }));
    }

    #[tokio::test]
    async fn test_batch_keeps_rows_of_later_statement() {
        let pool = memory_pool().await;
        pool.run("CREATE TABLE t (id INTEGER, name TEXT)").await.unwrap();
        pool.run("INSERT INTO t VALUES (7, 'x')").await.unwrap();

        let rows = pool
            .run("INSERT INTO t VALUES (8, 'y'); SELECT * FROM t ORDER BY id")
            .await
            .unwrap();
        let ids: Vec<&serde_json::Value> = rows.iter().map(|row| &row["id"]).collect();
        assert_eq!(ids, [&json!(7), &json!(8)]);
        assert!(rows.iter().all(|row| !row.contains_key("affected_rows")));
    }

    #[tokio::test]
    async fn test_commands_sum_affected_rows() {
        let pool = memory_pool().await;
        pool.run("CREATE TABLE t (id INTEGER)").await.unwrap();
        let summary = pool
            .run("INSERT INTO t VALUES (1), (2); INSERT INTO t VALUES (3)")
            .await
            .unwrap();
        assert_eq!(summary, vec![json!({ "affected_rows": 3 }).as_object().unwrap().clone()]);

        let empty = pool.run("SELECT * FROM t WHERE id > 99").await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_preview_limits_rows() {
        let pool = memory_pool().await;
        pool.run("CREATE TABLE \"Orders\" (id INTEGER)").await.unwrap();
        pool.run("INSERT INTO \"Orders\" VALUES (1), (2), (3)").await.unwrap();
        assert_eq!(pool.preview("Orders", 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_ping_and_stats() {
        let pool = memory_pool().await;
        assert!(pool.ping().await.is_ok());
        assert_eq!(pool.db_type(), DbType::SQLite);
        assert!(pool.stats().size <= 1);
        pool.close().await;
        assert!(pool.ping().await.is_err());
    }

    #[tokio::test]
    async fn test_quote_identifier() {
        let pool = memory_pool().await;
        assert_eq!(pool.quote_identifier("Orders"), "\"Orders\"");
        assert_eq!(pool.quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
