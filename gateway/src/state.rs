//! Application state for the gateway.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::config::AppConfig;
use common::models::table::TableAllowList;

use crate::documents::DocumentStore;
use crate::pool::DatabasePool;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: DatabasePool,
    pub documents: Option<DocumentStore>,
    pub tables: Arc<TableAllowList>,
}

impl AppState {
    /// Creates the state from already opened connections.
    pub fn new(config: AppConfig, pool: DatabasePool, documents: Option<DocumentStore>) -> Self {
        let tables = Arc::new(TableAllowList::new(config.preview.tables.iter().cloned()));
        Self {
            config: Arc::new(config),
            pool,
            documents,
            tables,
        }
    }

    /// Opens the database pool and, when configured, the document store.
    ///
    /// Fails fast: a gateway that cannot reach its configured backends does
    /// not start.
    pub async fn connect(config: AppConfig) -> anyhow::Result<Self> {
        tracing::info!(database = %config.database.describe(), "Connecting to database");
        let pool = DatabasePool::connect(
            &config.database,
            config.max_connections,
            Duration::from_secs(config.connect_timeout_secs),
        )
        .await
        .context("failed to connect to the database")?;

        let documents = match &config.document_store {
            Some(store_config) => {
                let store = DocumentStore::connect(store_config)
                    .await
                    .context("failed to connect to the document store")?;
                tracing::info!(database = store.database_name(), "Document store connected");
                Some(store)
            }
            None => {
                tracing::info!("No document store configured; NoSQL endpoints disabled");
                None
            }
        };

        Ok(Self::new(config, pool, documents))
    }

    /// Releases all backend connections.
    pub async fn close(&self) {
        self.pool.close().await;
        if let Some(store) = &self.documents {
            store.shutdown().await;
        }
    }
}
