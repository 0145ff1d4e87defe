//! 查询执行服务模块

use std::sync::Arc;
use std::time::Instant;

use common::errors::{AppError, AppResult, QueryErrorKind};
use common::models::document::DocumentQueryRequest;
use common::models::query::{ResultSet, SqlQueryRequest};
use common::models::table::TableAllowList;
use validator::Validate;

use crate::documents::{self, DocumentStore};
use crate::pool::DatabasePool;
use crate::state::AppState;

/// SQL 查询执行服务
pub struct QueryService {
    pool: DatabasePool,
    tables: Arc<TableAllowList>,
    preview_limit: u32,
}

impl QueryService {
    /// 创建新的查询服务实例
    pub fn new(pool: DatabasePool, tables: Arc<TableAllowList>, preview_limit: u32) -> Self {
        Self {
            pool,
            tables,
            preview_limit,
        }
    }

    /// 从应用状态创建
    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.pool.clone(),
            state.tables.clone(),
            state.config.preview.row_limit,
        )
    }

    /// 执行 SQL 查询
    ///
    /// 语句原样发送给数据库；驱动错误只记录日志，客户端只看到分类后的信息。
    pub async fn execute(&self, req: SqlQueryRequest) -> AppResult<ResultSet> {
        req.validate()?;

        tracing::info!(query = %req.query, "Running SQL");
        let start = Instant::now();

        match self.pool.run(&req.query).await {
            Ok(rows) => {
                tracing::info!(
                    rows = rows.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "SQL finished"
                );
                Ok(rows)
            }
            Err(e) => {
                let kind = QueryErrorKind::from_sqlx(&e);
                tracing::error!(error = %e, code = kind.code(), "SQL failed");
                Err(AppError::QueryFailed { kind })
            }
        }
    }

    /// 预览白名单中的表
    pub async fn preview(&self, name: &str, limit: Option<u32>) -> AppResult<ResultSet> {
        let table = self.tables.resolve(name)?;
        let limit = limit
            .unwrap_or(self.preview_limit)
            .clamp(1, self.preview_limit);

        self.pool.preview(table, limit).await.map_err(|e| {
            let kind = QueryErrorKind::from_sqlx(&e);
            tracing::error!(table = %table, error = %e, code = kind.code(), "Table preview failed");
            AppError::TablePreview {
                table: table.to_string(),
                kind,
            }
        })
    }

    /// 可预览的表名
    pub fn tables(&self) -> Vec<String> {
        self.tables.names().to_vec()
    }
}

/// 文档查询服务
pub struct DocumentService {
    store: Option<DocumentStore>,
}

impl DocumentService {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            store: state.documents.clone(),
        }
    }

    /// 执行文档操作
    pub async fn execute(&self, req: DocumentQueryRequest) -> AppResult<ResultSet> {
        let store = documents::require(self.store.as_ref())?;
        let operation = req.operation;
        let command = req.into_command()?;

        tracing::info!(
            operation = %operation,
            collection = command.collection(),
            "Running document command"
        );

        store.run(command).await.map_err(|e| {
            tracing::error!(operation = %operation, error = %e, "Document command failed");
            e.into_app_error()
        })
    }

    /// 列出集合
    pub async fn collections(&self) -> AppResult<Vec<String>> {
        let store = documents::require(self.store.as_ref())?;
        store.list_collections().await.map_err(|e| {
            let kind = documents::classify(&e);
            tracing::error!(error = %e, code = kind.code(), "Listing collections failed");
            AppError::QueryFailed { kind }
        })
    }
}
