//! Handler模块

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use chrono::{DateTime, Utc};
use common::errors::{AppError, QueryErrorKind};
use common::models::document::DocumentQueryRequest;
use common::models::query::{ResultSet, SqlQueryRequest, TablePreviewParams};
use common::response::ErrorResponse;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::service::{DocumentService, QueryService};
use crate::state::AppState;

/// 执行 SQL 查询
///
/// 语句不做任何限制，原样交给数据库执行。
#[utoipa::path(
    post,
    path = "/api/query/sql",
    tag = "query",
    request_body = SqlQueryRequest,
    responses(
        (status = 200, description = "查询执行成功，返回行数组", body = Vec<Object>),
        (status = 400, description = "请求体无效或缺少查询", body = ErrorResponse),
        (status = 500, description = "数据库执行失败", body = ErrorResponse)
    )
)]
pub async fn execute_sql(
    State(state): State<AppState>,
    payload: Result<Json<SqlQueryRequest>, JsonRejection>,
) -> Result<Json<ResultSet>, AppError> {
    let Json(req) = payload?;
    let rows = QueryService::from_state(&state).execute(req).await?;
    Ok(Json(rows))
}

/// 预览表数据
#[utoipa::path(
    get,
    path = "/api/query/sql/table/{name}",
    tag = "query",
    params(
        ("name" = String, Path, description = "白名单中的表名"),
        TablePreviewParams
    ),
    responses(
        (status = 200, description = "表的前若干行", body = Vec<Object>),
        (status = 400, description = "表不在白名单中", body = ErrorResponse),
        (status = 500, description = "读取表失败", body = ErrorResponse)
    )
)]
pub async fn preview_table(
    State(state): State<AppState>,
    Path(name): Path<String>,
    params: Result<Query<TablePreviewParams>, QueryRejection>,
) -> Result<Json<ResultSet>, AppError> {
    let Query(params) = params.map_err(|e| AppError::Validation(e.body_text()))?;
    let rows = QueryService::from_state(&state)
        .preview(&name, params.limit)
        .await?;
    Ok(Json(rows))
}

/// 列出可预览的表
#[utoipa::path(
    get,
    path = "/api/query/sql/tables",
    tag = "query",
    responses(
        (status = 200, description = "白名单表名", body = Vec<String>)
    )
)]
pub async fn list_tables(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(QueryService::from_state(&state).tables())
}

/// 执行文档操作
#[utoipa::path(
    post,
    path = "/api/query/nosql",
    tag = "nosql",
    request_body = DocumentQueryRequest,
    responses(
        (status = 200, description = "操作结果行", body = Vec<Object>),
        (status = 400, description = "请求体无效", body = ErrorResponse),
        (status = 500, description = "文档库执行失败", body = ErrorResponse),
        (status = 503, description = "未配置文档库", body = ErrorResponse)
    )
)]
pub async fn execute_nosql(
    State(state): State<AppState>,
    payload: Result<Json<DocumentQueryRequest>, JsonRejection>,
) -> Result<Json<ResultSet>, AppError> {
    let Json(req) = payload?;
    let rows = DocumentService::from_state(&state).execute(req).await?;
    Ok(Json(rows))
}

/// 列出文档集合
#[utoipa::path(
    get,
    path = "/api/query/nosql/collections",
    tag = "nosql",
    responses(
        (status = 200, description = "集合名称", body = Vec<String>),
        (status = 503, description = "未配置文档库", body = ErrorResponse)
    )
)]
pub async fn list_collections(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, AppError> {
    let names = DocumentService::from_state(&state).collections().await?;
    Ok(Json(names))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务状态", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.pool.ping().await {
        Ok(latency) => ComponentHealth::up(latency.as_millis() as u64),
        Err(e) => {
            let kind = QueryErrorKind::from_sqlx(&e);
            tracing::warn!(error = %e, "Database health check failed");
            ComponentHealth::down(kind)
        }
    };

    let document_store = match &state.documents {
        Some(store) => {
            let start = std::time::Instant::now();
            Some(match store.ping().await {
                Ok(()) => ComponentHealth::up(start.elapsed().as_millis() as u64),
                Err(e) => {
                    tracing::warn!(error = %e, "Document store health check failed");
                    ComponentHealth::down(crate::documents::classify(&e))
                }
            })
        }
        None => None,
    };

    let healthy = database.healthy && document_store.as_ref().map_or(true, |d| d.healthy);
    let stats = state.pool.stats();

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        database_type: state.pool.db_type().to_string(),
        database,
        document_store,
        pool: PoolStatus {
            size: stats.size,
            idle: stats.idle as u32,
        },
    })
}

/// 健康检查响应
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态：healthy / degraded
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
    /// 数据库类型
    pub database_type: String,
    /// 关系数据库状态
    pub database: ComponentHealth,
    /// 文档库状态（未配置时省略）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_store: Option<ComponentHealth>,
    /// 连接池状态
    pub pool: PoolStatus,
}

/// 单个后端的健康状态
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    /// 是否健康
    pub healthy: bool,
    /// 往返延迟（毫秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    /// 错误信息（如果不健康）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    fn up(latency_ms: u64) -> Self {
        Self {
            healthy: true,
            latency_ms: Some(latency_ms),
            error: None,
        }
    }

    fn down(kind: QueryErrorKind) -> Self {
        Self {
            healthy: false,
            latency_ms: None,
            error: Some(kind.message().to_string()),
        }
    }
}

/// 连接池状态
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PoolStatus {
    /// 当前连接数
    pub size: u32,
    /// 空闲连接数
    pub idle: u32,
}
