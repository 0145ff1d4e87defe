//! 网关路由模块

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// 创建查询路由
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/query/sql", post(handlers::execute_sql))
        .route("/api/query/sql/tables", get(handlers::list_tables))
        .route("/api/query/sql/table/{name}", get(handlers::preview_table))
        .route("/api/query/nosql", post(handlers::execute_nosql))
        .route("/api/query/nosql/collections", get(handlers::list_collections))
        .route("/api/health", get(handlers::health_check))
}
