//! 查询网关服务
//!
//! 查询仪表盘的后端入口，提供以下功能：
//! - 执行任意 SQL 语句并以 JSON 行数组返回结果
//! - 白名单表的数据预览
//! - 可选的 MongoDB 文档查询
//! - 请求 ID 与请求/响应日志记录

mod convert;
mod documents;
mod handlers;
mod pool;
mod routes;
mod service;
mod state;


use anyhow::Context;
use axum::{middleware, routing::get, Json, Router};
use common::config::AppConfig;
use common::middleware::request_id::request_id_middleware;
use common::telemetry::init_tracing;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;

const SERVICE_NAME: &str = "gateway";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "查询仪表盘 API",
        version = "0.1.0",
        description = "SQL / NoSQL 查询网关"
    ),
    paths(
        handlers::execute_sql,
        handlers::preview_table,
        handlers::list_tables,
        handlers::execute_nosql,
        handlers::list_collections,
        handlers::health_check,
    ),
    components(schemas(
        common::models::query::SqlQueryRequest,
        common::models::document::DocumentQueryRequest,
        common::models::document::DocumentOperation,
        common::response::ErrorResponse,
        handlers::HealthResponse,
        handlers::ComponentHealth,
        handlers::PoolStatus,
    )),
    tags(
        (name = "query", description = "SQL 查询端点"),
        (name = "nosql", description = "文档查询端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志追踪
    init_tracing("info,sqlx=warn,mongodb=warn");

    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME).context("invalid configuration")?;
    let addr = config.bind_address();

    // 连接数据库
    let state = AppState::connect(config).await?;

    // 创建路由
    let app = create_router(state.clone());

    // 启动服务
    info!(service = SERVICE_NAME, address = %addr, "启动查询网关");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    state.close().await;
    info!("查询网关已停止");
    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("收到停止信号，正在关闭");
}
