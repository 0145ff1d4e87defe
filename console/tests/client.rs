use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use console::preview::PREVIEW_DISPLAY_ROWS;
use console::{
    load_previews, render_results, ConsoleError, GatewayClient, Mode, Phase, QueryConsole,
    StatusKind,
};
use serde_json::{json, Value};

async fn run_sql(Json(body): Json<Value>) -> impl IntoResponse {
    let query = body["query"].as_str().unwrap_or_default();
    if query.contains("NoSuchTable") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Query references a table or column that does not exist",
                "code": "UNDEFINED_OBJECT"
            })),
        )
            .into_response();
    }
    if query.contains("PLAIN") {
        return (StatusCode::BAD_GATEWAY, "upstream down").into_response();
    }
    Json(json!([
        { "customer_id": 1, "first_name": "Deepak" },
        { "customer_id": 2, "first_name": "Amit" }
    ]))
    .into_response()
}

async fn run_nosql(Json(body): Json<Value>) -> Json<Value> {
    Json(json!([{ "operation": body["operation"], "collection": body["data"]["collection"] }]))
}

async fn tables() -> Json<Value> {
    Json(json!(["Customers", "Orders", "Broken"]))
}

async fn preview(Path(name): Path<String>) -> impl IntoResponse {
    if name == "Slow" {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        return Json(json!([{ "done": true }])).into_response();
    }
    if name == "Broken" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch table Broken", "code": "UNDEFINED_OBJECT" })),
        )
            .into_response();
    }
    let rows: Vec<Value> = (1..=10).map(|i| json!({ "id": i, "table": name })).collect();
    Json(rows).into_response()
}

async fn stub_gateway() -> GatewayClient {
    GatewayClient::new(&spawn_stub().await).unwrap()
}

async fn spawn_stub() -> String {
    let app = Router::new()
        .route("/api/query/sql", post(run_sql))
        .route("/api/query/sql/tables", get(tables))
        .route("/api/query/sql/table/{name}", get(preview))
        .route("/api/query/nosql", post(run_nosql));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_customers_round_trip_renders_two_columns() {
    let client = stub_gateway().await;
    let mut console = QueryConsole::new(Mode::Sql);
    console.set_query("SELECT * FROM Customers;");

    let ticket = console.submit().unwrap();
    let outcome = client.submit(&ticket.submission).await;
    assert!(console.resolve(ticket.generation, outcome));

    assert_eq!(console.phase(), Phase::Resolved);
    let text = render_results(console.results());
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("customer_id | first_name"));
    assert!(text.contains("Deepak"));
    assert!(text.contains("Amit"));
    assert!(text.ends_with("(2 rows)"));
}

#[tokio::test]
async fn test_gateway_error_message_is_surfaced() {
    let client = stub_gateway().await;
    let mut console = QueryConsole::new(Mode::Sql);
    console.set_query("SELECT * FROM NoSuchTable;");

    let ticket = console.submit().unwrap();
    let outcome = client.submit(&ticket.submission).await;
    assert!(matches!(outcome, Err(ConsoleError::Gateway { status: 500, .. })));
    console.resolve(ticket.generation, outcome);

    assert_eq!(console.phase(), Phase::Failed);
    assert_eq!(console.query(), "SELECT * FROM NoSuchTable;");
    let status = console.status().unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert_eq!(status.text, "Query references a table or column that does not exist");
}

#[tokio::test]
async fn test_non_json_error_uses_fallback_message() {
    let client = stub_gateway().await;
    let err = client.run_sql("SELECT PLAIN").await.unwrap_err();
    assert_eq!(err.status(), Some(502));
    assert_eq!(err.to_string(), "Request failed with status 502");
}

#[tokio::test]
async fn test_unreachable_gateway_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = GatewayClient::new(&format!("http://{}", addr)).unwrap();
    let err = client.run_sql("SELECT 1").await.unwrap_err();
    assert!(matches!(err, ConsoleError::Transport(_)));
    assert!(!err.to_string().is_empty());
}

#[tokio::test]
async fn test_nosql_submission_hits_document_endpoint() {
    let client = stub_gateway().await;
    let mut console = QueryConsole::new(Mode::NoSql);
    console.set_query(r#"{ "collection": "users", "filter": {} }"#);

    let ticket = console.submit().unwrap();
    let rows = client.submit(&ticket.submission).await.unwrap();
    assert_eq!(rows[0]["operation"], "find");
    assert_eq!(rows[0]["collection"], "users");
}

#[tokio::test]
async fn test_previews_are_independent() {
    let client = stub_gateway().await;
    let previews = load_previews(&client).await.unwrap();

    let names: Vec<&str> = previews.iter().map(|p| p.table.as_str()).collect();
    assert_eq!(names, ["Customers", "Orders", "Broken"]);

    let orders = &previews[1];
    assert_eq!(orders.outcome.as_ref().unwrap().len(), 10);
    assert_eq!(orders.columns(), ["id", "table"]);
    assert!(orders.to_text().contains(&format!("({} rows)", PREVIEW_DISPLAY_ROWS)));

    assert_eq!(
        previews[2].outcome.as_ref().unwrap_err(),
        "Failed to fetch table Broken"
    );
    assert!(previews[0].outcome.is_ok());
}

#[tokio::test]
async fn test_requests_wait_unless_timeout_is_configured() {
    let base_url = spawn_stub().await;

    let patient = GatewayClient::new(&base_url).unwrap();
    let rows = patient.fetch_table_preview("Slow").await.unwrap();
    assert_eq!(rows[0]["done"], true);

    let hasty =
        GatewayClient::with_timeout(&base_url, Some(std::time::Duration::from_millis(50))).unwrap();
    let err = hasty.fetch_table_preview("Slow").await.unwrap_err();
    assert!(matches!(err, ConsoleError::Transport(_)));
}
