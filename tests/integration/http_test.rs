//! HTTP boundary integration tests.
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value as Json};
use sql_gateway::db::{ColumnInfo, MockDatabase, QueryResult, Value};
use sql_gateway::schema::catalog;
use sql_gateway::server::router;
use tower::ServiceExt;

use super::state;

fn app(db: &MockDatabase) -> Router {
    router(state(db))
}

fn post(uri: &str, token: Option<&str>, body: Json) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("failed to build request")
}

async fn json_body(response: Response) -> Json {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&body).expect("response body was not json")
}

async fn connect(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(post(
            "/api/connect",
            None,
            json!({"host": "db.example.com", "port": 3306, "username": "u", "password": "p"}),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    body["token"].as_str().expect("token missing").to_string()
}

#[tokio::test]
async fn test_connect_list_disconnect() {
    let db = MockDatabase::demo();
    let app = app(&db);
    let token = connect(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/databases", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!(["information_schema", "shop"]));

    let response = app
        .clone()
        .oneshot(post("/api/disconnect", Some(&token), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(db.open_connections(), 0);

    // The token still decodes, but its session is gone.
    let response = app
        .clone()
        .oneshot(get("/api/databases", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let message = json_body(response).await["message"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(message.starts_with("Session not found"), "{message}");
}

#[tokio::test]
async fn test_connect_failure_reports_message() {
    let db = MockDatabase::demo().fail_connect("Access denied for user 'u'");
    let response = app(&db)
        .oneshot(post(
            "/api/connect",
            None,
            json!({"host": "db.example.com", "username": "u", "password": "bad"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({"message": "Connection error: Access denied for user 'u'"})
    );
}

#[tokio::test]
async fn test_missing_or_bad_token_rejected() {
    let db = MockDatabase::demo();
    let app = app(&db);

    let response = app.clone().oneshot(get("/api/databases", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let message = json_body(response).await["message"].as_str().unwrap().to_string();
    assert!(message.starts_with("Invalid credential"), "{message}");

    let response = app
        .oneshot(get("/api/databases", Some("not-a-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(db.executed().is_empty());
}

#[tokio::test]
async fn test_query_read_and_write() {
    let db = MockDatabase::demo().with_write("UPDATE users SET name = 'Carol' WHERE id = 2", 1);
    let app = app(&db);
    let token = connect(&app).await;

    let response = app
        .clone()
        .oneshot(post(
            "/api/query",
            Some(&token),
            json!({"query": "SELECT * FROM users"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({
            "columns": ["id", "name"],
            "results": [{"id": 1, "name": "Alice"}, {"id": 2, "name": "Bob"}]
        })
    );

    let response = app
        .clone()
        .oneshot(post(
            "/api/query",
            Some(&token),
            json!({"query": "UPDATE users SET name = 'Carol' WHERE id = 2"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"rowsAffected": 1}));
}

#[tokio::test]
async fn test_empty_query_rejected() {
    let db = MockDatabase::demo();
    let app = app(&db);
    let token = connect(&app).await;

    let response = app
        .oneshot(post("/api/query", Some(&token), json!({"query": "   "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let message = json_body(response).await["message"].as_str().unwrap().to_string();
    assert!(message.contains("Query cannot be empty"), "{message}");
}

#[tokio::test]
async fn test_select_database() {
    let db = MockDatabase::demo();
    let app = app(&db);
    let token = connect(&app).await;

    let response = app
        .clone()
        .oneshot(post(
            "/api/select-database",
            Some(&token),
            json!({"database": "shop"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"message": "Database selected successfully"})
    );
    assert_eq!(db.executed(), vec!["USE `shop`"]);

    let response = app
        .oneshot(post(
            "/api/select-database",
            Some(&token),
            json!({"database": "missing"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_tables_page() {
    let total = QueryResult::with_data(
        vec![ColumnInfo::new("total", "BIGINT")],
        vec![vec![Value::UInt(3)]],
    );
    let page = QueryResult::with_data(
        vec![ColumnInfo::new("TABLE_NAME", "VARCHAR")],
        vec![vec![Value::from("orders")], vec![Value::from("users")]],
    );
    let db = MockDatabase::demo()
        .with_query_params(catalog::COUNT_TABLES, &[Value::from("shop")], total)
        .with_query_params(
            catalog::PAGE_TABLES,
            &[Value::from("shop"), Value::UInt(2), Value::UInt(1)],
            page,
        );
    let app = app(&db);
    let token = connect(&app).await;

    let response = app
        .oneshot(get(
            "/api/tables?database=shop&offset=1&limit=2",
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"total": 3, "tables": ["orders", "users"]})
    );
}

#[tokio::test]
async fn test_export_csv_headers() {
    let db = MockDatabase::demo();
    let app = app(&db);
    let token = connect(&app).await;

    let response = app
        .oneshot(post(
            "/api/export/csv",
            Some(&token),
            json!({"query": "SELECT * FROM users"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename*=UTF-8''export.csv"
    );

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(
        std::str::from_utf8(&body).unwrap(),
        "\"id\",\"name\"\n\"1\",\"Alice\"\n\"2\",\"Bob\"\n"
    );
}

#[tokio::test]
async fn test_export_excel_custom_filename() {
    let db = MockDatabase::demo();
    let app = app(&db);
    let token = connect(&app).await;

    let response = app
        .oneshot(post(
            "/api/export/excel",
            Some(&token),
            json!({"query": "SELECT * FROM users", "filename": "users report"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename*=UTF-8''users%20report.xlsx"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.starts_with(b"PK"));
}

#[tokio::test]
async fn test_downloads_needs_no_token() {
    let db = MockDatabase::demo();
    let response = app(&db).oneshot(get("/api/downloads", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["web"], "https://dl.example.com/web/app");
    assert!(body["windows"].as_str().unwrap().contains("1.0.0"));
}
