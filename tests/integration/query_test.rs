//! Query execution integration tests.
//!
//! Runs statements through the executor against the scripted mock.

use pretty_assertions::assert_eq;
use serde_json::json;
use sql_gateway::db::{ColumnInfo, MockDatabase, QueryResult, Value};
use sql_gateway::error::GatewayError;
use sql_gateway::query::{QueryExecutor, QueryOutcome, StatementKind};
use sql_gateway::session::SessionId;

use super::{connect_request, registry};

async fn executor(db: &MockDatabase) -> (QueryExecutor, SessionId) {
    let registry = registry(db);
    let id = registry.open(&connect_request()).await.unwrap();
    (QueryExecutor::new(registry), id)
}

fn alice() -> QueryResult {
    QueryResult::with_data(
        vec![ColumnInfo::new("id", "INT"), ColumnInfo::new("name", "VARCHAR")],
        vec![vec![Value::Int(1), Value::from("Alice")]],
    )
}

#[tokio::test]
async fn test_select_scenario() {
    let sql = "SELECT id, name FROM users WHERE id=1";
    let db = MockDatabase::new().with_query(sql, alice());
    let (executor, id) = executor(&db).await;

    let QueryOutcome::Rows(result) = executor.execute(&id, sql).await.unwrap() else {
        panic!("expected rows");
    };

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"columns": ["id", "name"], "rows": [{"id": 1, "name": "Alice"}]})
    );
}

#[tokio::test]
async fn test_update_scenario() {
    let sql = "UPDATE users SET name='Bob' WHERE id=1";
    let db = MockDatabase::new().with_write(sql, 1);
    let (executor, id) = executor(&db).await;

    let outcome = executor.execute(&id, sql).await.unwrap();
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!({"rowsAffected": 1})
    );
}

#[tokio::test]
async fn test_column_order_follows_driver() {
    let sql = "SELECT b, a FROM t";
    let result = QueryResult::with_data(
        vec![ColumnInfo::new("b", "INT"), ColumnInfo::new("a", "INT")],
        vec![vec![Value::Int(2), Value::Int(1)], vec![Value::Int(4), Value::Int(3)]],
    );
    let db = MockDatabase::new().with_query(sql, result);
    let (executor, id) = executor(&db).await;

    let outcome = executor.execute(&id, sql).await.unwrap();
    let text = serde_json::to_string(&outcome).unwrap();
    assert_eq!(
        text,
        r#"{"columns":["b","a"],"results":[{"b":2,"a":1},{"b":4,"a":3}]}"#
    );
}

#[tokio::test]
async fn test_semantic_reads_without_select_prefix_report_counts() {
    let statements = [
        "SHOW DATABASES",
        "DESCRIBE users",
        "WITH x AS (SELECT 1) SELECT * FROM x",
        "(SELECT 1)",
    ];
    let db = statements
        .iter()
        .fold(MockDatabase::new(), |db, sql| db.with_write(sql, 0));
    let (executor, id) = executor(&db).await;

    for sql in statements {
        let outcome = executor.execute(&id, sql).await.unwrap();
        assert_eq!(outcome.kind(), StatementKind::Write, "{sql}");
        assert_eq!(outcome, QueryOutcome::Affected { rows_affected: 0 });
    }
}

#[tokio::test]
async fn test_empty_select_keeps_columns() {
    let sql = "SELECT id, name FROM users WHERE 1=0";
    let empty = QueryResult::with_data(
        vec![ColumnInfo::new("id", "INT"), ColumnInfo::new("name", "VARCHAR")],
        vec![],
    );
    let db = MockDatabase::new().with_query(sql, empty);
    let (executor, id) = executor(&db).await;

    let outcome = executor.execute(&id, sql).await.unwrap();
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!({"columns": ["id", "name"], "results": []})
    );
}

#[tokio::test]
async fn test_sql_is_passed_verbatim() {
    let sql = "  select * FROM users  ";
    let db = MockDatabase::new().with_query(sql, alice());
    let (executor, id) = executor(&db).await;

    executor.execute(&id, sql).await.unwrap();
    assert_eq!(db.executed(), vec![sql.to_string()]);
}

#[tokio::test]
async fn test_query_after_close_is_not_found() {
    let db = MockDatabase::new().with_query("SELECT 1", alice());
    let registry = registry(&db);
    let id = registry.open(&connect_request()).await.unwrap();
    let executor = QueryExecutor::new(registry.clone());

    registry.close(&id).await;

    let err = executor.execute(&id, "SELECT 1").await.unwrap_err();
    assert!(matches!(err, GatewayError::SessionNotFound(_)));
    assert!(db.executed().is_empty());
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let db = MockDatabase::new().with_database("shop").with_database("crm");
    let registry = registry(&db);
    let first = registry.open(&connect_request()).await.unwrap();
    let second = registry.open(&connect_request()).await.unwrap();

    registry.select_database(&first, "shop").await.unwrap();
    registry.select_database(&second, "crm").await.unwrap();

    let a = registry.lookup(&first).await.unwrap();
    let b = registry.lookup(&second).await.unwrap();
    assert_eq!(a.acquire().await.unwrap().current_database(), Some("shop"));
    assert_eq!(b.acquire().await.unwrap().current_database(), Some("crm"));
}
