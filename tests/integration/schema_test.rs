//! Schema introspection integration tests.
//!
//! Tests catalog queries and catalog switching against the scripted mock.

use std::sync::Arc;

use futures::future::join_all;
use sql_gateway::db::{ColumnInfo, MockDatabase, QueryResult, Value};
use sql_gateway::error::GatewayError;
use sql_gateway::query::QueryExecutor;
use sql_gateway::schema::{catalog, SchemaInspector};
use sql_gateway::session::SessionRegistry;

use super::{connect_request, registry};

fn tables(names: &[&str]) -> QueryResult {
    QueryResult::with_data(
        vec![ColumnInfo::new("Tables_in_db", "VARCHAR")],
        names.iter().map(|n| vec![Value::from(*n)]).collect(),
    )
}

fn count(n: u64) -> QueryResult {
    QueryResult::with_data(
        vec![ColumnInfo::new("total", "BIGINT")],
        vec![vec![Value::UInt(n)]],
    )
}

fn two_databases() -> MockDatabase {
    MockDatabase::new()
        .with_database("shop")
        .with_database("crm")
        .with_query_params(catalog::COUNT_TABLES, &[Value::from("shop")], count(2))
        .with_query_params(catalog::COUNT_TABLES, &[Value::from("crm")], count(1))
        .with_query("SHOW TABLES FROM `shop`", tables(&["orders", "users"]))
        .with_query("SHOW TABLES FROM `crm`", tables(&["contacts"]))
}

async fn open(db: &MockDatabase) -> (Arc<SessionRegistry>, SchemaInspector) {
    let registry = registry(db);
    let inspector = SchemaInspector::new(registry.clone());
    (registry, inspector)
}

#[tokio::test]
async fn test_concurrent_catalog_switches_do_not_interleave() {
    let db = two_databases();
    let (registry, inspector) = open(&db).await;
    let id = registry.open(&connect_request()).await.unwrap();

    let calls = (0..10).map(|i| {
        let inspector = inspector.clone();
        let database = if i % 2 == 0 { "shop" } else { "crm" };
        async move { (database, inspector.list_tables(&id, database, None, None).await) }
    });

    for (database, page) in join_all(calls).await {
        let page = page.unwrap();
        match database {
            "shop" => assert_eq!(page.tables, vec!["orders", "users"]),
            _ => assert_eq!(page.tables, vec!["contacts"]),
        }
    }

    // Every USE is immediately followed by the statements for that database.
    let executed = db.executed();
    assert_eq!(executed.len(), 30);
    for chunk in executed.chunks(3) {
        let database = chunk[0]
            .strip_prefix("USE `")
            .and_then(|rest| rest.strip_suffix('`'))
            .unwrap();
        assert_eq!(chunk[1], catalog::COUNT_TABLES);
        assert_eq!(chunk[2], format!("SHOW TABLES FROM `{database}`"));
    }
}

#[tokio::test]
async fn test_inspector_moves_cursor_seen_by_executor() {
    let db = two_databases().with_write("DELETE FROM orders", 2);
    let (registry, inspector) = open(&db).await;
    let id = registry.open(&connect_request()).await.unwrap();
    let executor = QueryExecutor::new(registry.clone());

    inspector.list_tables(&id, "shop", None, None).await.unwrap();
    executor.execute(&id, "DELETE FROM orders").await.unwrap();

    let session = registry.lookup(&id).await.unwrap();
    assert_eq!(session.acquire().await.unwrap().current_database(), Some("shop"));
    assert_eq!(db.executed().last().map(String::as_str), Some("DELETE FROM orders"));
}

#[tokio::test]
async fn test_hostile_table_name_is_quoted() {
    let hostile = "users`; DROP TABLE orders; --";
    let db = two_databases().with_query(
        "SHOW FULL COLUMNS FROM `shop`.`users``; DROP TABLE orders; --`",
        QueryResult::with_data(vec![ColumnInfo::new("Field", "VARCHAR")], vec![]),
    );
    let (registry, inspector) = open(&db).await;
    let id = registry.open(&connect_request()).await.unwrap();

    let records = inspector.table_structure(&id, "shop", hostile).await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_empty_table_name_rejected() {
    let db = two_databases();
    let (registry, inspector) = open(&db).await;
    let id = registry.open(&connect_request()).await.unwrap();

    let err = inspector.table_indexes(&id, "shop", "").await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidArgument(_)));
    assert!(db.executed().is_empty());
}

#[tokio::test]
async fn test_list_databases_after_close() {
    let db = MockDatabase::demo();
    let (registry, inspector) = open(&db).await;
    let id = registry.open(&connect_request()).await.unwrap();

    let databases = inspector.list_databases(&id).await.unwrap();
    assert!(databases.contains(&"information_schema".to_string()));

    registry.close(&id).await;
    let err = inspector.list_databases(&id).await.unwrap_err();
    assert!(matches!(err, GatewayError::SessionNotFound(_)));
}
