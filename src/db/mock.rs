//! Mock database for testing.
//!
//! Provides a scripted in-memory database: tests register the statements they
//! expect along with the results to return, and every executed statement is
//! recorded for later inspection. Also backs `--mock-db` runs.

use super::{ColumnInfo, Connector, DatabaseClient, QueryResult, Value};
use crate::config::ConnectionConfig;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct MockState {
    databases: HashSet<String>,
    reads: HashMap<(String, Vec<String>), QueryResult>,
    writes: HashMap<String, u64>,
    connect_failure: Option<String>,
    executed: Vec<String>,
    open_connections: usize,
}

/// A scripted database shared by every connection it hands out.
#[derive(Debug, Clone, Default)]
pub struct MockDatabase {
    state: Arc<Mutex<MockState>>,
}

impl MockDatabase {
    /// Creates an empty mock with no databases or scripted statements.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock preloaded with a small `shop` database.
    pub fn demo() -> Self {
        let users = QueryResult::with_data(
            vec![
                ColumnInfo::new("id", "INT"),
                ColumnInfo::new("name", "VARCHAR"),
            ],
            vec![
                vec![Value::Int(1), Value::from("Alice")],
                vec![Value::Int(2), Value::from("Bob")],
            ],
        );
        let databases = QueryResult::with_data(
            vec![ColumnInfo::new("Database", "VARCHAR")],
            vec![
                vec![Value::from("information_schema")],
                vec![Value::from("shop")],
            ],
        );

        Self::new()
            .with_database("information_schema")
            .with_database("shop")
            .with_query("SHOW DATABASES", databases)
            .with_query("SELECT * FROM users", users)
    }

    /// Registers a database name that `use_database` accepts.
    pub fn with_database(self, name: &str) -> Self {
        self.lock().databases.insert(name.to_string());
        self
    }

    /// Scripts the result of a statement sent without parameters.
    pub fn with_query(self, sql: &str, result: QueryResult) -> Self {
        self.with_query_params(sql, &[], result)
    }

    /// Scripts the result of a statement sent with the given bound parameters.
    pub fn with_query_params(self, sql: &str, params: &[Value], result: QueryResult) -> Self {
        self.lock().reads.insert(read_key(sql, params), result);
        self
    }

    /// Scripts the affected-row count of a write statement.
    pub fn with_write(self, sql: &str, rows_affected: u64) -> Self {
        self.lock().writes.insert(sql.trim().to_string(), rows_affected);
        self
    }

    /// Makes every subsequent connect attempt fail with the given message.
    pub fn fail_connect(self, message: &str) -> Self {
        self.lock().connect_failure = Some(message.to_string());
        self
    }

    /// Statements executed so far, in order, across all connections.
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    /// Number of connections handed out and not yet closed.
    pub fn open_connections(&self) -> usize {
        self.lock().open_connections
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_key(sql: &str, params: &[Value]) -> (String, Vec<String>) {
    (
        sql.trim().to_string(),
        params.iter().map(Value::to_display_string).collect(),
    )
}

#[async_trait]
impl Connector for MockDatabase {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
        let mut state = self.lock();
        if let Some(message) = &state.connect_failure {
            return Err(GatewayError::connection(message.clone()));
        }
        if let Some(database) = config.initial_database() {
            if !state.databases.contains(database) {
                return Err(GatewayError::connection(format!(
                    "Database '{database}' does not exist."
                )));
            }
        }
        state.open_connections += 1;
        drop(state);

        Ok(Box::new(MockDatabaseClient {
            db: self.clone(),
            closed: false,
        }))
    }
}

/// One connection handed out by a `MockDatabase`.
#[derive(Debug)]
pub struct MockDatabaseClient {
    db: MockDatabase,
    closed: bool,
}

impl MockDatabaseClient {
    fn record(&self, sql: &str) -> Result<MutexGuard<'_, MockState>> {
        if self.closed {
            return Err(GatewayError::query("Connection is closed"));
        }
        let mut state = self.db.lock();
        state.executed.push(sql.to_string());
        Ok(state)
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn fetch(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let state = self.record(sql)?;
        state
            .reads
            .get(&read_key(sql, params))
            .cloned()
            .map(|result| result.with_execution_time(Duration::from_millis(1)))
            .ok_or_else(|| GatewayError::query(format!("Unexpected statement: {sql}")))
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let state = self.record(sql)?;
        state
            .writes
            .get(sql.trim())
            .copied()
            .ok_or_else(|| GatewayError::query(format!("Unexpected statement: {sql}")))
    }

    async fn use_database(&mut self, database: &str) -> Result<()> {
        let statement = format!("USE {}", super::quote_identifier(database)?);
        let state = self.record(&statement)?;
        if !state.databases.contains(database) {
            return Err(GatewayError::query(format!(
                "Unknown database '{database}'"
            )));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            let mut state = self.db.lock();
            state.open_connections = state.open_connections.saturating_sub(1);
        }
        Ok(())
    }
}
