//! Database abstraction layer for the gateway.
//!
//! Provides a trait-based interface for the upstream connection a session
//! owns, allowing the MySQL driver and the scripted test double to be used
//! interchangeably.

mod ident;
mod mock;
mod mysql;
mod types;

pub use ident::{qualified, quote_identifier};
pub use mock::{MockDatabase, MockDatabaseClient};
pub use mysql::{MySqlClient, MySqlConnector};
pub use types::{ColumnInfo, QueryResult, Record, Row, Value};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Opens upstream connections. One call yields one dedicated connection.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establishes a new connection using the given parameters.
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>>;
}

/// A single live upstream connection.
///
/// Methods take `&mut self`: a connection runs one statement at a time, and
/// callers serialize access through the owning session.
#[async_trait]
pub trait DatabaseClient: Send {
    /// Runs a statement that produces rows.
    ///
    /// With no parameters the SQL is sent verbatim over the text protocol;
    /// with parameters it is prepared and the values are bound in order.
    async fn fetch(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Switches the connection's current database.
    async fn use_database(&mut self, database: &str) -> Result<()>;

    /// Closes the connection. Further calls fail.
    async fn close(&mut self) -> Result<()>;
}
