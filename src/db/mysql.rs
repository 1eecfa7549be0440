//! MySQL database client implementation.
//!
//! Provides `MySqlConnector`, which opens one dedicated `sqlx` connection per
//! session, and `MySqlClient`, which implements `DatabaseClient` on top of it.

use crate::config::ConnectionConfig;
use crate::db::{quote_identifier, ColumnInfo, Connector, DatabaseClient, QueryResult, Row, Value};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures::future::BoxFuture;
use futures::{FutureExt, Stream, TryStreamExt};
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{
    Column, ConnectOptions, Connection, Either, Executor, Row as SqlxRow, Statement, TypeInfo,
    ValueRef,
};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Opens MySQL connections for new sessions.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    connect_timeout: Duration,
    statement_timeout: Option<Duration>,
}

impl MySqlConnector {
    pub fn new(connect_timeout: Duration, statement_timeout: Option<Duration>) -> Self {
        Self {
            connect_timeout,
            statement_timeout,
        }
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
        let client = MySqlClient::connect(config, self.connect_timeout, self.statement_timeout).await?;
        Ok(Box::new(client))
    }
}

/// MySQL database client owning a single connection.
#[derive(Debug)]
pub struct MySqlClient {
    conn: Option<MySqlConnection>,
    statement_timeout: Option<Duration>,
}

impl MySqlClient {
    /// Connects without retrying; a failure is reported immediately.
    pub async fn connect(
        config: &ConnectionConfig,
        connect_timeout: Duration,
        statement_timeout: Option<Duration>,
    ) -> Result<Self> {
        let options = connect_options(config);
        debug!(target = %config.display_string(), "Opening MySQL connection");

        let conn = tokio::time::timeout(connect_timeout, MySqlConnection::connect_with(&options))
            .await
            .map_err(|_| {
                GatewayError::connection(format!(
                    "Connection to {}:{} timed out after {} seconds",
                    config.host,
                    config.port,
                    connect_timeout.as_secs()
                ))
            })?
            .map_err(|e| map_connection_error(e, config))?;

        Ok(Self {
            conn: Some(conn),
            statement_timeout,
        })
    }

    fn conn(&mut self) -> Result<&mut MySqlConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| GatewayError::query("Connection is closed"))
    }

    /// Fetches column metadata for a statement that returned no rows.
    ///
    /// Best-effort: statements the server cannot prepare yield no columns.
    async fn fetch_column_metadata(&mut self, sql: &str) -> Vec<ColumnInfo> {
        let Ok(conn) = self.conn() else {
            return Vec::new();
        };
        match conn.prepare(sql).await {
            Ok(statement) => statement
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            Err(e) => {
                debug!(error = %e, "Could not prepare statement for column metadata");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl DatabaseClient for MySqlClient {
    async fn fetch(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start = Instant::now();
        let limit = self.statement_timeout;
        let conn = self.conn()?;

        let rows: Vec<MySqlRow> = if params.is_empty() {
            let stream = (&mut *conn).fetch_many(sqlx::raw_sql(sql));
            run_with_timeout(limit, first_result_set(stream).boxed()).await?
        } else {
            let query = params
                .iter()
                .fold(sqlx::query(sql), |query, param| bind_value(query, param));
            let rows = (&mut *conn)
                .fetch(query)
                .try_collect::<Vec<MySqlRow>>()
                .boxed();
            run_with_timeout(limit, rows).await?
        };
        let execution_time = start.elapsed();

        let columns: Vec<ColumnInfo> = match rows.first() {
            Some(first_row) => first_row
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            None => self.fetch_column_metadata(sql).await,
        };

        let rows: Vec<Row> = rows.iter().map(convert_row).collect();

        Ok(QueryResult::with_data(columns, rows).with_execution_time(execution_time))
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let limit = self.statement_timeout;
        let conn = self.conn()?;
        let done = run_with_timeout(limit, (&mut *conn).execute(sqlx::raw_sql(sql))).await?;
        Ok(done.rows_affected())
    }

    async fn use_database(&mut self, database: &str) -> Result<()> {
        let statement = format!("USE {}", quote_identifier(database)?);
        let limit = self.statement_timeout;
        let conn = self.conn()?;
        run_with_timeout(limit, (&mut *conn).execute(sqlx::raw_sql(&statement))).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| GatewayError::connection(e.to_string()))?;
        }
        Ok(())
    }
}

/// Builds driver options from a connect request.
fn connect_options(config: &ConnectionConfig) -> MySqlConnectOptions {
    let options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username)
        .password(&config.password)
        .disable_statement_logging();

    match config.initial_database() {
        Some(database) => options.database(database),
        None => options,
    }
}

/// Rows of the first result set of a possibly multi-statement text query.
///
/// Later result sets are drained so the connection stays usable, but their
/// rows are discarded. An error from any statement fails the whole call.
async fn first_result_set<S, D, R>(mut stream: S) -> std::result::Result<Vec<R>, sqlx::Error>
where
    S: Stream<Item = std::result::Result<Either<D, R>, sqlx::Error>> + Unpin,
{
    let mut rows = Vec::new();
    let mut first_done = false;
    while let Some(item) = stream.try_next().await? {
        match item {
            Either::Right(row) if !first_done => rows.push(row),
            Either::Right(_) => {}
            Either::Left(_) => first_done = true,
        }
    }
    Ok(rows)
}

/// Awaits a driver future, optionally bounded by the statement timeout.
async fn run_with_timeout<T>(
    limit: Option<Duration>,
    fut: BoxFuture<'_, std::result::Result<T, sqlx::Error>>,
) -> Result<T> {
    let outcome = match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
            warn!("Statement exceeded timeout of {:?}", limit);
            GatewayError::query(format!(
                "Statement timed out after {} seconds",
                limit.as_secs()
            ))
        })?,
        None => fut.await,
    };
    outcome.map_err(|e| GatewayError::query(format_query_error(e)))
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value.clone() {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(b),
        Value::Int(i) => query.bind(i),
        Value::UInt(u) => query.bind(u),
        Value::Float(f) => query.bind(f),
        Value::Decimal(d) | Value::String(d) => query.bind(d),
        Value::Bytes(b) => query.bind(b),
        Value::Date(d) => query.bind(d),
        Value::Time(t) => query.bind(t),
        Value::DateTime(dt) => query.bind(dt),
        Value::Timestamp(ts) => query.bind(ts),
    }
}

/// Converts a sqlx MySqlRow to our Row type.
fn convert_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a MySqlRow to our Value type.
fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    let is_null = row
        .try_get_raw(index)
        .map(|raw| raw.is_null())
        .unwrap_or(true);
    if is_null {
        return Value::Null;
    }

    let typed = match type_name {
        "BOOLEAN" => decode::<bool>(row, index).map(Value::Bool),

        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            decode::<i64>(row, index).map(Value::Int)
        }

        unsigned if unsigned.ends_with("UNSIGNED") => decode::<u64>(row, index).map(Value::UInt),

        "YEAR" => decode_unchecked::<u16>(row, index).map(|y| Value::UInt(y as u64)),

        "FLOAT" => decode::<f32>(row, index).map(|v| Value::Float(v as f64)),

        "DOUBLE" => decode::<f64>(row, index).map(Value::Float),

        "DECIMAL" => decode_unchecked::<String>(row, index).map(Value::Decimal),

        "DATE" => decode::<NaiveDate>(row, index).map(Value::Date),

        "TIME" => decode::<NaiveTime>(row, index).map(Value::Time),

        "DATETIME" => decode::<NaiveDateTime>(row, index).map(Value::DateTime),

        "TIMESTAMP" => decode::<DateTime<Utc>>(row, index).map(Value::Timestamp),

        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
        | "GEOMETRY" => decode_unchecked::<Vec<u8>>(row, index)
            .map(|bytes| binary_column_value(type_name, bytes)),

        _ => None,
    };

    // Anything the typed path cannot represent (JSON, ENUM, zero dates,
    // out-of-range TIME) falls back to the server's text rendering.
    typed.unwrap_or_else(|| text_or_bytes(row, index))
}

fn decode<'r, T>(row: &'r MySqlRow, index: usize) -> Option<T>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get::<Option<T>, _>(index).ok().flatten()
}

fn decode_unchecked<'r, T>(row: &'r MySqlRow, index: usize) -> Option<T>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get_unchecked::<Option<T>, _>(index).ok().flatten()
}

fn text_or_bytes(row: &MySqlRow, index: usize) -> Value {
    match decode_unchecked::<Vec<u8>>(row, index) {
        Some(bytes) => utf8_or_bytes(bytes),
        None => Value::Null,
    }
}

/// Converts a column the driver reports under a binary type name.
///
/// The driver names every column carrying the binary flag as binary,
/// including `_bin`-collated text such as the catalog name columns, so
/// UTF-8 content is returned as text. `BIT` and `GEOMETRY` stay raw.
fn binary_column_value(type_name: &str, bytes: Vec<u8>) -> Value {
    match type_name {
        "BIT" | "GEOMETRY" => Value::Bytes(bytes),
        _ => utf8_or_bytes(bytes),
    }
}

fn utf8_or_bytes(bytes: Vec<u8>) -> Value {
    match String::from_utf8(bytes) {
        Ok(text) => Value::String(text),
        Err(e) => Value::Bytes(e.into_bytes()),
    }
}

/// Maps sqlx connection errors to user-facing messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> GatewayError {
    let host = &config.host;
    let port = config.port;
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        GatewayError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("access denied") {
        GatewayError::connection(format!(
            "Authentication failed for user '{}'. Check your credentials.",
            config.username
        ))
    } else if error_str.contains("unknown database") {
        GatewayError::connection(format!(
            "Database '{}' does not exist.",
            config.initial_database().unwrap_or("unknown")
        ))
    } else if error_str.contains("failed to lookup address")
        || error_str.contains("name or service not known")
    {
        GatewayError::connection(format!("Cannot resolve host '{host}'."))
    } else {
        GatewayError::connection(error.to_string())
    }
}

/// Formats a query error with the server's error number and SQLSTATE.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    match db_error.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>() {
        Some(mysql_error) => match mysql_error.code() {
            Some(state) => format!(
                "ERROR {} ({}): {}",
                mysql_error.number(),
                state,
                mysql_error.message()
            ),
            None => format!("ERROR {}: {}", mysql_error.number(), mysql_error.message()),
        },
        None => db_error.message().to_string(),
    }
}
