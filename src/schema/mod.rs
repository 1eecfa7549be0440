//! Schema introspection for the gateway.
//!
//! Every operation runs under the session lock: the connection is switched to
//! the target database and the catalog statements run before any other
//! request can touch the same session. Statements are also database-qualified,
//! so results never depend on the cursor.

pub mod catalog;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::db::{Record, Value};
use crate::error::{GatewayError, Result};
use crate::session::{SessionId, SessionRegistry};

/// One page of table names plus the database's total table count.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TablePage {
    pub total: u64,
    pub tables: Vec<String>,
}

/// Read-only catalog queries plus caller-supplied `ALTER` execution.
#[derive(Clone)]
pub struct SchemaInspector {
    registry: Arc<SessionRegistry>,
}

impl SchemaInspector {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Lists every database visible to the session's user.
    pub async fn list_databases(&self, id: &SessionId) -> Result<Vec<String>> {
        let session = self.registry.lookup(id).await?;
        let mut guard = session.acquire().await?;
        let result = guard.client().fetch(catalog::SHOW_DATABASES, &[]).await?;
        Ok(result.first_column_strings())
    }

    /// Lists tables in `database`.
    ///
    /// Without a limit every name is returned and `offset` is ignored; a limit
    /// without an offset starts at zero. The total is always the full count.
    pub async fn list_tables(
        &self,
        id: &SessionId,
        database: &str,
        offset: Option<u64>,
        limit: Option<u64>,
    ) -> Result<TablePage> {
        let session = self.registry.lookup(id).await?;
        let mut guard = session.acquire_in(database).await?;
        let schema = [Value::from(database)];

        let count = guard.client().fetch(catalog::COUNT_TABLES, &schema).await?;
        let total = count
            .rows
            .first()
            .and_then(|row| row.first())
            .map(as_count)
            .transpose()?
            .unwrap_or(0);

        let tables = match limit {
            None => guard
                .client()
                .fetch(&catalog::show_tables(database)?, &[])
                .await?
                .first_column_strings(),
            Some(limit) => {
                let params = [
                    Value::from(database),
                    Value::UInt(limit),
                    Value::UInt(offset.unwrap_or(0)),
                ];
                guard
                    .client()
                    .fetch(catalog::PAGE_TABLES, &params)
                    .await?
                    .first_column_strings()
            }
        };

        debug!(session = %id, database, total, returned = tables.len(), "Listed tables");
        Ok(TablePage { total, tables })
    }

    /// Column descriptors, one record per `SHOW FULL COLUMNS` row.
    pub async fn table_structure(
        &self,
        id: &SessionId,
        database: &str,
        table: &str,
    ) -> Result<Vec<Record>> {
        let session = self.registry.lookup(id).await?;
        let sql = catalog::show_full_columns(database, table)?;
        let mut guard = session.acquire_in(database).await?;
        Ok(guard.client().fetch(&sql, &[]).await?.into_records())
    }

    /// Index descriptors, one record per `SHOW INDEX` row.
    pub async fn table_indexes(
        &self,
        id: &SessionId,
        database: &str,
        table: &str,
    ) -> Result<Vec<Record>> {
        let session = self.registry.lookup(id).await?;
        let sql = catalog::show_index(database, table)?;
        let mut guard = session.acquire_in(database).await?;
        Ok(guard.client().fetch(&sql, &[]).await?.into_records())
    }

    /// Reconstructs the table's DDL.
    pub async fn create_statement(
        &self,
        id: &SessionId,
        database: &str,
        table: &str,
    ) -> Result<String> {
        let session = self.registry.lookup(id).await?;
        let sql = catalog::show_create_table(database, table)?;
        let mut guard = session.acquire_in(database).await?;
        let result = guard.client().fetch(&sql, &[]).await?;

        result
            .rows
            .first()
            .and_then(|row| row.get(1))
            .filter(|value| !value.is_null())
            .map(Value::to_display_string)
            .ok_or_else(|| {
                GatewayError::query(format!("No create statement found for table '{table}'"))
            })
    }

    /// Runs caller-supplied DDL verbatim after switching to `database`.
    pub async fn alter_table(
        &self,
        id: &SessionId,
        database: &str,
        table: &str,
        alter_sql: &str,
    ) -> Result<()> {
        let session = self.registry.lookup(id).await?;
        if table.trim().is_empty() {
            return Err(GatewayError::invalid_argument("Table name is required"));
        }
        if alter_sql.trim().is_empty() {
            return Err(GatewayError::invalid_argument("Alter statement is required"));
        }

        let mut guard = session.acquire_in(database).await?;
        info!(session = %id, database, table, sql = alter_sql, "Altering table");
        guard.client().execute(alter_sql).await?;
        Ok(())
    }
}

fn as_count(value: &Value) -> Result<u64> {
    match value {
        Value::Int(n) => u64::try_from(*n).map_err(|_| invalid_count(value)),
        Value::UInt(n) => Ok(*n),
        Value::Decimal(text) | Value::String(text) => {
            text.trim().parse().map_err(|_| invalid_count(value))
        }
        _ => Err(invalid_count(value)),
    }
}

fn invalid_count(value: &Value) -> GatewayError {
    GatewayError::internal(format!("Unexpected table count: {value}"))
}
