//! Statement classification and execution.

use std::sync::Arc;
use std::time::Instant;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tracing::{error, info};

use crate::db::QueryResult;
use crate::error::{GatewayError, Result};
use crate::session::{SessionId, SessionRegistry};

/// Whether a statement is answered with rows or with an affected count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Read,
    Write,
}

impl StatementKind {
    /// Classifies SQL by its leading keyword.
    ///
    /// Only text starting with `select` (after trimming, any case) is a read.
    /// `SHOW`, `DESCRIBE`, `WITH ... SELECT` and parenthesized selects all
    /// take the write path and report an affected count.
    pub fn classify(sql: &str) -> Self {
        if sql.trim().to_lowercase().starts_with("select") {
            Self::Read
        } else {
            Self::Write
        }
    }
}

/// Result of executing one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Rows from a read statement.
    Rows(QueryResult),
    /// Affected-row count from a write statement.
    Affected { rows_affected: u64 },
}

impl QueryOutcome {
    pub fn kind(&self) -> StatementKind {
        match self {
            Self::Rows(_) => StatementKind::Read,
            Self::Affected { .. } => StatementKind::Write,
        }
    }

    /// Rows returned, or the affected count for writes.
    pub fn row_count(&self) -> u64 {
        match self {
            Self::Rows(result) => result.row_count() as u64,
            Self::Affected { rows_affected } => *rows_affected,
        }
    }
}

/// Reads serialize as `{"columns": [...], "results": [...]}`, writes as
/// `{"rowsAffected": n}`.
impl Serialize for QueryOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Rows(result) => {
                let records = result.clone().into_records();
                let mut state = serializer.serialize_struct("QueryOutcome", 2)?;
                state.serialize_field("columns", &result.column_names())?;
                state.serialize_field("results", &records)?;
                state.end()
            }
            Self::Affected { rows_affected } => {
                let mut state = serializer.serialize_struct("QueryOutcome", 1)?;
                state.serialize_field("rowsAffected", rows_affected)?;
                state.end()
            }
        }
    }
}

/// Runs caller SQL against registered sessions.
#[derive(Clone)]
pub struct QueryExecutor {
    registry: Arc<SessionRegistry>,
}

impl QueryExecutor {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Executes `sql` verbatim on the session's connection.
    pub async fn execute(&self, id: &SessionId, sql: &str) -> Result<QueryOutcome> {
        let session = self.registry.lookup(id).await?;
        if sql.trim().is_empty() {
            return Err(GatewayError::invalid_argument("Query cannot be empty"));
        }

        let kind = StatementKind::classify(sql);
        info!(session = %id, sql, ?kind, "Executing query");

        let mut guard = session.acquire().await?;
        let start = Instant::now();
        let outcome = match kind {
            StatementKind::Read => guard.client().fetch(sql, &[]).await.map(QueryOutcome::Rows),
            StatementKind::Write => guard
                .client()
                .execute(sql)
                .await
                .map(|rows_affected| QueryOutcome::Affected { rows_affected }),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(outcome) => {
                info!(
                    session = %id,
                    rows = outcome.row_count(),
                    elapsed_ms,
                    "Query executed successfully"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(session = %id, sql, elapsed_ms, error = %e, "Query failed");
                Err(match e {
                    GatewayError::QueryFailure(_) => e,
                    other => GatewayError::query(other.to_string()),
                })
            }
        }
    }
}
