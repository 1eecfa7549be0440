//! Result export for the gateway.
//!
//! Runs a statement through the query executor and renders the outcome as
//! downloadable CSV or XLSX bytes.

mod delimited;
mod spreadsheet;

use serde::Deserialize;
use tracing::info;

use crate::db::Value;
use crate::error::{GatewayError, Result};
use crate::query::{QueryExecutor, QueryOutcome};
use crate::session::SessionId;

/// Supported export encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    /// Download filename: `export.<ext>` by default, extension appended when missing.
    pub fn filename(&self, requested: Option<&str>) -> String {
        let suffix = format!(".{}", self.extension());
        match requested.filter(|name| !name.trim().is_empty()) {
            None => format!("export{suffix}"),
            Some(name) if name.ends_with(&suffix) => name.to_string(),
            Some(name) => format!("{name}{suffix}"),
        }
    }
}

/// Builds an RFC 5987 `Content-Disposition` value for `filename`.
///
/// Only attr-chars are left bare; `form_urlencoded` keeps `*` and maps spaces
/// to `+`, so both are fixed up.
pub fn content_disposition(filename: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(filename.as_bytes()).collect();
    format!(
        "attachment; filename*=UTF-8''{}",
        encoded.replace('+', "%20").replace('*', "%2A")
    )
}

/// Column headers plus rows, the shape both encoders consume.
pub(crate) struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Flattens an outcome. Writes become a one-column `rowsAffected` table.
    fn from_outcome(outcome: &QueryOutcome) -> Result<Self> {
        match outcome {
            QueryOutcome::Rows(result) if result.is_empty() => Err(GatewayError::NoData),
            QueryOutcome::Rows(result) => Ok(Self {
                columns: result.columns.iter().map(|c| c.name.clone()).collect(),
                rows: result.rows.clone(),
            }),
            QueryOutcome::Affected { rows_affected } => Ok(Self {
                columns: vec!["rowsAffected".to_string()],
                rows: vec![vec![Value::UInt(*rows_affected)]],
            }),
        }
    }
}

/// Encodes an outcome. Fails with `NoData` before encoding when there are no rows.
pub fn render(outcome: &QueryOutcome, format: ExportFormat) -> Result<Vec<u8>> {
    let table = Table::from_outcome(outcome)?;
    match format {
        ExportFormat::Csv => delimited::encode(&table),
        ExportFormat::Xlsx => spreadsheet::encode(&table),
    }
}

/// Runs queries and renders their results for download.
#[derive(Clone)]
pub struct ResultExporter {
    executor: QueryExecutor,
}

impl ResultExporter {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    pub async fn export(&self, id: &SessionId, sql: &str, format: ExportFormat) -> Result<Vec<u8>> {
        let outcome = self.executor.execute(id, sql).await?;
        let bytes = render(&outcome, format)?;
        info!(session = %id, ?format, bytes = bytes.len(), "Export rendered");
        Ok(bytes)
    }
}
