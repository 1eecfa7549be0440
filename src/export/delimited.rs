//! CSV encoding. Every field is quoted and NULL becomes an empty field.

use super::Table;
use crate::db::Value;
use crate::error::{GatewayError, Result};

pub(super) fn encode(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(&table.columns).map_err(csv_error)?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(field))
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| GatewayError::internal(format!("CSV encoding error: {}", e.error())))
}

fn field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.to_display_string(),
    }
}

fn csv_error(e: csv::Error) -> GatewayError {
    GatewayError::internal(format!("CSV encoding error: {e}"))
}
