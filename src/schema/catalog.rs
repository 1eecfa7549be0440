//! Catalog statement builders.
//!
//! Identifiers cannot be bound as placeholders in `SHOW` statements, so names
//! are quoted and qualified with their database instead.

use crate::db::{qualified, quote_identifier};
use crate::error::Result;

pub const SHOW_DATABASES: &str = "SHOW DATABASES";

pub const COUNT_TABLES: &str =
    "SELECT COUNT(*) AS total FROM information_schema.TABLES WHERE TABLE_SCHEMA = ?";

pub const PAGE_TABLES: &str = "SELECT TABLE_NAME FROM information_schema.TABLES \
     WHERE TABLE_SCHEMA = ? ORDER BY TABLE_NAME LIMIT ? OFFSET ?";

pub fn show_tables(database: &str) -> Result<String> {
    Ok(format!("SHOW TABLES FROM {}", quote_identifier(database)?))
}

pub fn show_full_columns(database: &str, table: &str) -> Result<String> {
    Ok(format!("SHOW FULL COLUMNS FROM {}", qualified(database, table)?))
}

pub fn show_index(database: &str, table: &str) -> Result<String> {
    Ok(format!("SHOW INDEX FROM {}", qualified(database, table)?))
}

pub fn show_create_table(database: &str, table: &str) -> Result<String> {
    Ok(format!("SHOW CREATE TABLE {}", qualified(database, table)?))
}
