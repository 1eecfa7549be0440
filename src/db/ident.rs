//! Identifier quoting for statements that cannot bind identifiers.

use crate::error::{GatewayError, Result};

/// Wraps a database, table, or column name in backticks.
///
/// Embedded backticks are doubled, which is MySQL's escape for quoted
/// identifiers. Empty names and names containing NUL are rejected.
pub fn quote_identifier(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(GatewayError::invalid_argument("Identifier cannot be empty"));
    }
    if name.contains('\0') {
        return Err(GatewayError::invalid_argument(
            "Identifier cannot contain NUL characters",
        ));
    }
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Quotes `database`.`object` for cursor-independent catalog statements.
pub fn qualified(database: &str, object: &str) -> Result<String> {
    Ok(format!(
        "{}.{}",
        quote_identifier(database)?,
        quote_identifier(object)?
    ))
}
