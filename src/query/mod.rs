//! Query execution and classification for the gateway.
//!
//! This module runs caller SQL against a session's connection and decides,
//! by statement prefix, whether the caller gets rows or an affected count.

mod executor;

pub use executor::{QueryExecutor, QueryOutcome, StatementKind};
