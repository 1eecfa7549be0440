//! SQL Gateway - token-addressed MySQL sessions over HTTP.
//!
//! This library exposes the core modules for the binary and integration tests.

pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod downloads;
pub mod error;
pub mod export;
pub mod logging;
pub mod query;
pub mod schema;
pub mod server;
pub mod session;
