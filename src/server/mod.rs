//! HTTP boundary for the gateway.
//!
//! Exposes the session core as JSON endpoints under `/api`. Every failure is
//! reported as `{"message": ...}` with a server-error status.

mod auth;
mod handlers;

pub use auth::SessionAuth;

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::error;

use crate::auth::CredentialCodec;
use crate::config::DownloadConfig;
use crate::downloads;
use crate::error::GatewayError;
use crate::export::ResultExporter;
use crate::query::QueryExecutor;
use crate::schema::SchemaInspector;
use crate::session::SessionRegistry;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct GatewayState {
    pub registry: Arc<SessionRegistry>,
    pub codec: Arc<CredentialCodec>,
    pub executor: QueryExecutor,
    pub inspector: SchemaInspector,
    pub exporter: ResultExporter,
    pub downloads: Arc<BTreeMap<&'static str, String>>,
}

impl GatewayState {
    /// Wires the core components around a registry.
    pub fn new(
        registry: Arc<SessionRegistry>,
        codec: CredentialCodec,
        downloads: &DownloadConfig,
    ) -> Self {
        let executor = QueryExecutor::new(registry.clone());
        Self {
            inspector: SchemaInspector::new(registry.clone()),
            exporter: ResultExporter::new(executor.clone()),
            executor,
            codec: Arc::new(codec),
            downloads: Arc::new(downloads::catalog(downloads)),
            registry,
        }
    }
}

/// Builds the gateway router.
pub fn router(state: GatewayState) -> Router {
    let api = Router::new()
        .route("/connect", post(handlers::connect))
        .route("/disconnect", post(handlers::disconnect))
        .route("/databases", get(handlers::databases))
        .route("/tables", get(handlers::tables))
        .route("/select-database", post(handlers::select_database))
        .route("/query", post(handlers::query))
        .route("/table-structure", get(handlers::table_structure))
        .route("/table-indexes", get(handlers::table_indexes))
        .route("/create-statement", get(handlers::create_statement))
        .route("/alter-table", post(handlers::alter_table))
        .route("/export/excel", post(handlers::export_excel))
        .route("/export/csv", post(handlers::export_csv))
        .route("/downloads", get(handlers::downloads));

    Router::new().nest("/api", api).with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        error!(category = self.category(), "{}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}
