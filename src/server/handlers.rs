//! Route handlers.

use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{GatewayState, SessionAuth};
use crate::config::ConnectionConfig;
use crate::db::Record;
use crate::error::{GatewayError, Result};
use crate::export::{content_disposition, ExportFormat};
use crate::query::QueryOutcome;
use crate::schema::TablePage;

#[derive(Serialize)]
pub(super) struct TokenResponse {
    token: String,
}

#[derive(Serialize)]
pub(super) struct MessageResponse {
    message: &'static str,
}

#[derive(Serialize)]
pub(super) struct StatementResponse {
    statement: String,
}

#[derive(Deserialize)]
pub(super) struct QueryRequest {
    #[serde(default)]
    query: String,
}

#[derive(Deserialize)]
pub(super) struct SelectDatabaseRequest {
    #[serde(default)]
    database: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AlterTableRequest {
    #[serde(default)]
    database: String,
    #[serde(default)]
    table: String,
    #[serde(default)]
    alter_sql: String,
}

#[derive(Deserialize)]
pub(super) struct ExportRequest {
    #[serde(default)]
    query: String,
    filename: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct TablesParams {
    #[serde(default)]
    database: String,
    offset: Option<u64>,
    limit: Option<u64>,
}

#[derive(Deserialize)]
pub(super) struct TableParams {
    #[serde(default)]
    database: String,
    #[serde(default)]
    table: String,
}

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| GatewayError::invalid_argument(e.body_text()))
}

fn params<T>(query: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    query
        .map(|Query(value)| value)
        .map_err(|e| GatewayError::invalid_argument(e.body_text()))
}

pub(super) async fn connect(
    State(state): State<GatewayState>,
    payload: std::result::Result<Json<ConnectionConfig>, JsonRejection>,
) -> Result<Json<TokenResponse>> {
    let config = body(payload)?;
    info!(host = %config.host, port = config.port, "Attempting to connect to database");

    let id = state.registry.open(&config).await?;
    match state.codec.issue(&id) {
        Ok(token) => Ok(Json(TokenResponse { token })),
        Err(e) => {
            state.registry.close(&id).await;
            Err(e)
        }
    }
}

pub(super) async fn disconnect(
    State(state): State<GatewayState>,
    SessionAuth(id): SessionAuth,
) -> StatusCode {
    state.registry.close(&id).await;
    StatusCode::OK
}

pub(super) async fn databases(
    State(state): State<GatewayState>,
    SessionAuth(id): SessionAuth,
) -> Result<Json<Vec<String>>> {
    Ok(Json(state.inspector.list_databases(&id).await?))
}

pub(super) async fn tables(
    State(state): State<GatewayState>,
    SessionAuth(id): SessionAuth,
    query: std::result::Result<Query<TablesParams>, QueryRejection>,
) -> Result<Json<TablePage>> {
    let TablesParams {
        database,
        offset,
        limit,
    } = params(query)?;
    let page = state
        .inspector
        .list_tables(&id, &database, offset, limit)
        .await?;
    Ok(Json(page))
}

pub(super) async fn select_database(
    State(state): State<GatewayState>,
    SessionAuth(id): SessionAuth,
    payload: std::result::Result<Json<SelectDatabaseRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let request = body(payload)?;
    state.registry.select_database(&id, &request.database).await?;
    Ok(Json(MessageResponse {
        message: "Database selected successfully",
    }))
}

pub(super) async fn query(
    State(state): State<GatewayState>,
    SessionAuth(id): SessionAuth,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryOutcome>> {
    let request = body(payload)?;
    Ok(Json(state.executor.execute(&id, &request.query).await?))
}

pub(super) async fn table_structure(
    State(state): State<GatewayState>,
    SessionAuth(id): SessionAuth,
    query: std::result::Result<Query<TableParams>, QueryRejection>,
) -> Result<Json<Vec<Record>>> {
    let TableParams { database, table } = params(query)?;
    Ok(Json(
        state
            .inspector
            .table_structure(&id, &database, &table)
            .await?,
    ))
}

pub(super) async fn table_indexes(
    State(state): State<GatewayState>,
    SessionAuth(id): SessionAuth,
    query: std::result::Result<Query<TableParams>, QueryRejection>,
) -> Result<Json<Vec<Record>>> {
    let TableParams { database, table } = params(query)?;
    Ok(Json(
        state.inspector.table_indexes(&id, &database, &table).await?,
    ))
}

pub(super) async fn create_statement(
    State(state): State<GatewayState>,
    SessionAuth(id): SessionAuth,
    query: std::result::Result<Query<TableParams>, QueryRejection>,
) -> Result<Json<StatementResponse>> {
    let TableParams { database, table } = params(query)?;
    let statement = state
        .inspector
        .create_statement(&id, &database, &table)
        .await?;
    Ok(Json(StatementResponse { statement }))
}

pub(super) async fn alter_table(
    State(state): State<GatewayState>,
    SessionAuth(id): SessionAuth,
    payload: std::result::Result<Json<AlterTableRequest>, JsonRejection>,
) -> Result<StatusCode> {
    let request = body(payload)?;
    state
        .inspector
        .alter_table(&id, &request.database, &request.table, &request.alter_sql)
        .await?;
    Ok(StatusCode::OK)
}

pub(super) async fn export_excel(
    State(state): State<GatewayState>,
    SessionAuth(id): SessionAuth,
    payload: std::result::Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Response> {
    export(state, id, body(payload)?, ExportFormat::Xlsx).await
}

pub(super) async fn export_csv(
    State(state): State<GatewayState>,
    SessionAuth(id): SessionAuth,
    payload: std::result::Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Response> {
    export(state, id, body(payload)?, ExportFormat::Csv).await
}

async fn export(
    state: GatewayState,
    id: crate::session::SessionId,
    request: ExportRequest,
    format: ExportFormat,
) -> Result<Response> {
    let filename = format.filename(request.filename.as_deref());
    let bytes = state
        .exporter
        .export(&id, &request.query, format)
        .await
        .inspect_err(|e| warn!(session = %id, ?format, error = %e, "Export failed"))?;

    let headers = [
        (header::CONTENT_TYPE, format.media_type().to_string()),
        (header::CONTENT_DISPOSITION, content_disposition(&filename)),
    ];
    Ok((headers, bytes).into_response())
}

pub(super) async fn downloads(
    State(state): State<GatewayState>,
) -> Json<BTreeMap<&'static str, String>> {
    Json(state.downloads.as_ref().clone())
}
