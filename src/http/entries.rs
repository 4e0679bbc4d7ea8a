use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::Json;
use serde::Deserialize;

use super::AppState;
use crate::error::{AppError, Result};
use crate::models::{Entry, EntryPayload};
use crate::pagination::PageRequest;
use crate::services::EntryPage;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
}

/// List entries, newest first
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    params: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<EntryPage>> {
    // An unreadable query string can only mean a bad page.
    let Query(params) = params.map_err(|rejection| {
        tracing::debug!("Rejected query string: {}", rejection.body_text());
        AppError::OutOfRange {
            page: uri.query().unwrap_or_default().to_string(),
        }
    })?;
    let request = PageRequest::parse(params.page.as_deref())?;
    let request_url = state.request_url(&uri);
    let page = state.entries.list(request, &request_url).await?;
    Ok(Json(page))
}

/// Submit a new entry, creating its user on first use
pub async fn create_entry(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<EntryPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Entry>)> {
    let Json(payload) = payload.map_err(|rejection| AppError::Parse(rejection.body_text()))?;
    let entry = state.entries.create(payload).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}
