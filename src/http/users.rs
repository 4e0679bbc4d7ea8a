use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, Method, Uri};
use axum::response::{IntoResponse, Response};

use super::AppState;
use crate::cache;
use crate::error::Result;

/// List every user with their entry count and latest entry
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> Result<Response> {
    let key = cache::request_key(method.as_str(), uri.path(), uri.query());
    let body = state.users.rendered_listing(&key).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}
