//! `GET /public/{token}`: the only unauthenticated route, resolving a
//! previously minted public-share token straight to its bound path (§4.3
//! "Public read"). Whether the caller may then actually fetch that path is
//! enforced by the normal object route's own permission check.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::container::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct ResolvedPublicPath {
    pub path: Option<String>,
}

pub async fn resolve(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ResolvedPublicPath>, ApiError> {
    let path = state.facade.resolve_public_token(&token)?;
    Ok(Json(ResolvedPublicPath { path }))
}
