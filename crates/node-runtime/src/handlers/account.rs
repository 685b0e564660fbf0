use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use nimbus_storage::ListObjectsQuery;
use nimbus_types::Principal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::container::AppState;
use crate::error::ApiError;

use super::{request_context, unix_now};

#[derive(Debug, Deserialize, Default)]
pub struct ListContainersQuery {
    pub prefix: Option<String>,
    pub marker: Option<String>,
    pub limit: Option<usize>,
    pub until: Option<i64>,
    #[serde(default)]
    pub show_only_shared: bool,
}

impl From<ListContainersQuery> for ListObjectsQuery {
    fn from(q: ListContainersQuery) -> Self {
        ListObjectsQuery {
            prefix: q.prefix.unwrap_or_default(),
            delimiter: None,
            marker: q.marker,
            limit: q.limit,
            until: q.until,
            show_only_shared: q.show_only_shared,
            meta_domain: None,
        }
    }
}

pub async fn account_stats(
    State(state): State<AppState>,
    Path(account): Path<String>,
    headers: HeaderMap,
) -> Result<Json<nimbus_storage::AccountStats>, ApiError> {
    let ctx = request_context(&headers, account);
    let stats = state.facade.account_stats(&ctx, unix_now())?;
    Ok(Json(stats))
}

pub async fn list_containers(
    State(state): State<AppState>,
    Path(account): Path<String>,
    Query(query): Query<ListContainersQuery>,
    headers: HeaderMap,
) -> Result<Json<nimbus_storage::ContainerListing>, ApiError> {
    let ctx = request_context(&headers, account);
    let listing = state
        .facade
        .list_containers(&ctx, &query.into(), unix_now())?;
    Ok(Json(listing))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub domain: String,
    /// `key -> Some(value)` sets, `key -> None` deletes.
    #[serde(default)]
    pub meta: BTreeMap<String, Option<String>>,
    /// `group_name -> members`. Each entry replaces that group's member list.
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<Principal>>,
}

#[derive(Debug, Serialize, Default)]
pub struct UpdateAccountResponse {
    pub groups: BTreeMap<String, Vec<Principal>>,
}

pub async fn update_account(
    State(state): State<AppState>,
    Path(account): Path<String>,
    headers: HeaderMap,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<Json<UpdateAccountResponse>, ApiError> {
    let ctx = request_context(&headers, account);
    let at = unix_now();

    if !request.meta.is_empty() {
        let updates = request.meta.into_iter().collect();
        state.facade.update_account_meta(&ctx, &request.domain, updates, at)?;
    }
    for (group, members) in request.groups {
        state.facade.update_account_groups(&ctx, &group, members)?;
    }
    let groups = state.facade.get_account_groups(&ctx)?;
    Ok(Json(UpdateAccountResponse { groups }))
}
