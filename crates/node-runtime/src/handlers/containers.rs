use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use nimbus_policy::{Policy, PolicyPatch, VersioningMode};
use nimbus_storage::{ContainerSummary, ListObjectsQuery, ObjectListing};
use nimbus_types::CoreError;
use serde::Deserialize;

use crate::container::AppState;
use crate::error::ApiError;

use super::{request_context, unix_now};

fn parse_versioning(s: &str) -> Result<VersioningMode, ApiError> {
    VersioningMode::parse(s).ok_or_else(|| {
        ApiError(nimbus_types::CoreError::BadRequest(format!(
            "versioning must be \"auto\" or \"none\", got {s:?}"
        )))
    })
}

#[derive(Debug, Deserialize, Default)]
pub struct PutContainerRequest {
    pub quota: Option<u64>,
    pub versioning: Option<String>,
    pub project: Option<String>,
}

pub async fn put_container(
    State(state): State<AppState>,
    Path((account, container)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ContainerSummary>, ApiError> {
    let ctx = request_context(&headers, account);
    let request: PutContainerRequest = if body.is_empty() {
        PutContainerRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|err| ApiError(CoreError::BadRequest(format!("invalid request body: {err}"))))?
    };
    let versioning = request.versioning.as_deref().map(parse_versioning).transpose()?;
    let summary = state.facade.put_container(
        &ctx,
        &container,
        request.quota,
        versioning,
        request.project,
        unix_now(),
    )?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateContainerPolicyRequest {
    pub quota: Option<u64>,
    pub versioning: Option<String>,
    pub project: Option<String>,
    #[serde(default)]
    pub replace: bool,
}

pub async fn update_container_policy(
    State(state): State<AppState>,
    Path((account, container)): Path<(String, String)>,
    headers: HeaderMap,
    Json(request): Json<UpdateContainerPolicyRequest>,
) -> Result<Json<Policy>, ApiError> {
    let ctx = request_context(&headers, account);
    let versioning = request.versioning.as_deref().map(parse_versioning).transpose()?;
    let patch = PolicyPatch {
        quota: request.quota,
        versioning,
        project: request.project,
    };
    let updated = state
        .facade
        .update_container_policy(&ctx, &container, patch, request.replace, unix_now())?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize, Default)]
pub struct DeleteContainerQuery {
    pub until: Option<i64>,
    pub delimiter: Option<char>,
}

pub async fn delete_container(
    State(state): State<AppState>,
    Path((account, container)): Path<(String, String)>,
    Query(query): Query<DeleteContainerQuery>,
    headers: HeaderMap,
) -> Result<(), ApiError> {
    let ctx = request_context(&headers, account);
    state
        .facade
        .delete_container(&ctx, &container, query.until, query.delimiter, unix_now())?;
    Ok(())
}

#[derive(Debug, Deserialize, Default)]
pub struct ListObjectsQueryParams {
    pub prefix: Option<String>,
    pub delimiter: Option<char>,
    pub marker: Option<String>,
    pub limit: Option<usize>,
    pub until: Option<i64>,
    #[serde(default)]
    pub show_only_shared: bool,
    pub meta: Option<String>,
}

impl From<ListObjectsQueryParams> for ListObjectsQuery {
    fn from(q: ListObjectsQueryParams) -> Self {
        ListObjectsQuery {
            prefix: q.prefix.unwrap_or_default(),
            delimiter: q.delimiter,
            marker: q.marker,
            limit: q.limit,
            until: q.until,
            show_only_shared: q.show_only_shared,
            meta_domain: q.meta,
        }
    }
}

pub async fn list_objects(
    State(state): State<AppState>,
    Path((account, container)): Path<(String, String)>,
    Query(query): Query<ListObjectsQueryParams>,
    headers: HeaderMap,
) -> Result<Json<ObjectListing>, ApiError> {
    let ctx = request_context(&headers, account);
    let listing = state
        .facade
        .list_objects(&ctx, &container, &query.into(), unix_now())?;
    Ok(Json(listing))
}
