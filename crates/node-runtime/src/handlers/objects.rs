//! `PUT`/`GET`/`HEAD`/`POST`/`DELETE` on `/{account}/{container}/*name`.
//!
//! `PUT` accepts two request shapes, selected by `X-Object-Hash`: `map`
//! means the body is a JSON array of hex block hashes already uploaded via
//! [`put_block`]; anything else (or an absent header) means the body is raw
//! object bytes, which this handler chunks into `block_size`-sized blocks
//! and stores itself before building the hashmap. Either way, a missing
//! block short-circuits with `409` and the list of hashes still needed.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use nimbus_block_store::{BlockStoreApi, Hashmap};
use nimbus_permissions::AccessList;
use nimbus_storage::{PutObjectOutcome, PutObjectRequest};
use nimbus_types::{hex_decode, hex_encode, CoreError, Hash, Serial};
use serde::{Deserialize, Serialize};

use crate::container::AppState;
use crate::error::ApiError;

use super::{request_context, unix_now};

const HASH_HEADER: &str = "x-object-hash";
const CONTENT_TYPE_HEADER: &str = "content-type";
const CHECKSUM_HEADER: &str = "x-object-checksum";
const DOMAIN_HEADER: &str = "x-object-meta-domain";
const REGISTER_HEADER: &str = "x-object-register";

fn decode_hashes(raw: &[String]) -> Result<Vec<Hash>, ApiError> {
    raw.iter().map(|h| hex_decode(h).map_err(ApiError)).collect()
}

fn block_chunks(body: &[u8], block_size: usize) -> Vec<&[u8]> {
    if body.is_empty() {
        return vec![&body[..0]];
    }
    body.chunks(block_size.max(1)).collect()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MissingBlocksResponse {
    pub missing: Vec<String>,
}

pub async fn put_object(
    State(state): State<AppState>,
    Path((account, container, name)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let ctx = request_context(&headers, account);
    let at = unix_now();

    let is_map_upload = header_str(&headers, HASH_HEADER) == Some("map");
    let register = header_str(&headers, REGISTER_HEADER) == Some("true");
    let content_type = header_str(&headers, CONTENT_TYPE_HEADER)
        .unwrap_or("application/octet-stream")
        .to_string();
    let checksum = header_str(&headers, CHECKSUM_HEADER).unwrap_or("").to_string();
    let domain = header_str(&headers, DOMAIN_HEADER).unwrap_or("user").to_string();

    let (hashmap, size) = if is_map_upload {
        let hashes: Vec<String> = serde_json::from_slice(&body)
            .map_err(|err| ApiError(CoreError::BadRequest(format!("invalid hashmap body: {err}"))))?;
        let hashes = decode_hashes(&hashes)?;
        (Hashmap::from_blocks(hashes), body.len() as u64)
    } else {
        let block_size = state.config.block_size;
        let mut hashmap = Hashmap::new();
        for chunk in block_chunks(&body, block_size) {
            let hash = state.blocks.put_block(chunk)?;
            hashmap.push(hash);
        }
        (hashmap, body.len() as u64)
    };

    let request = PutObjectRequest {
        size,
        content_type,
        checksum,
        domain,
        meta: Vec::new(),
        replace_meta: false,
        permissions: None,
    };

    let outcome = if register {
        state
            .facade
            .register_object_map(&ctx, &container, &name, request, hashmap, at)?
    } else {
        state
            .facade
            .update_object_hashmap(&ctx, &container, &name, request, hashmap, at)?
    };

    match outcome {
        PutObjectOutcome::Created { version_serial, root_hash } => Ok((
            StatusCode::CREATED,
            Json(serde_json::json!({
                "version_serial": version_serial,
                "root_hash": hex_encode(&root_hash),
            })),
        )
            .into_response()),
        PutObjectOutcome::MissingBlocks(missing) => Ok((
            StatusCode::CONFLICT,
            Json(MissingBlocksResponse { missing: missing.iter().map(hex_encode).collect() }),
        )
            .into_response()),
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct GetObjectQuery {
    /// §6 "GET ... with ... version": fetch a specific historical generation
    /// instead of the current one.
    pub version: Option<Serial>,
}

/// Parses a single-range `bytes=start-end` / `bytes=start-` header (§6
/// "range"). Multi-range requests and `bytes=-suffix` are not accepted;
/// callers fall back to a full `200` response, matching how a client
/// treats an unsatisfiable range request.
fn parse_range(header: &str, len: u64) -> Option<(u64, u64)> {
    let spec = header.strip_prefix("bytes=")?;
    if spec.contains(',') {
        return None;
    }
    let (start, end) = spec.split_once('-')?;
    let start: u64 = start.parse().ok()?;
    let end: u64 = if end.is_empty() { len.saturating_sub(1) } else { end.parse().ok()? };
    if start > end || start >= len {
        return None;
    }
    Some((start, end.min(len.saturating_sub(1))))
}

pub async fn get_object(
    State(state): State<AppState>,
    Path((account, container, name)): Path<(String, String, String)>,
    Query(query): Query<GetObjectQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ctx = request_context(&headers, account);
    let at = unix_now();
    let version = match query.version {
        Some(serial) => state.facade.get_object_version_at_serial(&ctx, &container, &name, serial)?,
        None => state.facade.get_object_version(&ctx, &container, &name, at)?,
    };

    let etag = version.hash.map(|h| hex_encode(&h));
    if let Some(etag) = &etag {
        if header_str(&headers, "if-none-match") == Some(etag.as_str()) {
            let mut response = StatusCode::NOT_MODIFIED.into_response();
            response.headers_mut().insert("etag", etag.parse().unwrap());
            return Ok(response);
        }
    }

    let data = if let Some(hash) = version.hash {
        let hashmap = state.blocks.map_get(&hash)?;
        let mut data = Vec::with_capacity(version.size as usize);
        for block_hash in hashmap.blocks() {
            data.extend(state.blocks.get_block(block_hash)?);
        }
        data
    } else {
        Vec::new()
    };

    let range = header_str(&headers, "range").and_then(|r| parse_range(r, data.len() as u64));

    let mut response = match range {
        Some((start, end)) => {
            let slice = data[start as usize..=end as usize].to_vec();
            let mut response = (StatusCode::PARTIAL_CONTENT, slice).into_response();
            response.headers_mut().insert(
                "content-range",
                format!("bytes {start}-{end}/{}", data.len()).parse().unwrap(),
            );
            response
        }
        None => (StatusCode::OK, data).into_response(),
    };

    response.headers_mut().insert(
        axum::http::header::CONTENT_TYPE,
        version.content_type.parse().unwrap_or_else(|_| "application/octet-stream".parse().unwrap()),
    );
    response
        .headers_mut()
        .insert("x-object-version", version.serial.to_string().parse().unwrap());
    response.headers_mut().insert("accept-ranges", "bytes".parse().unwrap());
    if let Some(etag) = etag {
        response.headers_mut().insert("etag", etag.parse().unwrap());
    }
    Ok(response)
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateObjectRequest {
    #[serde(default)]
    pub domain: String,
    /// `key -> Some(value)` sets, `key -> None` deletes.
    #[serde(default)]
    pub meta: std::collections::BTreeMap<String, Option<String>>,
    pub read: Option<Vec<String>>,
    pub write: Option<Vec<String>>,
    pub public: Option<bool>,
    pub copy_from: Option<String>,
    pub move_from: Option<String>,
}

#[derive(Debug, Serialize, Default)]
pub struct UpdateObjectResponse {
    pub public_url: Option<String>,
}

pub async fn update_object(
    State(state): State<AppState>,
    Path((account, container, name)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(request): Json<UpdateObjectRequest>,
) -> Result<Json<UpdateObjectResponse>, ApiError> {
    let ctx = request_context(&headers, account);
    let at = unix_now();

    if let Some(source) = &request.copy_from {
        let (src_container, src_name) = split_source(source)?;
        state
            .facade
            .copy_object(&ctx, &src_container, &src_name, &container, &name, at)?;
    }
    if let Some(source) = &request.move_from {
        let (src_container, src_name) = split_source(source)?;
        state
            .facade
            .move_object(&ctx, &src_container, &src_name, &container, &name, at)?;
    }

    if !request.meta.is_empty() {
        let domain = if request.domain.is_empty() { "user".to_string() } else { request.domain.clone() };
        let updates = request.meta.clone().into_iter().collect();
        state.facade.update_object_meta(&ctx, &container, &name, &domain, updates, at)?;
    }

    if request.read.is_some() || request.write.is_some() {
        let list = AccessList {
            read: request.read.unwrap_or_default().into_iter().map(Into::into).collect(),
            write: request.write.unwrap_or_default().into_iter().map(Into::into).collect(),
        };
        state.facade.update_object_permissions(&ctx, &container, &name, list, at)?;
    }

    let mut public_url = None;
    if let Some(public) = request.public {
        public_url = state.facade.update_object_public(&ctx, &container, &name, public, at)?;
    }

    Ok(Json(UpdateObjectResponse { public_url }))
}

fn split_source(source: &str) -> Result<(String, String), ApiError> {
    let mut parts = source.splitn(2, '/');
    let container = parts.next().unwrap_or_default().to_string();
    let name = parts
        .next()
        .ok_or_else(|| ApiError(CoreError::BadRequest(format!("copy/move source must be container/name, got {source:?}"))))?
        .to_string();
    Ok((container, name))
}

pub async fn delete_object(
    State(state): State<AppState>,
    Path((account, container, name)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<(), ApiError> {
    let ctx = request_context(&headers, account);
    state.facade.delete_object(&ctx, &container, &name, unix_now())?;
    Ok(())
}
