use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use cirrus_types::api::{Claims, FileListResponse, SignedUrlResponse, UploadResponse};
use cirrus_types::events::GatewayEvent;
use cirrus_types::models::FileObject;

use crate::auth::AppState;
use crate::file_from_row;
use crate::folders::folder_access;

/// 50 MB upload limit
const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// Signed URLs default to 10 minutes and cap at 24 hours.
const DEFAULT_URL_TTL: u64 = 600;
const MAX_URL_TTL: u64 = 24 * 60 * 60;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub name: String,
}

/// POST /folders/{folder_id}/files?name= — accepts raw bytes
/// (application/octet-stream), writes the blob under a fresh write-once
/// key, then inserts the metadata row. A failed insert removes the blob
/// again so neither side leaks.
pub async fn upload_file(
    State(state): State<AppState>,
    Path(folder_id): Path<Uuid>,
    Query(query): Query<UploadQuery>,
    Extension(claims): Extension<Claims>,
    bytes: Bytes,
) -> Result<impl IntoResponse, StatusCode> {
    if bytes.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if bytes.len() > MAX_FILE_SIZE {
        return Err(StatusCode::PAYLOAD_TOO_LARGE);
    }
    let name = query.name.trim();
    if name.is_empty() || name.contains('/') {
        return Err(StatusCode::BAD_REQUEST);
    }

    let fid = folder_id.to_string();
    folder_access(&state, &fid, &claims.sub)?;

    let file_id = Uuid::new_v4();
    let key = format!("{}/{}", folder_id, file_id);
    let size = bytes.len() as i64;

    state.storage.put(&key, &bytes).await.map_err(|e| {
        error!("Storage put failed for {}: {}", key, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    // Blocking insert off the async runtime
    let db = state.clone();
    let insert_key = key.clone();
    let insert_name = name.to_string();
    let uid = claims.sub.to_string();
    let fid_clone = fid.clone();
    let file_id_str = file_id.to_string();
    let insert_result = tokio::task::spawn_blocking(move || {
        db.db
            .insert_file(&file_id_str, &fid_clone, &uid, &insert_name, size, &insert_key)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if let Err(e) = insert_result {
        error!("File metadata insert failed for {}: {} — removing blob", key, e);
        for (path, err) in state.storage.remove(&[key.clone()]).await {
            warn!("Compensation remove failed for {}: {}", path, err);
            if let Err(e) = state.db.record_orphan(&path, "metadata insert failed, blob remove failed") {
                error!("Failed to record orphan {}: {}", path, e);
            }
        }
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    state.dispatcher.dispatch(GatewayEvent::FolderChanged { folder_id }).await;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            file: FileObject {
                id: file_id,
                folder_id,
                owner_id: claims.sub,
                name: name.to_string(),
                size,
                path: key,
                created_at: chrono::Utc::now(),
            },
        }),
    ))
}

pub async fn list_files(
    State(state): State<AppState>,
    Path(folder_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let fid = folder_id.to_string();
    folder_access(&state, &fid, &claims.sub)?;

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_files(&fid))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(FileListResponse {
        files: rows.iter().map(file_from_row).collect(),
    }))
}

/// DELETE /files/{file_id} — storage object first, then the metadata row.
/// A row-delete failure after the object is gone flags the key for
/// reconciliation rather than leaving the drift silent.
pub async fn delete_file(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let file = state
        .db
        .get_file(&file_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let folder = folder_access(&state, &file.folder_id, &claims.sub)?;
    let uid = claims.sub.to_string();
    if file.owner_id != uid && folder.owner_id != uid {
        return Err(StatusCode::FORBIDDEN);
    }

    let failures = state.storage.remove(&[file.path.clone()]).await;
    if let Some((path, err)) = failures.into_iter().next() {
        // Nothing changed yet; the client can simply retry.
        error!("Storage remove failed for {}: {}", path, err);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let deleted = state.db.delete_file(&file.id).map_err(|e| {
        error!("File metadata delete failed for {}: {} — flagging for reconciliation", file.id, e);
        if let Err(orphan_err) = state.db.record_orphan(&file.path, "metadata delete failed after blob removal") {
            error!("Failed to record orphan {}: {}", file.path, orphan_err);
        }
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if !deleted {
        warn!("File row {} vanished between fetch and delete", file.id);
    }

    let folder_id = crate::parse_uuid(&file.folder_id, "file");
    state.dispatcher.dispatch(GatewayEvent::FolderChanged { folder_id }).await;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SignedUrlQuery {
    pub ttl: Option<u64>,
}

/// GET /files/{file_id}/url?ttl= — time-limited read access to a private
/// object. The returned path needs no bearer token.
pub async fn create_signed_url(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
    Query(query): Query<SignedUrlQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let file = state
        .db
        .get_file(&file_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    folder_access(&state, &file.folder_id, &claims.sub)?;

    let ttl = query.ttl.unwrap_or(DEFAULT_URL_TTL).min(MAX_URL_TTL);
    let signed = state
        .signer
        .create_signed_url(&file.path, ttl, chrono::Utc::now().timestamp());

    Ok(Json(SignedUrlResponse {
        url: signed.path_and_query,
        expires_at: signed.expires_at,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub expires: i64,
    pub sig: String,
}

/// GET /download/{key}?expires=&sig= — public route gated solely by the
/// URL signature.
pub async fn download(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    if !state
        .signer
        .verify(&key, query.expires, &query.sig, chrono::Utc::now().timestamp())
    {
        return Err(StatusCode::FORBIDDEN);
    }

    let data = state.storage.read(&key).await.map_err(|e| {
        warn!("Download read failed for {}: {}", key, e);
        StatusCode::NOT_FOUND
    })?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        data,
    ))
}
