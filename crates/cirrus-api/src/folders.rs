use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, warn};
use uuid::Uuid;

use cirrus_db::models::FolderRow;
use cirrus_types::api::{Claims, CreateFolderRequest, FolderListResponse};
use cirrus_types::events::GatewayEvent;
use cirrus_types::models::Folder;

use crate::auth::{AppState, AppStateInner};
use crate::folder_from_row;

const MAX_FOLDER_NAME: usize = 100;

pub async fn create_folder(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateFolderRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let name = req.name.trim();
    if name.is_empty() || name.len() > MAX_FOLDER_NAME {
        return Err(StatusCode::BAD_REQUEST);
    }

    let folder_id = Uuid::new_v4();
    state
        .db
        .create_folder(&folder_id.to_string(), name, &claims.sub.to_string())
        .map_err(|e| {
            error!("create_folder failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok((
        StatusCode::CREATED,
        Json(Folder {
            id: folder_id,
            name: name.to_string(),
            owner_id: claims.sub,
            created_at: chrono::Utc::now(),
        }),
    ))
}

/// Owned folders plus accepted collaborations, newest first.
pub async fn list_folders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let uid = claims.sub.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.list_folders_for_user(&uid))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(FolderListResponse {
        folders: rows.iter().map(folder_from_row).collect(),
    }))
}

/// Owner-only. Two-phase: storage objects first, then metadata rows.
/// Objects that fail to delete are flagged in the reconciliation log so a
/// later sweep can retry; the metadata delete proceeds regardless.
pub async fn delete_folder(
    State(state): State<AppState>,
    Path(folder_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let fid = folder_id.to_string();
    let folder = state
        .db
        .get_folder(&fid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    if folder.owner_id != claims.sub.to_string() {
        return Err(StatusCode::FORBIDDEN);
    }

    let paths: Vec<String> = state
        .db
        .list_files(&fid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_iter()
        .map(|f| f.path)
        .collect();

    for (path, err) in state.storage.remove(&paths).await {
        warn!("Storage remove failed for {}: {} — flagging for reconciliation", path, err);
        if let Err(e) = state.db.record_orphan(&path, "storage remove failed during folder delete") {
            error!("Failed to record orphan {}: {}", path, e);
        }
    }

    let db = state.clone();
    let fid_clone = fid.clone();
    tokio::task::spawn_blocking(move || db.db.delete_folder(&fid_clone))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            // Blobs are gone but rows remain; a retried delete will converge.
            error!("Folder metadata delete failed for {}: {}", fid, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    state.dispatcher.dispatch(GatewayEvent::FolderChanged { folder_id }).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Owner or accepted collaborator. Returns the folder row so callers can
/// make further owner-only decisions.
pub(crate) fn folder_access(
    state: &AppStateInner,
    folder_id: &str,
    user_id: &Uuid,
) -> Result<FolderRow, StatusCode> {
    let folder = state
        .db
        .get_folder(folder_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let uid = user_id.to_string();
    if folder.owner_id == uid {
        return Ok(folder);
    }

    if state
        .db
        .is_collaborator(folder_id, &uid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    {
        return Ok(folder);
    }

    Err(StatusCode::FORBIDDEN)
}
