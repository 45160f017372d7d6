use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rand::RngCore;
use tracing::error;
use uuid::Uuid;

use cirrus_types::api::{
    Claims, InviteResponse, PendingCountResponse, PendingInvite, PendingInviteListResponse,
    ResolveInviteRequest, SendInviteRequest,
};
use cirrus_types::events::GatewayEvent;
use cirrus_types::models::{InviteDecision, InviteStatus};

use crate::auth::AppState;
use crate::{parse_sqlite_timestamp, parse_uuid, profile_from_row};

/// POST /invites — folder owner proposes collaboration. Nothing here
/// deduplicates pending invites for the same (folder, invitee) pair;
/// re-inviting before the first invite resolves is a legitimate flow and
/// each invite resolves independently.
pub async fn send_invite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendInviteRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.invited_user_id == claims.sub {
        return Err(StatusCode::BAD_REQUEST);
    }

    let folder = state
        .db
        .get_folder(&req.folder_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    // Only the owner may share
    if folder.owner_id != claims.sub.to_string() {
        return Err(StatusCode::FORBIDDEN);
    }

    if state
        .db
        .get_user_by_id(&req.invited_user_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .is_none()
    {
        return Err(StatusCode::NOT_FOUND);
    }

    let invite_id = Uuid::new_v4();
    let token = generate_token();

    state
        .db
        .insert_invite(
            &invite_id.to_string(),
            &req.folder_id.to_string(),
            &claims.sub.to_string(),
            &req.invited_user_id.to_string(),
            &token,
        )
        .map_err(|e| {
            error!("insert_invite failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    // Ping the invitee's connections so badge counts recount
    state
        .dispatcher
        .dispatch(GatewayEvent::InviteChanged { invited_user_id: req.invited_user_id })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(InviteResponse {
            id: invite_id,
            folder_id: req.folder_id,
            invited_user_id: req.invited_user_id,
            status: InviteStatus::Pending,
            token,
        }),
    ))
}

/// GET /invites/pending — the caller's pending invites, newest first.
/// Two-step fetch: invite rows, then batched lookups of the referenced
/// folders and inviter profiles. Either enrichment may come back empty
/// (folder deleted, profile missing); the invite is listed regardless.
pub async fn list_pending(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let uid = claims.sub.to_string();

    let (invites, folders, profiles) = tokio::task::spawn_blocking(move || {
        let invites = db
            .db
            .list_pending_invites(&uid)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let folder_ids: Vec<String> = invites.iter().map(|i| i.folder_id.clone()).collect();
        let inviter_ids: Vec<String> = invites.iter().map(|i| i.invited_by.clone()).collect();

        let folders = db
            .db
            .get_folders_by_ids(&folder_ids)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let profiles = db
            .db
            .get_profiles_by_ids(&inviter_ids)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        Ok::<_, StatusCode>((invites, folders, profiles))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    let folder_names: HashMap<&str, &str> = folders
        .iter()
        .map(|f| (f.id.as_str(), f.name.as_str()))
        .collect();
    let inviter_profiles: HashMap<&str, _> = profiles
        .iter()
        .map(|p| (p.id.as_str(), profile_from_row(p)))
        .collect();

    let enriched: Vec<PendingInvite> = invites
        .iter()
        .map(|invite| PendingInvite {
            id: parse_uuid(&invite.id, "invite"),
            folder_id: parse_uuid(&invite.folder_id, "invite"),
            folder_name: folder_names.get(invite.folder_id.as_str()).map(|n| n.to_string()),
            inviter: inviter_profiles.get(invite.invited_by.as_str()).cloned(),
            created_at: parse_sqlite_timestamp(&invite.created_at, "invite"),
        })
        .collect();

    Ok(Json(PendingInviteListResponse { invites: enriched }))
}

/// GET /invites/pending/count — count-only query for the badge.
pub async fn count_pending(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let count = state
        .db
        .count_pending_invites(&claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(PendingCountResponse { count }))
}

/// POST /invites/{invite_id}/resolve — invitee accepts or rejects.
/// Terminal states are immutable: resolving an already-resolved invite is
/// a 409, never a silent overwrite.
pub async fn resolve_invite(
    State(state): State<AppState>,
    Path(invite_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ResolveInviteRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let invite = state
        .db
        .get_invite(&invite_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    // Only the invitee decides
    if invite.invited_user_id != claims.sub.to_string() {
        return Err(StatusCode::FORBIDDEN);
    }

    // Acceptance grants access in the same transaction as the status
    // transition; a terminal invite without its collaborator row would be
    // unrecoverable, since the transition guard turns every retry into a 409.
    let status = req.decision.as_status();
    let transitioned = match req.decision {
        InviteDecision::Accepted => state
            .db
            .accept_invite(&invite.id, &Uuid::new_v4().to_string()),
        InviteDecision::Rejected => state.db.resolve_invite(&invite.id, status.as_str()),
    }
    .map_err(|e| {
        error!("resolve_invite failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if !transitioned {
        return Err(StatusCode::CONFLICT);
    }

    state
        .dispatcher
        .dispatch(GatewayEvent::InviteChanged { invited_user_id: claims.sub })
        .await;

    Ok(Json(InviteResponse {
        id: invite_id,
        folder_id: parse_uuid(&invite.folder_id, "invite"),
        invited_user_id: claims.sub,
        status,
        token: invite.token,
    }))
}

/// Opaque invite token: 32 random bytes, hex-encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
