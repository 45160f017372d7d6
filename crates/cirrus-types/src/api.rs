use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{FileObject, Folder, InviteDecision, InviteStatus, Profile, User};

// -- JWT Claims --

/// JWT claims shared across cirrus-api (REST middleware) and cirrus-gateway
/// (WebSocket authentication). Canonical definition lives here in
/// cirrus-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: User,
}

// -- Folders --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateFolderRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FolderListResponse {
    pub folders: Vec<Folder>,
}

// -- Files --

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file: FileObject,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileListResponse {
    pub files: Vec<FileObject>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignedUrlResponse {
    pub url: String,
    pub expires_at: i64,
}

// -- Invites --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendInviteRequest {
    pub folder_id: Uuid,
    pub invited_user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InviteResponse {
    pub id: Uuid,
    pub folder_id: Uuid,
    pub invited_user_id: Uuid,
    pub status: InviteStatus,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveInviteRequest {
    pub decision: InviteDecision,
}

/// A pending invite enriched with the referenced folder's name and the
/// inviter's profile, ready for display in the request inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingInvite {
    pub id: Uuid,
    pub folder_id: Uuid,
    pub folder_name: Option<String>,
    pub inviter: Option<Profile>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PendingInviteListResponse {
    pub invites: Vec<PendingInvite>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PendingCountResponse {
    pub count: u64,
}

// -- Profiles --

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileListResponse {
    pub profiles: Vec<Profile>,
}
