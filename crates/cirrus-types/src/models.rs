use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated identity as seen by clients. Credentials never leave
/// the server; this is what a session probe or login returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Display profile attached to a user. Fetched lazily after authentication;
/// a session can be authenticated without a profile loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Metadata for a stored object. `path` is the write-once storage key; the
/// blob itself lives in cirrus-storage under that key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileObject {
    pub id: Uuid,
    pub folder_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub size: i64,
    pub path: String,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a folder invitation. Transitions leave `Pending` exactly
/// once; `Accepted` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderInvite {
    pub id: Uuid,
    pub folder_id: Uuid,
    pub invited_by: Uuid,
    pub invited_user_id: Uuid,
    pub status: InviteStatus,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

/// A decision an invitee can take on a pending invite. Deliberately narrower
/// than `InviteStatus`: there is no way to "decide" pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteDecision {
    Accepted,
    Rejected,
}

impl InviteDecision {
    pub fn as_status(&self) -> InviteStatus {
        match self {
            Self::Accepted => InviteStatus::Accepted,
            Self::Rejected => InviteStatus::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_status_round_trips_names() {
        for status in [InviteStatus::Pending, InviteStatus::Accepted, InviteStatus::Rejected] {
            assert_eq!(InviteStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(InviteStatus::parse("expired"), None);
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!InviteStatus::Pending.is_terminal());
        assert!(InviteStatus::Accepted.is_terminal());
        assert!(InviteStatus::Rejected.is_terminal());
    }
}
