use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events sent over the WebSocket gateway.
///
/// Change events deliberately carry no payload delta. A consumer reacts by
/// refetching the affected list or count, which is idempotent; applying
/// deltas would require ordering guarantees the gateway does not provide.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, email: String },

    /// An invite addressed to `invited_user_id` was created or resolved
    InviteChanged { invited_user_id: Uuid },

    /// A folder the user can see gained or lost content
    FolderChanged { folder_id: Uuid },
}

impl GatewayEvent {
    /// Returns the user this event is targeted at, if it is user-scoped.
    /// Events that return `None` are broadcast to all connected clients.
    pub fn target_user(&self) -> Option<Uuid> {
        match self {
            Self::InviteChanged { invited_user_id } => Some(*invited_user_id),
            _ => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },
}
