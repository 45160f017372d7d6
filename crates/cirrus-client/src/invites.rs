use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use cirrus_types::api::PendingInvite;
use cirrus_types::models::{InviteDecision, Profile};

use crate::backend::{Backend, BackendError};

/// The invitee's request inbox: the local view of pending invites.
///
/// A fetch failure degrades to an empty list rather than an error surface;
/// the next successful refresh reconciles. Resolution is strictly
/// optimistic-after-ack: an entry leaves the local list only once the
/// backend confirmed the transition.
pub struct InviteInbox<B: Backend> {
    backend: Arc<B>,
    entries: Vec<PendingInvite>,
}

impl<B: Backend> InviteInbox<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            entries: Vec::new(),
        }
    }

    /// Pending invites, newest first (server ordering is preserved).
    pub fn entries(&self) -> &[PendingInvite] {
        &self.entries
    }

    pub async fn refresh(&mut self) {
        match self.backend.list_pending_invites().await {
            Ok(invites) => self.entries = invites,
            Err(e) => {
                warn!("Pending invite fetch failed: {}", e);
                self.entries.clear();
            }
        }
    }

    /// Accept or reject. The local removal happens after — never before —
    /// the backend acknowledges, so a failed write cannot present an invite
    /// as resolved.
    pub async fn resolve(
        &mut self,
        invite_id: Uuid,
        decision: InviteDecision,
    ) -> Result<(), BackendError> {
        self.backend.resolve_invite(invite_id, decision).await?;
        self.entries.retain(|invite| invite.id != invite_id);
        Ok(())
    }
}

/// Live count of pending invites for the notification badge.
///
/// Change notifications carry no delta; every one triggers a full recount,
/// which is idempotent. Between a failed recount and the next successful
/// one the badge may disagree with the backend — an accepted
/// eventual-consistency gap, resolved by the next refresh.
pub struct PendingBadge<B: Backend> {
    backend: Arc<B>,
    count: u64,
}

impl<B: Backend> PendingBadge<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend, count: 0 }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub async fn refresh(&mut self) {
        match self.backend.count_pending_invites().await {
            Ok(count) => self.count = count,
            Err(e) => warn!("Pending count fetch failed, keeping {}: {}", self.count, e),
        }
    }

    /// Invoked for every invite change notification addressed to this user.
    pub async fn on_notification(&mut self) {
        self.refresh().await;
    }
}

/// The owner's share dialog: the list of invitable users plus a soft,
/// session-local guard against double-submitting the same invitee. This is
/// a UI convenience, not a uniqueness constraint — the data layer accepts
/// repeat invites deliberately.
pub struct ShareDialog<B: Backend> {
    backend: Arc<B>,
    folder_id: Uuid,
    users: Vec<Profile>,
    already_invited: HashSet<Uuid>,
}

impl<B: Backend> ShareDialog<B> {
    pub fn new(backend: Arc<B>, folder_id: Uuid) -> Self {
        Self {
            backend,
            folder_id,
            users: Vec::new(),
            already_invited: HashSet::new(),
        }
    }

    pub fn users(&self) -> &[Profile] {
        &self.users
    }

    pub fn is_invited(&self, user_id: Uuid) -> bool {
        self.already_invited.contains(&user_id)
    }

    pub async fn load_users(&mut self) {
        match self.backend.list_profiles().await {
            Ok(profiles) => self.users = profiles,
            Err(e) => {
                warn!("User list fetch failed: {}", e);
                self.users.clear();
            }
        }
    }

    /// Send an invite; a second call for the same invitee in this dialog
    /// session is rejected locally without a request.
    pub async fn invite(&mut self, invited_user_id: Uuid) -> Result<(), BackendError> {
        if self.already_invited.contains(&invited_user_id) {
            return Err(BackendError::InvalidState("already invited".into()));
        }
        self.backend.send_invite(self.folder_id, invited_user_id).await?;
        self.already_invited.insert(invited_user_id);
        Ok(())
    }
}
