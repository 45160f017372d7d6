//! In-memory stand-in for a Cirrus server, used by the workflow tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use uuid::Uuid;

use cirrus_client::backend::{AuthSession, Backend, BackendError, SignUpParams};
use cirrus_client::cache::DurableCache;
use cirrus_types::api::PendingInvite;
use cirrus_types::models::{InviteDecision, InviteStatus, Profile, User};

#[derive(Clone)]
struct Account {
    user: User,
    password: String,
    profile: Profile,
}

struct MockInvite {
    id: Uuid,
    folder_id: Uuid,
    folder_name: String,
    invited_by: Uuid,
    invited_user_id: Uuid,
    status: InviteStatus,
    seq: u64,
}

#[derive(Default)]
struct MockState {
    accounts: HashMap<String, Account>,
    session_user: Option<User>,
    folders: HashMap<Uuid, (String, Uuid)>,
    invites: Vec<MockInvite>,
    next_seq: u64,
    fail_profile_fetch: bool,
    fail_invite_list: bool,
}

/// Lets a test hold a profile fetch open while other auth events land.
pub struct ProfileGate {
    pub started: Semaphore,
    release: Semaphore,
}

impl ProfileGate {
    fn new() -> Self {
        Self {
            started: Semaphore::new(0),
            release: Semaphore::new(0),
        }
    }

    pub fn release(&self) {
        self.release.add_permits(1);
    }
}

pub struct MockBackend {
    state: Mutex<MockState>,
    gate: Mutex<Option<Arc<ProfileGate>>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState::default()),
            gate: Mutex::new(None),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }

    pub fn add_account(&self, email: &str, password: &str, first: &str, last: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            created_at: chrono::Utc::now(),
        };
        let profile = Profile {
            id: user.id,
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.to_string(),
        };
        self.lock().accounts.insert(
            email.to_string(),
            Account {
                user: user.clone(),
                password: password.to_string(),
                profile,
            },
        );
        user
    }

    pub fn add_folder(&self, name: &str, owner: &User) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().folders.insert(id, (name.to_string(), owner.id));
        id
    }

    /// Pretend a session already exists server-side (page-reload scenarios).
    pub fn set_server_session(&self, user: Option<User>) {
        self.lock().session_user = user;
    }

    pub fn set_fail_profile_fetch(&self, fail: bool) {
        self.lock().fail_profile_fetch = fail;
    }

    pub fn set_fail_invite_list(&self, fail: bool) {
        self.lock().fail_invite_list = fail;
    }

    pub fn gate_profile_fetches(&self) -> Arc<ProfileGate> {
        let gate = Arc::new(ProfileGate::new());
        *self.gate.lock().expect("gate lock poisoned") = Some(gate.clone());
        gate
    }

    pub fn invite_status(&self, invite_id: Uuid) -> Option<InviteStatus> {
        self.lock()
            .invites
            .iter()
            .find(|i| i.id == invite_id)
            .map(|i| i.status)
    }

    fn current_user(&self) -> Result<User, BackendError> {
        self.lock()
            .session_user
            .clone()
            .ok_or(BackendError::Unauthorized)
    }
}

impl Backend for MockBackend {
    async fn get_session(&self) -> Result<Option<User>, BackendError> {
        Ok(self.lock().session_user.clone())
    }

    async fn sign_up(&self, params: SignUpParams) -> Result<AuthSession, BackendError> {
        {
            let state = self.lock();
            if state.accounts.contains_key(&params.email) {
                return Err(BackendError::AlreadyRegistered);
            }
        }
        let user = self.add_account(
            &params.email,
            &params.password,
            &params.first_name,
            &params.last_name,
        );
        self.lock().session_user = Some(user.clone());
        Ok(AuthSession {
            user,
            token: "mock-token".into(),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let mut state = self.lock();
        let account = state
            .accounts
            .get(email)
            .filter(|a| a.password == password)
            .cloned()
            .ok_or(BackendError::InvalidCredentials)?;
        state.session_user = Some(account.user.clone());
        Ok(AuthSession {
            user: account.user,
            token: "mock-token".into(),
        })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.lock().session_user = None;
        Ok(())
    }

    async fn fetch_profile(&self, user_id: Uuid) -> Result<Profile, BackendError> {
        let gate = self.gate.lock().expect("gate lock poisoned").clone();
        if let Some(gate) = gate {
            gate.started.add_permits(1);
            gate.release
                .acquire()
                .await
                .expect("gate semaphore closed")
                .forget();
        }

        let state = self.lock();
        if state.fail_profile_fetch {
            return Err(BackendError::Network("profile service down".into()));
        }
        state
            .accounts
            .values()
            .find(|a| a.user.id == user_id)
            .map(|a| a.profile.clone())
            .ok_or(BackendError::NotFound)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, BackendError> {
        let me = self.current_user()?;
        Ok(self
            .lock()
            .accounts
            .values()
            .filter(|a| a.user.id != me.id)
            .map(|a| a.profile.clone())
            .collect())
    }

    async fn send_invite(&self, folder_id: Uuid, invited_user_id: Uuid) -> Result<(), BackendError> {
        let me = self.current_user()?;
        let mut state = self.lock();
        let (folder_name, owner) = state
            .folders
            .get(&folder_id)
            .cloned()
            .ok_or(BackendError::NotFound)?;
        if owner != me.id {
            return Err(BackendError::InvalidState("not the folder owner".into()));
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.invites.push(MockInvite {
            id: Uuid::new_v4(),
            folder_id,
            folder_name,
            invited_by: me.id,
            invited_user_id,
            status: InviteStatus::Pending,
            seq,
        });
        Ok(())
    }

    async fn list_pending_invites(&self) -> Result<Vec<PendingInvite>, BackendError> {
        let me = self.current_user()?;
        let state = self.lock();
        if state.fail_invite_list {
            return Err(BackendError::Network("list unavailable".into()));
        }
        let mut pending: Vec<&MockInvite> = state
            .invites
            .iter()
            .filter(|i| i.invited_user_id == me.id && i.status == InviteStatus::Pending)
            .collect();
        pending.sort_by(|a, b| b.seq.cmp(&a.seq));

        Ok(pending
            .into_iter()
            .map(|invite| PendingInvite {
                id: invite.id,
                folder_id: invite.folder_id,
                folder_name: Some(invite.folder_name.clone()),
                inviter: state
                    .accounts
                    .values()
                    .find(|a| a.user.id == invite.invited_by)
                    .map(|a| a.profile.clone()),
                created_at: chrono::Utc::now(),
            })
            .collect())
    }

    async fn count_pending_invites(&self) -> Result<u64, BackendError> {
        let me = self.current_user()?;
        let state = self.lock();
        Ok(state
            .invites
            .iter()
            .filter(|i| i.invited_user_id == me.id && i.status == InviteStatus::Pending)
            .count() as u64)
    }

    async fn resolve_invite(
        &self,
        invite_id: Uuid,
        decision: InviteDecision,
    ) -> Result<(), BackendError> {
        let me = self.current_user()?;
        let mut state = self.lock();
        let invite = state
            .invites
            .iter_mut()
            .find(|i| i.id == invite_id)
            .ok_or(BackendError::NotFound)?;
        if invite.invited_user_id != me.id {
            return Err(BackendError::InvalidState("not the invitee".into()));
        }
        if invite.status.is_terminal() {
            return Err(BackendError::InvalidState("already resolved".into()));
        }
        invite.status = decision.as_status();
        Ok(())
    }
}

pub fn temp_cache() -> DurableCache {
    let dir = std::env::temp_dir().join(format!("cirrus-client-test-{}", Uuid::new_v4()));
    DurableCache::new(dir)
}
