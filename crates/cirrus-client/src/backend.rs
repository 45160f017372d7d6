use std::future::Future;
use std::sync::RwLock;

use reqwest::StatusCode;
use uuid::Uuid;

use cirrus_types::api::{
    AuthResponse, PendingCountResponse, PendingInvite, PendingInviteListResponse,
    ProfileListResponse, RegisterRequest, ResolveInviteRequest, SendInviteRequest,
    SessionResponse,
};
use cirrus_types::models::{InviteDecision, Profile, User};

/// Failures surfaced by backend operations, mapped to distinct variants so
/// call sites never have to inspect loosely-typed payloads.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already registered")]
    AlreadyRegistered,
    #[error("not authenticated")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("backend request failed: {0}")]
    Network(String),
}

/// Successful authentication: the identity plus its bearer token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct SignUpParams {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// The seam between client state and the server. Methods return `Send`
/// futures so session bookkeeping can run them from spawned tasks.
pub trait Backend: Send + Sync + 'static {
    fn get_session(&self) -> impl Future<Output = Result<Option<User>, BackendError>> + Send;
    fn sign_up(
        &self,
        params: SignUpParams,
    ) -> impl Future<Output = Result<AuthSession, BackendError>> + Send;
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthSession, BackendError>> + Send;
    fn sign_out(&self) -> impl Future<Output = Result<(), BackendError>> + Send;
    fn fetch_profile(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Profile, BackendError>> + Send;
    fn list_profiles(&self) -> impl Future<Output = Result<Vec<Profile>, BackendError>> + Send;
    fn send_invite(
        &self,
        folder_id: Uuid,
        invited_user_id: Uuid,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
    fn list_pending_invites(
        &self,
    ) -> impl Future<Output = Result<Vec<PendingInvite>, BackendError>> + Send;
    fn count_pending_invites(&self) -> impl Future<Output = Result<u64, BackendError>> + Send;
    fn resolve_invite(
        &self,
        invite_id: Uuid,
        decision: InviteDecision,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// HTTP implementation against a Cirrus server.
///
/// The bearer token is interior state: signing in installs it, signing out
/// drops it, and every protected request reads the current value.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        }
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().expect("token lock poisoned") = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self) -> Option<String> {
        self.token.read().expect("token lock poisoned").clone()
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, BackendError> {
        match self.bearer() {
            Some(token) => Ok(req.bearer_auth(token)),
            None => Err(BackendError::Unauthorized),
        }
    }
}

fn map_status(status: StatusCode) -> BackendError {
    match status {
        StatusCode::UNAUTHORIZED => BackendError::Unauthorized,
        StatusCode::NOT_FOUND => BackendError::NotFound,
        StatusCode::CONFLICT => BackendError::InvalidState("already resolved".into()),
        other => BackendError::Network(format!("unexpected status {}", other)),
    }
}

async fn expect_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        return Err(map_status(status));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| BackendError::Network(e.to_string()))
}

impl Backend for HttpBackend {
    async fn get_session(&self) -> Result<Option<User>, BackendError> {
        let Some(token) = self.bearer() else {
            return Ok(None);
        };
        let response = self
            .client
            .get(self.url("/auth/session"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        // An expired or revoked token is not an error — there is simply no
        // session anymore.
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        let session: SessionResponse = expect_json(response).await?;
        Ok(Some(session.user))
    }

    async fn sign_up(&self, params: SignUpParams) -> Result<AuthSession, BackendError> {
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(&RegisterRequest {
                email: params.email,
                password: params.password,
                first_name: params.first_name,
                last_name: params.last_name,
            })
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        if response.status() == StatusCode::CONFLICT {
            return Err(BackendError::AlreadyRegistered);
        }
        let auth: AuthResponse = expect_json(response).await?;
        self.set_token(Some(auth.token.clone()));
        Ok(AuthSession {
            user: auth.user,
            token: auth.token,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&cirrus_types::api::LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(BackendError::InvalidCredentials);
        }
        let auth: AuthResponse = expect_json(response).await?;
        self.set_token(Some(auth.token.clone()));
        Ok(AuthSession {
            user: auth.user,
            token: auth.token,
        })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        // Tokens are stateless on the server; discarding ours ends the session.
        self.set_token(None);
        Ok(())
    }

    async fn fetch_profile(&self, user_id: Uuid) -> Result<Profile, BackendError> {
        let req = self.authed(self.client.get(self.url(&format!("/profiles/{}", user_id))))?;
        let response = req
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        expect_json(response).await
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, BackendError> {
        let req = self.authed(self.client.get(self.url("/profiles")))?;
        let response = req
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let list: ProfileListResponse = expect_json(response).await?;
        Ok(list.profiles)
    }

    async fn send_invite(&self, folder_id: Uuid, invited_user_id: Uuid) -> Result<(), BackendError> {
        let req = self.authed(self.client.post(self.url("/invites")))?;
        let response = req
            .json(&SendInviteRequest {
                folder_id,
                invited_user_id,
            })
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(map_status(status))
        }
    }

    async fn list_pending_invites(&self) -> Result<Vec<PendingInvite>, BackendError> {
        let req = self.authed(self.client.get(self.url("/invites/pending")))?;
        let response = req
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let list: PendingInviteListResponse = expect_json(response).await?;
        Ok(list.invites)
    }

    async fn count_pending_invites(&self) -> Result<u64, BackendError> {
        let req = self.authed(self.client.get(self.url("/invites/pending/count")))?;
        let response = req
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let count: PendingCountResponse = expect_json(response).await?;
        Ok(count.count)
    }

    async fn resolve_invite(
        &self,
        invite_id: Uuid,
        decision: InviteDecision,
    ) -> Result<(), BackendError> {
        let req = self.authed(
            self.client
                .post(self.url(&format!("/invites/{}/resolve", invite_id))),
        )?;
        let response = req
            .json(&ResolveInviteRequest { decision })
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(map_status(status))
        }
    }
}
