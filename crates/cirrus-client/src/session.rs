use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use cirrus_types::models::{Profile, User};

use crate::backend::{Backend, BackendError, SignUpParams};
use crate::cache::DurableCache;

/// Where the session stands. `Initializing` is left exactly once, when the
/// first session probe settles; it never recurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Initializing,
    Authenticated,
    Anonymous,
}

/// The in-memory session. `profile` is enrichment and may lag `user`;
/// `status == Authenticated` holds exactly when `user` is present.
#[derive(Debug, Clone)]
pub struct Session {
    pub status: SessionStatus,
    pub user: Option<User>,
    pub profile: Option<Profile>,
}

impl Session {
    fn initializing() -> Self {
        Self {
            status: SessionStatus::Initializing,
            user: None,
            profile: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Auth transitions, in the order the backend emitted them.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(User),
    SignedOut,
    TokenRefreshed(User),
}

/// Single source of truth for "who is logged in".
///
/// One writer (this manager), many readers (guards, views) via a watch
/// channel. Every auth transition replaces the user wholesale and keeps the
/// durable cache in lockstep: a path that clears the in-memory user clears
/// both cache slots in the same operation.
pub struct SessionManager<B: Backend> {
    backend: Arc<B>,
    cache: DurableCache,
    tx: watch::Sender<Session>,
    /// Bumped on every auth transition. A profile fetch that finishes under
    /// an older generation is dropped instead of resurrecting stale state.
    generation: AtomicU64,
}

impl<B: Backend> SessionManager<B> {
    pub fn new(backend: Arc<B>, cache: DurableCache) -> Self {
        let (tx, _) = watch::channel(Session::initializing());
        Self {
            backend,
            cache,
            tx,
            generation: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated()
    }

    /// Probe the backend for an existing session. Leaves `Initializing`
    /// exactly once, before any profile enrichment: a failed profile lookup
    /// must not hold the UI in a loading state.
    pub async fn initialize(&self) {
        match self.backend.get_session().await {
            Ok(Some(user)) => {
                info!("Session restored for {}", user.email);
                self.apply_signed_in(user).await;
            }
            Ok(None) => {
                debug!("No existing session");
                self.apply_signed_out().await;
            }
            Err(e) => {
                warn!("Session probe failed, treating as anonymous: {}", e);
                self.apply_signed_out().await;
            }
        }
    }

    /// Feed an auth-change notification through the single-writer path.
    /// Notifications are processed in arrival order.
    pub async fn handle_auth_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(user) | AuthEvent::TokenRefreshed(user) => {
                self.apply_signed_in(user).await;
            }
            AuthEvent::SignedOut => {
                self.apply_signed_out().await;
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, BackendError> {
        let auth = self.backend.sign_in(email, password).await?;
        let user = auth.user.clone();
        self.apply_signed_in(auth.user).await;
        Ok(user)
    }

    pub async fn sign_up(&self, params: SignUpParams) -> Result<User, BackendError> {
        let auth = self.backend.sign_up(params).await?;
        let user = auth.user.clone();
        self.apply_signed_in(auth.user).await;
        Ok(user)
    }

    /// The local session ends even when the backend call fails; the token
    /// may already be invalid server-side.
    pub async fn sign_out(&self) {
        if let Err(e) = self.backend.sign_out().await {
            warn!("Backend sign-out failed: {}", e);
        }
        self.apply_signed_out().await;
    }

    async fn apply_signed_in(&self, user: User) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let user_id = user.id;

        self.tx.send_modify(|session| {
            session.status = SessionStatus::Authenticated;
            session.user = Some(user.clone());
        });
        self.cache.store_user(&user).await;

        self.refresh_profile(user_id, generation).await;
    }

    async fn apply_signed_out(&self) {
        // Invalidates any in-flight profile fetch
        self.generation.fetch_add(1, Ordering::SeqCst);

        self.tx.send_modify(|session| {
            session.status = SessionStatus::Anonymous;
            session.user = None;
            session.profile = None;
        });

        // Same operation as the in-memory clear: both slots go together
        self.cache.clear().await;
    }

    /// Profile enrichment. Authentication already settled before this runs;
    /// failure here degrades to an absent profile, nothing more.
    async fn refresh_profile(&self, user_id: uuid::Uuid, generation: u64) {
        let result = self.backend.fetch_profile(user_id).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Dropping stale profile fetch for {}", user_id);
            return;
        }

        match result {
            Ok(profile) => {
                self.tx.send_modify(|session| {
                    session.profile = Some(profile.clone());
                });
                self.cache.store_profile(&profile).await;
            }
            Err(e) => {
                warn!("Profile fetch failed for {}: {}", user_id, e);
                self.tx.send_modify(|session| {
                    session.profile = None;
                });
                self.cache.clear_profile().await;
            }
        }
    }
}
