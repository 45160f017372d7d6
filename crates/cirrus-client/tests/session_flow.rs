mod common;

use common::{MockBackend, temp_cache};

use cirrus_client::backend::{BackendError, SignUpParams};
use cirrus_client::guards::{GuardDecision, Route, require_anonymous, require_auth};
use cirrus_client::session::{AuthEvent, SessionManager, SessionStatus};

fn signup_params(email: &str) -> SignUpParams {
    SignUpParams {
        email: email.to_string(),
        password: "secret1!".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
    }
}

#[tokio::test]
async fn sign_up_establishes_authenticated_session() {
    let mock = MockBackend::new();
    let cache = temp_cache();
    let manager = SessionManager::new(mock.clone(), cache.clone());

    let user = manager.sign_up(signup_params("a@x.com")).await.unwrap();
    assert_eq!(user.email, "a@x.com");

    let session = manager.snapshot();
    assert_eq!(session.status, SessionStatus::Authenticated);
    assert_eq!(session.user.as_ref().unwrap().email, "a@x.com");
    // Profile enrichment landed too
    assert_eq!(session.profile.as_ref().unwrap().first_name, "Ada");

    // Durable cache mirrors the live session
    let cached = cache.load().await;
    assert_eq!(cached.user.as_ref().unwrap().email, "a@x.com");
}

#[tokio::test]
async fn duplicate_sign_up_is_distinct_from_generic_failure() {
    let mock = MockBackend::new();
    mock.add_account("a@x.com", "pw123456", "Ada", "Lovelace");
    let manager = SessionManager::new(mock.clone(), temp_cache());

    let err = manager.sign_up(signup_params("a@x.com")).await.unwrap_err();
    assert!(matches!(err, BackendError::AlreadyRegistered));
    assert_eq!(manager.snapshot().status, SessionStatus::Initializing);
}

#[tokio::test]
async fn bad_credentials_leave_session_untouched() {
    let mock = MockBackend::new();
    mock.add_account("a@x.com", "right-pw1", "Ada", "Lovelace");
    let manager = SessionManager::new(mock.clone(), temp_cache());
    manager.initialize().await;

    let err = manager.sign_in("a@x.com", "wrong").await.unwrap_err();
    assert!(matches!(err, BackendError::InvalidCredentials));
    assert_eq!(manager.snapshot().status, SessionStatus::Anonymous);
}

#[tokio::test]
async fn initialize_resolves_existing_session() {
    let mock = MockBackend::new();
    let user = mock.add_account("a@x.com", "pw123456", "Ada", "Lovelace");
    mock.set_server_session(Some(user));
    let manager = SessionManager::new(mock.clone(), temp_cache());

    manager.initialize().await;

    let session = manager.snapshot();
    assert_eq!(session.status, SessionStatus::Authenticated);
    assert!(session.profile.is_some());
}

#[tokio::test]
async fn initialize_without_session_resolves_anonymous() {
    let mock = MockBackend::new();
    let manager = SessionManager::new(mock.clone(), temp_cache());

    manager.initialize().await;
    assert_eq!(manager.snapshot().status, SessionStatus::Anonymous);
    assert!(!manager.is_authenticated());
}

#[tokio::test]
async fn profile_failure_never_blocks_authentication() {
    let mock = MockBackend::new();
    let user = mock.add_account("a@x.com", "pw123456", "Ada", "Lovelace");
    mock.set_server_session(Some(user));
    mock.set_fail_profile_fetch(true);
    let cache = temp_cache();
    let manager = SessionManager::new(mock.clone(), cache.clone());

    manager.initialize().await;

    let session = manager.snapshot();
    assert_eq!(session.status, SessionStatus::Authenticated);
    assert!(session.profile.is_none());
    // User slot survives; only the profile slot is cleared
    let cached = cache.load().await;
    assert!(cached.user.is_some());
    assert!(cached.profile.is_none());
}

/// P1: the guard permits navigation iff the most recent auth event carried
/// a user, for any event sequence.
#[tokio::test]
async fn guard_tracks_latest_auth_event() {
    let mock = MockBackend::new();
    let u1 = mock.add_account("a@x.com", "pw123456", "Ada", "Lovelace");
    let u2 = mock.add_account("b@x.com", "pw123456", "Grace", "Hopper");
    let cache = temp_cache();
    let manager = SessionManager::new(mock.clone(), cache.clone());
    manager.initialize().await;

    let events = [
        AuthEvent::SignedIn(u1.clone()),
        AuthEvent::SignedOut,
        AuthEvent::SignedIn(u2.clone()),
        AuthEvent::TokenRefreshed(u2.clone()),
        AuthEvent::SignedOut,
        AuthEvent::SignedIn(u1.clone()),
    ];

    for event in events {
        let expects_user = matches!(
            event,
            AuthEvent::SignedIn(_) | AuthEvent::TokenRefreshed(_)
        );
        manager.handle_auth_event(event).await;

        let session = manager.snapshot();
        let cached = cache.load().await;
        let decision = require_auth(&session, &cached);
        if expects_user {
            assert_eq!(decision, GuardDecision::Allow);
        } else {
            assert_eq!(decision, GuardDecision::Redirect(Route::Login));
        }
    }
}

/// P5 / Scenario E: signing out clears the in-memory user and both durable
/// cache slots in the same operation.
#[tokio::test]
async fn sign_out_clears_session_and_cache_together() {
    let mock = MockBackend::new();
    let cache = temp_cache();
    let manager = SessionManager::new(mock.clone(), cache.clone());

    manager.sign_up(signup_params("a@x.com")).await.unwrap();
    assert!(cache.load().await.user.is_some());

    manager.sign_out().await;

    let session = manager.snapshot();
    assert_eq!(session.status, SessionStatus::Anonymous);
    assert!(session.user.is_none());
    assert!(session.profile.is_none());

    let cached = cache.load().await;
    assert!(cached.user.is_none(), "stale cached user after sign-out");
    assert!(cached.profile.is_none(), "stale cached profile after sign-out");

    assert_eq!(
        require_auth(&session, &cached),
        GuardDecision::Redirect(Route::Login)
    );
    assert_eq!(require_anonymous(&session, &cached), GuardDecision::Allow);
}

/// A profile fetch that completes after a newer auth event must not
/// resurrect stale state.
#[tokio::test]
async fn stale_profile_fetch_is_dropped_after_sign_out() {
    let mock = MockBackend::new();
    let user = mock.add_account("a@x.com", "pw123456", "Ada", "Lovelace");
    let cache = temp_cache();
    let manager = SessionManager::new(mock.clone(), cache.clone());

    let gate = mock.gate_profile_fetches();

    let sign_in = manager.handle_auth_event(AuthEvent::SignedIn(user.clone()));
    let interleave = async {
        // Wait until the profile fetch is in flight, sign out underneath
        // it, then let it complete.
        gate.started.acquire().await.unwrap().forget();
        manager.handle_auth_event(AuthEvent::SignedOut).await;
        gate.release();
    };
    tokio::join!(sign_in, interleave);

    let session = manager.snapshot();
    assert_eq!(session.status, SessionStatus::Anonymous);
    assert!(session.user.is_none());
    assert!(session.profile.is_none(), "stale profile resurrected");

    let cached = cache.load().await;
    assert!(cached.user.is_none());
    assert!(cached.profile.is_none());
}

/// Reload bridging: a cached identity keeps protected navigation open while
/// the live probe is still unresolved, without touching the login page.
#[tokio::test]
async fn cached_identity_bridges_reload() {
    let mock = MockBackend::new();
    let user = mock.add_account("a@x.com", "pw123456", "Ada", "Lovelace");
    let cache = temp_cache();
    cache.store_user(&user).await;

    let manager = SessionManager::new(mock.clone(), cache.clone());
    let session = manager.snapshot();
    assert_eq!(session.status, SessionStatus::Initializing);

    let cached = cache.load().await;
    assert_eq!(require_auth(&session, &cached), GuardDecision::Allow);
    assert_eq!(
        require_anonymous(&session, &cached),
        GuardDecision::Redirect(Route::Dashboard)
    );
}
