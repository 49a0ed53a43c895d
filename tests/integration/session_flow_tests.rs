// ==========================
// tests/integration/session_flow_tests.rs
// ==========================
//! Session store transitions against scripted server answers
use crate::test_utils::{auth_json, principal, user_json, Harness, MockHttp};
use helpdesk_common::{RegisterRequest, SessionToken, UserRole};
use helpdesk_session::auth::{
    AuthService, CredentialService, SessionState, SessionStore, LOGIN_ENDPOINT,
    PROFILE_ENDPOINT, REFRESH_ENDPOINT, REGISTER_ENDPOINT, TOKEN_KEY, USER_KEY,
};
use helpdesk_session::config::Settings;
use helpdesk_session::error::{SessionError, StorageError};
use helpdesk_session::storage::{DurableStore, MemorySecureStore};
use helpdesk_session::SessionContext;
use parking_lot::Mutex;
use serde_json::json;
use std::io::{Error as IoError, ErrorKind};
use std::sync::Arc;
use tempfile::TempDir;

/// Profile channel that cannot be written
struct ReadOnlyDurable;

impl DurableStore for ReadOnlyDurable {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(IoError::new(ErrorKind::PermissionDenied, "read-only profile dir").into())
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_login_sets_principal_with_server_role() {
    let h = Harness::new();
    h.http
        .reply(LOGIN_ENDPOINT, 200, auth_json("abc", "agent@x.com", UserRole::SupportAgent));

    let principal = h.store.login("agent@x.com", "agent123").await.unwrap();

    assert_eq!(principal.role, UserRole::SupportAgent);
    assert!(h.store.is_authenticated());
    assert_eq!(h.store.principal().unwrap().role, UserRole::SupportAgent);
    assert!(h.service.is_authenticated().unwrap());
}

#[tokio::test]
async fn test_logout_clears_everything_from_any_state() {
    // Signed in
    let h = Harness::new();
    h.http.reply(LOGIN_ENDPOINT, 200, auth_json("abc", "u@x.com", UserRole::User));
    h.store.login("u@x.com", "user123").await.unwrap();
    h.store.logout().await;
    assert!(h.storage_cleared());
    assert!(!h.service.is_authenticated().unwrap());
    assert_eq!(h.store.state(), SessionState::Anonymous);
    assert_eq!(*h.terminations.lock(), vec!["/login".to_string()]);

    // Never signed in
    let h = Harness::new();
    h.store.logout().await;
    assert!(h.storage_cleared());
    assert!(!h.service.is_authenticated().unwrap());
    assert_eq!(h.store.state(), SessionState::Anonymous);
}

#[tokio::test]
async fn test_refresh_without_token_makes_no_call() {
    let h = Harness::new();
    assert!(h.service.refresh_token().await.is_none());
    assert_eq!(h.http.calls(), 0);
    assert_eq!(h.termination_count(), 0);
}

#[tokio::test]
async fn test_current_user_failure_keeps_principal() {
    let h = Harness::new();
    h.http.reply(LOGIN_ENDPOINT, 200, auth_json("abc", "u@x.com", UserRole::User));
    let before = h.store.login("u@x.com", "user123").await.unwrap();
    let cached_before = h.durable.get(USER_KEY).unwrap();

    h.http.fail(PROFILE_ENDPOINT, "connection reset");
    h.store.refresh_user().await;

    assert_eq!(h.store.principal(), Some(before));
    assert_eq!(h.durable.get(USER_KEY).unwrap(), cached_before);
    assert_eq!(h.termination_count(), 0);

    h.http.reply(PROFILE_ENDPOINT, 500, json!({ "message": "boom" }));
    assert!(h.service.current_user().await.is_none());
    assert_eq!(h.durable.get(USER_KEY).unwrap(), cached_before);
}

#[tokio::test]
async fn test_refresh_failure_clears_both_channels() {
    let h = Harness::new();
    h.service.set_token(&SessionToken::new("stale")).unwrap();
    h.service.set_user(&principal("u@x.com", UserRole::User)).unwrap();

    h.http.reply(REFRESH_ENDPOINT, 401, json!({ "message": "Token expired" }));
    assert!(h.service.refresh_token().await.is_none());

    assert!(h.storage_cleared());
    assert_eq!(h.termination_count(), 1);
}

#[tokio::test]
async fn test_refresh_with_malformed_body_ends_session() {
    let h = Harness::new();
    h.service.set_token(&SessionToken::new("abc")).unwrap();
    h.service.set_user(&principal("u@x.com", UserRole::User)).unwrap();

    h.http.reply(REFRESH_ENDPOINT, 200, json!({ "unexpected": true }));
    assert!(h.service.refresh_token().await.is_none());
    assert!(h.storage_cleared());
}

#[tokio::test]
async fn test_has_any_role_admin_only() {
    let h = Harness::new();
    assert!(!h.service.has_any_role(&[UserRole::Admin]));

    for role in UserRole::ALL {
        h.service.set_user(&principal("u@x.com", role)).unwrap();
        assert_eq!(
            h.service.has_any_role(&[UserRole::Admin]),
            role == UserRole::Admin,
            "role {role}"
        );
    }
}

#[tokio::test]
async fn test_initialize_without_credentials_is_anonymous_offline() {
    let h = Harness::new();
    assert!(h.store.is_loading());
    assert!(!h.service.is_authenticated().unwrap());

    h.store.initialize().await;

    assert_eq!(h.store.state(), SessionState::Anonymous);
    assert!(!h.store.is_loading());
    assert_eq!(h.http.calls(), 0);
}

#[tokio::test]
async fn test_initialize_with_unreachable_server_forces_logout() {
    let h = Harness::new();
    h.service.set_token(&SessionToken::new("abc")).unwrap();
    h.service.set_user(&principal("u@x.com", UserRole::User)).unwrap();
    h.http.fail(PROFILE_ENDPOINT, "network unreachable");

    h.store.initialize().await;

    assert_eq!(h.store.state(), SessionState::Anonymous);
    assert!(h.storage_cleared());
    assert_eq!(h.termination_count(), 1);
}

#[tokio::test]
async fn test_initialize_restores_confirmed_session() {
    let h = Harness::new();
    h.service.set_token(&SessionToken::new("abc")).unwrap();
    h.service.set_user(&principal("old@x.com", UserRole::User)).unwrap();
    h.http.reply(PROFILE_ENDPOINT, 200, user_json("new@x.com", UserRole::SupportAgent));

    let mut rx = h.store.subscribe();
    h.store.initialize().await;

    assert!(rx.has_changed().unwrap());
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.principal().unwrap().email, "new@x.com");
    // Profile cache follows the server copy
    assert_eq!(h.service.user().unwrap().unwrap().email, "new@x.com");

    let profile_call = &h.http.requests()[0];
    assert_eq!(profile_call.header_value("Authorization"), Some("Bearer abc"));
}

#[tokio::test]
async fn test_initialize_runs_once() {
    let h = Harness::new();
    h.store.initialize().await;

    h.service.set_token(&SessionToken::new("abc")).unwrap();
    h.service.set_user(&principal("u@x.com", UserRole::User)).unwrap();
    h.store.initialize().await;

    assert_eq!(h.store.state(), SessionState::Anonymous);
    assert_eq!(h.http.calls(), 0);
}

#[tokio::test]
async fn test_login_as_user_role_checks() {
    let h = Harness::new();
    h.http.reply(LOGIN_ENDPOINT, 200, auth_json("abc", "user@x.com", UserRole::User));

    h.store.login("user@x.com", "user123").await.unwrap();

    assert!(h.store.is_authenticated());
    assert!(!h.service.has_role(UserRole::Admin));
    assert!(h.service.has_role(UserRole::User));
    assert_eq!(h.service.token().unwrap().unwrap().as_str(), "abc");
    assert!(h.store.can_access(&[]));
    assert!(!h.store.can_access(&[UserRole::SupportAgent, UserRole::Admin]));
}

#[tokio::test]
async fn test_corrupt_profile_cache_reads_as_absent() {
    let h = Harness::new();
    h.service.set_token(&SessionToken::new("abc")).unwrap();
    h.durable.set(USER_KEY, "{not json").unwrap();

    assert_eq!(h.service.user().unwrap(), None);
    assert!(!h.service.is_authenticated().unwrap());
    assert!(!h.service.has_role(UserRole::User));
}

#[tokio::test]
async fn test_failed_login_leaves_state_and_returns_error() {
    let h = Harness::new();
    h.store.initialize().await;
    h.http.reply(LOGIN_ENDPOINT, 401, json!({ "message": "Invalid email or password" }));

    let err = h.store.login("u@x.com", "wrongpw").await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(h.store.state(), SessionState::Anonymous);
    assert!(h.storage_cleared());
}

#[tokio::test]
async fn test_failed_login_while_signed_in_keeps_session() {
    let h = Harness::new();
    h.http.reply(LOGIN_ENDPOINT, 200, auth_json("abc", "u@x.com", UserRole::User));
    let signed_in = h.store.login("u@x.com", "user123").await.unwrap();

    h.http.fail(LOGIN_ENDPOINT, "timeout");
    let err = h.store.login("other@x.com", "other123").await.unwrap_err();

    assert!(matches!(err, helpdesk_session::error::SessionError::Transport(_)));
    assert_eq!(h.store.principal(), Some(signed_in));
    assert_eq!(h.service.token().unwrap().unwrap().as_str(), "abc");
}

#[tokio::test]
async fn test_register_enters_authenticated() {
    let h = Harness::new();
    h.http
        .reply(REGISTER_ENDPOINT, 200, auth_json("fresh", "new@x.com", UserRole::User));

    let principal = h
        .store
        .register(RegisterRequest {
            email: "new@x.com".to_string(),
            password: "secret1".to_string(),
            first_name: "New".to_string(),
            last_name: "Person".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(principal.email, "new@x.com");
    assert!(h.store.is_authenticated());
    assert!(h.secure.attributes(TOKEN_KEY).is_some());

    let body = h.http.requests()[0].body.clone().unwrap();
    assert_eq!(body["firstName"], "New");
    assert_eq!(body["lastName"], "Person");
}

#[tokio::test]
async fn test_refresh_session_follows_service() {
    let h = Harness::new();
    h.http.reply(LOGIN_ENDPOINT, 200, auth_json("abc", "u@x.com", UserRole::User));
    h.store.login("u@x.com", "user123").await.unwrap();

    h.http
        .reply(REFRESH_ENDPOINT, 200, auth_json("def", "u@x.com", UserRole::Admin));
    assert!(h.store.refresh_session().await);
    assert_eq!(h.store.principal().unwrap().role, UserRole::Admin);
    assert_eq!(h.service.token().unwrap().unwrap().as_str(), "def");

    h.http.fail(REFRESH_ENDPOINT, "connection refused");
    assert!(!h.store.refresh_session().await);
    assert_eq!(h.store.state(), SessionState::Anonymous);
    assert!(h.storage_cleared());
    assert_eq!(h.secure.attributes(TOKEN_KEY), None);
}

#[tokio::test]
async fn test_initialize_with_unreadable_token_forces_logout() {
    let temp_dir = TempDir::new().unwrap();
    let settings = Settings {
        data_dir: temp_dir.path().to_path_buf(),
        ..Settings::default()
    };
    let token_file = settings.token_dir().join("auth_token.sealed");
    let profile_file = settings.profile_dir().join("auth_user.json");

    let http = MockHttp::new();
    let terminations = Arc::new(Mutex::new(Vec::new()));
    let sink = terminations.clone();
    let ctx = SessionContext::with_termination_hook(
        settings,
        http.clone(),
        Arc::new(move |path: &str| sink.lock().push(path.to_string())),
    )
    .unwrap();
    ctx.credentials.set_token(&SessionToken::new("abc")).unwrap();
    ctx.credentials.set_user(&principal("u@x.com", UserRole::User)).unwrap();
    std::fs::write(&token_file, "not a sealed entry").unwrap();

    ctx.store.initialize().await;

    assert_eq!(ctx.store.state(), SessionState::Anonymous);
    assert!(!token_file.exists());
    assert!(!profile_file.exists());
    assert_eq!(terminations.lock().len(), 1);
    assert_eq!(http.calls(), 0);
}

#[tokio::test]
async fn test_profile_write_failure_rolls_back_token() {
    let http = MockHttp::new();
    let secure = MemorySecureStore::new();
    let service = Arc::new(CredentialService::new(
        http.clone(),
        Arc::new(secure.clone()),
        Arc::new(ReadOnlyDurable),
    ));
    let store = SessionStore::new(service.clone());
    store.initialize().await;
    http.reply(LOGIN_ENDPOINT, 200, auth_json("abc", "u@x.com", UserRole::User));

    let err = store.login("u@x.com", "user123").await.unwrap_err();

    assert!(matches!(err, SessionError::Storage(_)));
    assert_eq!(service.token().unwrap(), None);
    assert!(secure.is_empty());
    assert_eq!(store.state(), SessionState::Anonymous);
}

#[tokio::test]
async fn test_refresh_user_never_signs_in() {
    let h = Harness::new();
    h.store.initialize().await;
    h.http.reply(PROFILE_ENDPOINT, 200, user_json("u@x.com", UserRole::User));

    h.store.refresh_user().await;

    assert_eq!(h.store.state(), SessionState::Anonymous);
    assert_eq!(h.http.calls(), 0);
    assert!(h.durable.get(USER_KEY).unwrap().is_none());
}

#[tokio::test]
async fn test_refresh_user_replaces_principal() {
    let h = Harness::new();
    h.http.reply(LOGIN_ENDPOINT, 200, auth_json("abc", "u@x.com", UserRole::User));
    h.store.login("u@x.com", "user123").await.unwrap();
    h.http.reply(PROFILE_ENDPOINT, 200, user_json("u@x.com", UserRole::Admin));

    let mut rx = h.store.subscribe();
    h.store.refresh_user().await;

    assert!(rx.has_changed().unwrap());
    assert_eq!(h.store.principal().unwrap().role, UserRole::Admin);
}
