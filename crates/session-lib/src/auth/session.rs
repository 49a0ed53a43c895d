// ============================
// crates/session-lib/src/auth/session.rs
// ============================
//! Process-wide session state observed by the UI layer.
use helpdesk_common::{LoginRequest, Principal, RegisterRequest, UserRole};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::AuthService;
use crate::error::SessionError;

/// What the UI sees of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Durable credentials not yet checked; route guards should wait
    Initializing,
    Authenticated(Principal),
    Anonymous,
}

impl SessionState {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            SessionState::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Initializing)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn role(&self) -> Option<UserRole> {
        self.principal().map(|p| p.role)
    }
}

/// Single owner of the in-memory principal.
///
/// Created once at startup and shared with the UI as `Arc<SessionStore>`.
/// Mutating calls are not serialized against each other: a slow login can
/// land after a later logout. Hosts are expected to debounce submissions.
pub struct SessionStore {
    auth: Arc<dyn AuthService>,
    state: watch::Sender<SessionState>,
    initialized: AtomicBool,
}

impl SessionStore {
    pub fn new(auth: Arc<dyn AuthService>) -> Self {
        let (state, _) = watch::channel(SessionState::Initializing);
        Self {
            auth,
            state,
            initialized: AtomicBool::new(false),
        }
    }

    /// The credential service behind this store
    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.auth
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn principal(&self) -> Option<Principal> {
        self.state.borrow().principal().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Advisory UI gating against the in-memory principal. An empty list
    /// admits any signed-in user. The API enforces the real boundary.
    pub fn can_access(&self, roles: &[UserRole]) -> bool {
        match self.state.borrow().role() {
            Some(role) => roles.is_empty() || roles.contains(&role),
            None => false,
        }
    }

    fn set_state(&self, next: SessionState) {
        self.state.send_replace(next);
    }

    /// Rebuild the session from durable credentials. Runs once; later calls
    /// return immediately.
    #[tracing::instrument(skip(self))]
    pub async fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("session already initialized");
            return;
        }

        match self.auth.is_authenticated() {
            Ok(true) => match self.auth.current_user().await {
                Some(principal) => {
                    info!(user_id = %principal.id, "session restored");
                    self.set_state(SessionState::Authenticated(principal));
                },
                None => {
                    warn!("stored session could not be confirmed, logging out");
                    self.auth.logout().await;
                    self.set_state(SessionState::Anonymous);
                },
            },
            Ok(false) => {
                debug!("no stored session");
                self.set_state(SessionState::Anonymous);
            },
            Err(err) => {
                error!(error = %err, "failed to initialize session");
                self.auth.logout().await;
                self.set_state(SessionState::Anonymous);
            },
        }
    }

    /// On failure the state is left as it was and the error is returned
    pub async fn login(&self, email: &str, password: &str) -> Result<Principal, SessionError> {
        let credentials = LoginRequest::new(email, password);
        let response = self.auth.login(&credentials).await?;
        self.set_state(SessionState::Authenticated(response.user.clone()));
        Ok(response.user)
    }

    pub async fn register(&self, profile: RegisterRequest) -> Result<Principal, SessionError> {
        let response = self.auth.register(&profile).await?;
        self.set_state(SessionState::Authenticated(response.user.clone()));
        Ok(response.user)
    }

    pub async fn logout(&self) {
        self.auth.logout().await;
        self.set_state(SessionState::Anonymous);
    }

    /// Re-fetch the principal; on failure keep the one we have.
    ///
    /// Only a signed-in session is refreshed. A result that arrives after
    /// the session ended is dropped rather than signing the user back in.
    pub async fn refresh_user(&self) {
        if !self.is_authenticated() {
            debug!("no signed-in user to refresh");
            return;
        }
        match self.auth.current_user().await {
            Some(principal) => {
                self.state.send_if_modified(|state| match state {
                    SessionState::Authenticated(current) => {
                        *current = principal;
                        true
                    },
                    _ => {
                        debug!("session ended during user refresh, dropping result");
                        false
                    },
                });
            },
            None => warn!("failed to refresh user, keeping current session"),
        }
    }

    /// Exchange the token for a fresh one. A failed refresh has already
    /// cleared the credentials, so the store follows to `Anonymous`.
    pub async fn refresh_session(&self) -> bool {
        match self.auth.refresh_token().await {
            Some(response) => {
                self.set_state(SessionState::Authenticated(response.user.clone()));
                true
            },
            None => {
                self.set_state(SessionState::Anonymous);
                false
            },
        }
    }
}
