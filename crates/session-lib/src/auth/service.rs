// =============
// crates/session-lib/src/auth/service.rs
// =============
//! The `AuthService` trait: durable credentials, role checks and the remote
//! auth calls the session store is built on.
use async_trait::async_trait;
use helpdesk_common::{AuthResponse, LoginRequest, Principal, RegisterRequest, SessionToken, UserRole};

use crate::error::SessionError;

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Stored token, if any. No side effects.
    fn token(&self) -> Result<Option<SessionToken>, SessionError>;
    fn set_token(&self, token: &SessionToken) -> Result<(), SessionError>;
    fn remove_token(&self) -> Result<(), SessionError>;

    /// Cached profile. A corrupt cache entry reads as `Ok(None)`.
    fn user(&self) -> Result<Option<Principal>, SessionError>;
    fn set_user(&self, user: &Principal) -> Result<(), SessionError>;
    fn remove_user(&self) -> Result<(), SessionError>;

    /// Token and cached profile are both present.
    ///
    /// Local check only: a stale token stays "authenticated" until the next
    /// server round trip fails.
    fn is_authenticated(&self) -> Result<bool, SessionError> {
        Ok(self.token()?.is_some() && self.user()?.is_some())
    }

    fn has_role(&self, role: UserRole) -> bool {
        self.has_any_role(&[role])
    }

    /// Unreadable storage counts as "no role"
    fn has_any_role(&self, roles: &[UserRole]) -> bool {
        match self.user() {
            Ok(Some(user)) => roles.contains(&user.role),
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(error = %err, "role check failed to read cached user");
                false
            },
        }
    }

    fn is_admin(&self) -> bool {
        self.has_role(UserRole::Admin)
    }

    fn is_support_agent(&self) -> bool {
        self.has_any_role(&[UserRole::SupportAgent, UserRole::Admin])
    }

    /// Errors propagate unchanged; storage is only touched on success
    async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, SessionError>;
    async fn register(&self, profile: &RegisterRequest) -> Result<AuthResponse, SessionError>;

    /// Clear both channels and notify the termination hook. Never fails.
    async fn logout(&self);

    /// `None` without a network call when no token is stored; any failure
    /// ends the session.
    async fn refresh_token(&self) -> Option<AuthResponse>;

    /// Fails closed
    async fn validate_token(&self) -> bool;

    /// Fails soft: on error the cached profile is left as it was
    async fn current_user(&self) -> Option<Principal>;
}

/// Called after logout with the path of the login entry point.
///
/// Hosts wire this to their own navigation so that all in-memory
/// application state is discarded along with the credentials.
pub trait TerminationHook: Send + Sync {
    fn session_terminated(&self, login_path: &str);
}

impl<F> TerminationHook for F
where
    F: Fn(&str) + Send + Sync,
{
    fn session_terminated(&self, login_path: &str) {
        self(login_path)
    }
}

/// Hook that only records the termination in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTermination;

impl TerminationHook for LogTermination {
    fn session_terminated(&self, login_path: &str) {
        tracing::info!(login_path, "session terminated, returning to login");
    }
}
