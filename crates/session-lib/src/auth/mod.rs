// ============================
// crates/session-lib/src/auth/mod.rs
// ============================
//! Authentication module.
mod service;
mod service_impl;
pub mod session;

pub use service::{AuthService, LogTermination, TerminationHook};
pub use service_impl::{
    CredentialService, LOGIN_ENDPOINT, LOGIN_PATH, PROFILE_ENDPOINT, REFRESH_ENDPOINT,
    REGISTER_ENDPOINT, TOKEN_KEY, TOKEN_TTL, USER_KEY, VALIDATE_ENDPOINT,
};
pub use session::{SessionState, SessionStore};
