// ============================
// helpdesk-session/src/lib.rs
// ============================
//! Client-side session core of the helpdesk application.
//!
//! [`auth::SessionStore`] holds the signed-in principal for the UI;
//! [`auth::CredentialService`] keeps the token and cached profile in two
//! storage channels and talks to the `/auth` endpoints through an
//! [`http::HttpClient`].

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use crate::auth::{CredentialService, LogTermination, SessionStore, TerminationHook};
use crate::config::Settings;
use crate::error::SessionError;
use crate::http::{HttpClient, ReqwestClient};
use crate::storage::{EncryptedFileStore, FileDurableStore};

pub use helpdesk_common::{
    AuthResponse, LoginRequest, Principal, RegisterRequest, SessionToken, UserRole,
};

/// Everything a host needs, wired from settings
#[derive(Clone)]
pub struct SessionContext {
    /// Session store shared with the UI
    pub store: Arc<SessionStore>,
    /// Credential service behind the store
    pub credentials: Arc<CredentialService>,
    pub settings: Arc<Settings>,
}

impl SessionContext {
    /// On-disk channels under `settings.data_dir` and a `reqwest` transport
    pub fn open(settings: Settings) -> Result<Self, SessionError> {
        let http = ReqwestClient::new(&settings.api_base_url, settings.request_timeout())?;
        Self::with_http(settings, Arc::new(http))
    }

    /// Same as [`SessionContext::open`] with a caller supplied transport
    pub fn with_http(settings: Settings, http: Arc<dyn HttpClient>) -> Result<Self, SessionError> {
        Self::build(settings, http, Arc::new(LogTermination))
    }

    /// Route logout to the host's own navigation instead of the log
    pub fn with_termination_hook(
        settings: Settings,
        http: Arc<dyn HttpClient>,
        hook: Arc<dyn TerminationHook>,
    ) -> Result<Self, SessionError> {
        Self::build(settings, http, hook)
    }

    fn build(
        settings: Settings,
        http: Arc<dyn HttpClient>,
        hook: Arc<dyn TerminationHook>,
    ) -> Result<Self, SessionError> {
        settings.validate()?;
        let secure = EncryptedFileStore::open(settings.token_dir())?;
        let durable = FileDurableStore::new(settings.profile_dir())?;
        let credentials = Arc::new(
            CredentialService::from_settings(&settings, http, Arc::new(secure), Arc::new(durable))
                .with_termination_hook(hook),
        );
        let store = Arc::new(SessionStore::new(credentials.clone()));
        Ok(Self {
            store,
            credentials,
            settings: Arc::new(settings),
        })
    }
}
