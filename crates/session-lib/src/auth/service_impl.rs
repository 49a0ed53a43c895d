//! `CredentialService`: the default `AuthService` over two storage channels
//! and an `HttpClient`.
use ::metrics::counter;
use async_trait::async_trait;
use helpdesk_common::{AuthResponse, LoginRequest, Principal, RegisterRequest, SessionToken};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use super::{AuthService, LogTermination, TerminationHook};
use crate::config::Settings;
use crate::error::SessionError;
use crate::http::{ApiRequest, HttpClient, AUTHORIZATION};
use crate::metrics::{
    SESSION_CACHE_CORRUPT, SESSION_LOGIN, SESSION_LOGOUT, SESSION_REFRESH_FAILED, SESSION_REGISTER,
};
use crate::storage::{DurableStore, SecureExpiringStore, TokenAttributes};

/// Key of the token in the secure channel
pub const TOKEN_KEY: &str = "auth_token";
/// Key of the cached profile in the durable channel
pub const USER_KEY: &str = "auth_user";
/// Lifetime of a stored token
pub const TOKEN_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7); // 7 days
/// Where the host should send the user after logout
pub const LOGIN_PATH: &str = "/login";

pub const LOGIN_ENDPOINT: &str = "/auth/login";
pub const REGISTER_ENDPOINT: &str = "/auth/register";
pub const REFRESH_ENDPOINT: &str = "/auth/refresh";
pub const VALIDATE_ENDPOINT: &str = "/auth/validate";
pub const PROFILE_ENDPOINT: &str = "/users/profile";

pub struct CredentialService {
    http: Arc<dyn HttpClient>,
    secure: Arc<dyn SecureExpiringStore>,
    durable: Arc<dyn DurableStore>,
    hook: Arc<dyn TerminationHook>,
    token_attrs: TokenAttributes,
    login_path: String,
}

impl CredentialService {
    pub fn new(
        http: Arc<dyn HttpClient>,
        secure: Arc<dyn SecureExpiringStore>,
        durable: Arc<dyn DurableStore>,
    ) -> Self {
        Self {
            http,
            secure,
            durable,
            hook: Arc::new(LogTermination),
            token_attrs: TokenAttributes::strict(TOKEN_TTL),
            login_path: LOGIN_PATH.to_string(),
        }
    }

    /// Build a service with the token lifetime and login path from `settings`
    pub fn from_settings(
        settings: &Settings,
        http: Arc<dyn HttpClient>,
        secure: Arc<dyn SecureExpiringStore>,
        durable: Arc<dyn DurableStore>,
    ) -> Self {
        Self::new(http, secure, durable)
            .with_token_ttl(settings.token_ttl())
            .with_login_path(settings.login_path.clone())
    }

    pub fn with_termination_hook(mut self, hook: Arc<dyn TerminationHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_attrs = TokenAttributes::strict(ttl);
        self
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Write token and profile together. If the profile cannot be written
    /// the token is taken back out so neither survives alone.
    fn store_session(&self, auth: &AuthResponse) -> Result<(), SessionError> {
        self.set_token(&auth.token)?;
        if let Err(err) = self.set_user(&auth.user) {
            if let Err(rollback) = self.remove_token() {
                warn!(error = %rollback, "failed to roll back token after profile write error");
            }
            return Err(err);
        }
        Ok(())
    }

    /// POST an auth request and store the resulting session
    async fn authenticate(&self, req: ApiRequest) -> Result<AuthResponse, SessionError> {
        let path = req.path.clone();
        let response = self.http.request(req).await?.error_for_status()?;
        let auth: AuthResponse = response.decode(&path)?;
        self.store_session(&auth)?;
        Ok(auth)
    }

    async fn try_refresh(&self) -> Result<Option<AuthResponse>, SessionError> {
        let Some(token) = self.token()? else {
            debug!("no stored token, skipping refresh");
            return Ok(None);
        };
        let req = ApiRequest::post(REFRESH_ENDPOINT)
            .json(&json!({}))?
            .header(AUTHORIZATION, token.bearer());
        self.authenticate(req).await.map(Some)
    }

    async fn try_validate(&self) -> Result<bool, SessionError> {
        let Some(token) = self.token()? else {
            debug!("no stored token, skipping validation");
            return Ok(false);
        };
        let req = ApiRequest::post(VALIDATE_ENDPOINT)
            .json(&json!({}))?
            .header(AUTHORIZATION, token.bearer());
        let response = self.http.request(req).await?.error_for_status()?;
        response.decode(VALIDATE_ENDPOINT)
    }

    async fn fetch_current_user(&self) -> Result<Principal, SessionError> {
        let mut req = ApiRequest::get(PROFILE_ENDPOINT);
        match self.token() {
            Ok(Some(token)) => req = req.header(AUTHORIZATION, token.bearer()),
            Ok(None) => {},
            Err(err) => warn!(error = %err, "could not read token for profile request"),
        }
        let response = self.http.request(req).await?.error_for_status()?;
        let user: Principal = response.decode(PROFILE_ENDPOINT)?;
        self.set_user(&user)?;
        Ok(user)
    }
}

#[async_trait]
impl AuthService for CredentialService {
    fn token(&self) -> Result<Option<SessionToken>, SessionError> {
        Ok(self.secure.get(TOKEN_KEY)?.map(SessionToken::new))
    }

    fn set_token(&self, token: &SessionToken) -> Result<(), SessionError> {
        self.secure
            .set(TOKEN_KEY, token.as_str(), &self.token_attrs)
            .map_err(Into::into)
    }

    fn remove_token(&self) -> Result<(), SessionError> {
        self.secure.remove(TOKEN_KEY).map_err(Into::into)
    }

    fn user(&self) -> Result<Option<Principal>, SessionError> {
        let Some(raw) = self.durable.get(USER_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                warn!(error = %err, "cached user is corrupt, treating as absent");
                counter!(SESSION_CACHE_CORRUPT).increment(1);
                Ok(None)
            },
        }
    }

    fn set_user(&self, user: &Principal) -> Result<(), SessionError> {
        let raw = serde_json::to_string(user)?;
        self.durable.set(USER_KEY, &raw).map_err(Into::into)
    }

    fn remove_user(&self) -> Result<(), SessionError> {
        self.durable.remove(USER_KEY).map_err(Into::into)
    }

    #[tracing::instrument(skip_all, fields(email = %credentials.email))]
    async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, SessionError> {
        let req = ApiRequest::post(LOGIN_ENDPOINT).json(credentials)?;
        let auth = self.authenticate(req).await?;
        counter!(SESSION_LOGIN).increment(1);
        info!(user_id = %auth.user.id, role = %auth.user.role, "logged in");
        Ok(auth)
    }

    #[tracing::instrument(skip_all, fields(email = %profile.email))]
    async fn register(&self, profile: &RegisterRequest) -> Result<AuthResponse, SessionError> {
        let req = ApiRequest::post(REGISTER_ENDPOINT).json(profile)?;
        let auth = self.authenticate(req).await?;
        counter!(SESSION_REGISTER).increment(1);
        info!(user_id = %auth.user.id, "registered");
        Ok(auth)
    }

    async fn logout(&self) {
        if let Err(err) = self.remove_token() {
            warn!(error = %err, "failed to clear stored token");
        }
        if let Err(err) = self.remove_user() {
            warn!(error = %err, "failed to clear cached user");
        }
        counter!(SESSION_LOGOUT).increment(1);
        info!("credentials cleared");
        self.hook.session_terminated(&self.login_path);
    }

    async fn refresh_token(&self) -> Option<AuthResponse> {
        match self.try_refresh().await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "token refresh failed, ending session");
                counter!(SESSION_REFRESH_FAILED).increment(1);
                self.logout().await;
                None
            },
        }
    }

    async fn validate_token(&self) -> bool {
        match self.try_validate().await {
            Ok(valid) => valid,
            Err(err) => {
                debug!(error = %err, "token validation failed");
                false
            },
        }
    }

    async fn current_user(&self) -> Option<Principal> {
        match self.fetch_current_user().await {
            Ok(user) => Some(user),
            Err(err) => {
                warn!(error = %err, "failed to fetch current user");
                None
            },
        }
    }
}
