//! Data service HTTP clients.
//!
//! [`ApiClient`] authorizes outgoing requests with the current access token
//! and reacts to rejections; [`AuthApi`] is the credential gateway against
//! the same service.

use crate::authenticator::CredentialGateway;
use crate::error::{AuthError, AuthResult};
use crate::models::{LoginGrant, User};
use crate::session::SessionStore;
use crate::state::{AuthAction, AuthStore};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Authorized client for the data service.
///
/// The bearer token is read from the session store at send time, per
/// request, so a session stored after this client was built is picked up
/// automatically. A 401 response clears the session state once and still
/// surfaces as an error to the caller.
pub struct ApiClient {
    session: Arc<SessionStore>,
    auth: Arc<AuthStore>,
}

impl ApiClient {
    pub fn new(session: Arc<SessionStore>, auth: Arc<AuthStore>) -> Self {
        Self { session, auth }
    }

    /// GET a JSON resource relative to the service base URL.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AuthResult<T> {
        let response = self.send(path).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send(&self, path: &str) -> AuthResult<reqwest::Response> {
        let url = format!("{}{}", self.session.base_url(), path);
        let mut request = self.session.http().get(&url);
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }

        debug!(%url, "data service request");
        let response = request.send().await?;

        match response.status() {
            reqwest::StatusCode::UNAUTHORIZED => {
                warn!(%url, "request rejected, clearing session");
                // the token is dead; later requests must not carry it
                self.session.forget_in_memory();
                self.auth.dispatch(AuthAction::ClearSession);
                Err(AuthError::Unauthorized)
            }
            status if status.is_success() => Ok(response),
            status => Err(AuthError::Api(format!("{} failed: {}", path, status))),
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    success: bool,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

/// Credential gateway backed by the data service's `/login` and `/logout`.
pub struct AuthApi {
    http: reqwest::Client,
    base_url: String,
}

impl AuthApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl CredentialGateway for AuthApi {
    async fn login(&self, username: &str, password: &str) -> AuthResult<Option<LoginGrant>> {
        let url = format!("{}/login", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::Api(format!(
                "login failed: {}",
                response.status()
            )));
        }

        let body: LoginResponse = response.json().await?;
        match body {
            LoginResponse {
                success: true,
                token: Some(token),
                user: Some(user),
            } => Ok(Some(LoginGrant { user, token })),
            _ => Ok(None),
        }
    }

    async fn logout(&self, token: &str) -> AuthResult<()> {
        let url = format!("{}/logout", self.base_url);
        let response = self.http.post(&url).bearer_auth(token).send().await?;
        if !response.status().is_success() {
            return Err(AuthError::Api(format!(
                "logout failed: {}",
                response.status()
            )));
        }
        Ok(())
    }
}
