//! Login, logout, and unlock orchestration.

use crate::error::AuthResult;
use crate::models::LoginGrant;
use crate::session::SessionStore;
use crate::state::{AuthAction, AuthStore};
use session_vault::AuthMode;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// Shown for every failed sign-in, whatever actually went wrong.
pub const LOGIN_FAILED_MESSAGE: &str = "Unable to log in, please try again";

/// Exchanges credentials for a session with the data service.
///
/// `login` returns `Ok(None)` when the service rejects the credentials;
/// transport and server errors come back as `Err`.
pub trait CredentialGateway: Send + Sync {
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = AuthResult<Option<LoginGrant>>> + Send;

    fn logout(&self, token: &str) -> impl Future<Output = AuthResult<()>> + Send;
}

/// Drives the auth state machine from user-facing operations.
pub struct Authenticator<G: CredentialGateway> {
    gateway: G,
    session: Arc<SessionStore>,
    auth: Arc<AuthStore>,
}

impl<G: CredentialGateway> Authenticator<G> {
    pub fn new(gateway: G, session: Arc<SessionStore>, auth: Arc<AuthStore>) -> Self {
        Self {
            gateway,
            session,
            auth,
        }
    }

    /// Sign in with credentials.
    ///
    /// Never returns an error: every failure, rejected credentials and
    /// broken transport alike, lands in the state as the same login
    /// failure message.
    pub async fn login(&self, username: &str, password: &str) {
        let grant = match self.gateway.login(username, password).await {
            Ok(Some(grant)) => grant,
            Ok(None) => {
                info!(username, "credentials rejected");
                self.auth
                    .dispatch(AuthAction::LoginFailure(LOGIN_FAILED_MESSAGE.to_string()));
                return;
            }
            Err(e) => {
                warn!(error = %e, "login request failed");
                self.auth
                    .dispatch(AuthAction::LoginFailure(LOGIN_FAILED_MESSAGE.to_string()));
                return;
            }
        };

        if let Err(e) = self.session.set(grant.user.clone(), grant.token) {
            warn!(error = %e, "storing the new session failed");
            self.auth
                .dispatch(AuthAction::LoginFailure(LOGIN_FAILED_MESSAGE.to_string()));
            return;
        }

        self.auth.dispatch(AuthAction::LoginSuccess(grant.user));
    }

    /// Sign out. The local session always goes away, even when the server
    /// side of the logout fails.
    pub async fn logout(&self) {
        if let Some(token) = self.session.token() {
            if let Err(e) = self.gateway.logout(&token).await {
                warn!(error = %e, "server-side logout failed, clearing locally anyway");
            }
        }
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "clearing the session failed");
        }
        self.auth.dispatch(AuthAction::Logout);
    }

    /// Whether the stored session could be unlocked right now, without side
    /// effects: passcode modes always can, biometric-only needs the sensor.
    pub fn can_unlock(&self) -> bool {
        if !self.session.has_stored_session() {
            return false;
        }
        match self.session.auth_mode() {
            Ok(AuthMode::PasscodeOnly) | Ok(AuthMode::BiometricAndPasscode) => true,
            Ok(AuthMode::BiometricOnly) => self.session.is_biometrics_available(),
            Err(_) => false,
        }
    }

    /// Run the vault's unlock gate and sign back in on success. Backing
    /// out of the gate leaves the state untouched.
    pub async fn unlock(&self) {
        match self.session.restore_session().await {
            Ok(Some(user)) => self.auth.dispatch(AuthAction::LoginSuccess(user)),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "unlock failed"),
        }
    }
}
