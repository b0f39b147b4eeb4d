//! Session store: the single owner of the vault and the in-memory session.

use crate::error::{AuthError, AuthResult};
use crate::models::User;
use crate::state::{AuthAction, AuthStore};
use session_vault::{AuthMode, Session, VaultAdapter, VaultError};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Owns the vault plus the in-memory copies of the session and the user.
///
/// Everything above this layer reads tokens and users from here; nothing
/// else touches the vault.
pub struct SessionStore {
    vault: Arc<dyn VaultAdapter>,
    auth: Arc<AuthStore>,
    http: reqwest::Client,
    base_url: String,
    user: Mutex<Option<User>>,
    session: Mutex<Option<Session>>,
}

impl SessionStore {
    pub fn new(
        vault: Arc<dyn VaultAdapter>,
        auth: Arc<AuthStore>,
        base_url: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            vault,
            auth,
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            user: Mutex::new(None),
            session: Mutex::new(None),
        })
    }

    /// Startup: watch for vault locks, then try to restore the stored
    /// session. The auth state settles either way; a restore or profile
    /// fetch failure still surfaces to the caller after the state does.
    pub async fn init(self: &Arc<Self>) -> AuthResult<()> {
        self.spawn_lock_watcher();

        match self.restore_session().await {
            Ok(Some(user)) => {
                self.auth.dispatch(AuthAction::LoginSuccess(user));
                Ok(())
            }
            Ok(None) => {
                self.auth.dispatch(AuthAction::ClearSession);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "session restore failed");
                self.auth.dispatch(AuthAction::ClearSession);
                Err(e)
            }
        }
    }

    /// Try to bring the stored session back into memory.
    ///
    /// A vault that is locked with no way to unlock it is purged: a session
    /// nobody can ever reach again is not worth keeping.
    pub async fn restore_session(&self) -> AuthResult<Option<User>> {
        // the vault decides whether a gate must run; in-memory state alone
        // must never bypass it
        let session = match self.vault.restore() {
            Ok(Some(session)) => session,
            Ok(None) => return Ok(None),
            Err(VaultError::Locked) => {
                warn!("vault locked with no unlock path, purging stored session");
                self.vault.logout()?;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let cached = self.user.lock().unwrap().clone();
        let user = match cached {
            Some(user) => user,
            None => self.fetch_current_user(&session.token).await?,
        };
        info!(email = %user.email, "session restored");
        *self.session.lock().unwrap() = Some(session);
        *self.user.lock().unwrap() = Some(user.clone());
        Ok(Some(user))
    }

    /// Store a fresh session. The unlock mode is picked per call: the
    /// biometric gate when the sensor is available, the session PIN
    /// otherwise.
    pub fn set(&self, user: User, token: impl Into<String>) -> AuthResult<()> {
        let mode = if self.vault.is_biometrics_available() {
            AuthMode::BiometricOnly
        } else {
            AuthMode::PasscodeOnly
        };
        let session = Session::new(token, user.email.clone());
        self.vault.login(&session, mode)?;

        *self.session.lock().unwrap() = Some(session);
        *self.user.lock().unwrap() = Some(user);
        Ok(())
    }

    /// Erase the stored session everywhere.
    pub fn clear(&self) -> AuthResult<()> {
        self.vault.logout()?;
        *self.session.lock().unwrap() = None;
        *self.user.lock().unwrap() = None;
        Ok(())
    }

    /// The current access token, if a session is in memory.
    pub fn token(&self) -> Option<String> {
        self.session
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.user.lock().unwrap().clone()
    }

    pub fn has_stored_session(&self) -> bool {
        self.vault.has_stored_session()
    }

    pub fn is_biometrics_available(&self) -> bool {
        self.vault.is_biometrics_available()
    }

    pub fn auth_mode(&self) -> AuthResult<AuthMode> {
        Ok(self.vault.auth_mode()?)
    }

    /// Drop the in-memory copies without touching the vault. Used when the
    /// session dies out from under us (vault lock, server-side rejection).
    pub(crate) fn forget_in_memory(&self) {
        *self.session.lock().unwrap() = None;
        *self.user.lock().unwrap() = None;
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    async fn fetch_current_user(&self, token: &str) -> AuthResult<User> {
        let url = format!("{}/users/current", self.base_url);
        let response = self.http.get(&url).bearer_auth(token).send().await?;

        match response.status() {
            status if status.is_success() => Ok(response.json::<User>().await?),
            reqwest::StatusCode::UNAUTHORIZED => Err(AuthError::Unauthorized),
            status => Err(AuthError::Api(format!(
                "fetching current user failed: {}",
                status
            ))),
        }
    }

    /// Forward vault lock events into the auth state: a locked vault means
    /// the in-memory session is gone until the next unlock.
    fn spawn_lock_watcher(self: &Arc<Self>) {
        let mut events = self.vault.lock_events();
        let store = Arc::downgrade(self);

        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                let Some(store) = store.upgrade() else { break };
                debug!(saved = event.saved, timeout = event.timeout, "vault locked");
                store.forget_in_memory();
                store.auth.dispatch(AuthAction::ClearSession);
            }
        });
    }
}
