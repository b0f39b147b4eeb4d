//! Authentication state machine.
//!
//! The state is reduced from dispatched actions; nothing else mutates it.
//! Every reachable state upholds one invariant: the status is
//! [`AuthStatus::Authenticated`] exactly when a user is present.

use crate::models::User;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::debug;

/// Where the session lifecycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// Startup restore has not finished yet.
    Initializing,
    Authenticated,
    Unauthenticated,
}

/// The full authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub status: AuthStatus,
    pub user: Option<User>,
    pub error: Option<String>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            status: AuthStatus::Initializing,
            user: None,
            error: None,
        }
    }
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Authenticated
    }
}

/// State transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    LoginSuccess(User),
    LoginFailure(String),
    Logout,
    /// The stored session turned out to be unusable (expired token,
    /// unreachable vault). Unlike [`AuthAction::Logout`] this is not
    /// user-initiated.
    ClearSession,
}

/// Apply one action to a state. Total: every action is valid in every
/// state, and each produces a full replacement state.
pub fn reduce(_state: &AuthState, action: &AuthAction) -> AuthState {
    match action {
        AuthAction::LoginSuccess(user) => AuthState {
            status: AuthStatus::Authenticated,
            user: Some(user.clone()),
            error: None,
        },
        AuthAction::LoginFailure(message) => AuthState {
            status: AuthStatus::Unauthenticated,
            user: None,
            error: Some(message.clone()),
        },
        // identical effects, distinct names so call sites stay self-documenting
        AuthAction::Logout | AuthAction::ClearSession => AuthState {
            status: AuthStatus::Unauthenticated,
            user: None,
            error: None,
        },
    }
}

/// Shared, observable authentication state.
///
/// Dispatch feeds the reducer; observers watch the resulting states in
/// order via [`AuthStore::subscribe`].
pub struct AuthStore {
    state: Mutex<AuthState>,
    notify: watch::Sender<AuthState>,
}

impl AuthStore {
    pub fn new() -> Arc<Self> {
        let initial = AuthState::default();
        let (notify, _) = watch::channel(initial.clone());
        Arc::new(Self {
            state: Mutex::new(initial),
            notify,
        })
    }

    /// Run the reducer and publish the new state.
    pub fn dispatch(&self, action: AuthAction) {
        let mut state = self.state.lock().unwrap();
        let next = reduce(&state, &action);
        debug!(?action, status = ?next.status, "auth state transition");
        *state = next.clone();
        // publish while the lock is held so observers see states in order
        let _ = self.notify.send(next);
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.state.lock().unwrap().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.notify.subscribe()
    }
}
