//! Core vault types.

use serde::{Deserialize, Serialize};

/// A persisted token + identity pair proving a prior successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Bearer token for authenticated calls.
    pub token: String,
    /// Username (email) the token was issued for.
    pub username: String,
}

impl Session {
    pub fn new(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
        }
    }
}

/// The vault's configured unlock requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Unlock with the in-app session PIN.
    PasscodeOnly,
    /// Unlock with the device biometric sensor only.
    BiometricOnly,
    /// Either gate unlocks the vault.
    BiometricAndPasscode,
}

impl AuthMode {
    /// Whether this mode stores a session PIN at login time.
    pub fn uses_passcode(self) -> bool {
        matches!(self, AuthMode::PasscodeOnly | AuthMode::BiometricAndPasscode)
    }
}

/// Notification that the vault has become inaccessible without
/// re-authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockEvent {
    /// Whether a session is still persisted behind the lock.
    pub saved: bool,
    /// Whether the lock was raised by the idle timeout (vs. an explicit lock).
    pub timeout: bool,
}

/// Metadata persisted next to the session so availability questions can be
/// answered without unlocking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultMeta {
    /// Unlock requirement the session was stored under.
    pub auth_mode: AuthMode,
    /// Username of the stored session.
    pub username: String,
    /// When the session was stored (RFC 3339).
    pub saved_at: String,
}

impl VaultMeta {
    pub fn new(auth_mode: AuthMode, username: impl Into<String>) -> Self {
        Self {
            auth_mode,
            username: username.into(),
            saved_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
