//! Vault trait definitions.

use crate::{AuthMode, LockEvent, Session, StorageResult, VaultResult};
use pin_challenge::PinMode;
use tokio::sync::broadcast;

/// Trait for secure key/value storage backends.
pub trait SecureStorage: Send + Sync {
    /// Store a value securely
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Retrieve a value
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Delete a value
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Platform biometric sensor, consumed as a black box.
pub trait BiometricGate: Send + Sync {
    /// Whether the device currently reports biometrics available.
    fn is_available(&self) -> bool;

    /// Run the biometric prompt. Returns `false` when the user declines or
    /// backs out.
    fn authenticate(&self, reason: &str) -> bool;
}

/// Gate for hosts without a biometric sensor.
pub struct NoBiometrics;

impl BiometricGate for NoBiometrics {
    fn is_available(&self) -> bool {
        false
    }

    fn authenticate(&self, _reason: &str) -> bool {
        false
    }
}

/// Source of in-app PINs. The host implements this by presenting the
/// [`pin_challenge`] dialog in the requested mode.
///
/// Returns `None` when the user dismisses the dialog without completing it.
pub trait PinPrompt: Send + Sync {
    fn request_pin(&self, mode: PinMode) -> Option<String>;
}

/// Capability set of a secure session vault.
///
/// Two variants exist: [`DeviceVault`](crate::DeviceVault) backed by the
/// platform keyring and biometric sensor, and [`SimVault`](crate::SimVault)
/// backed by an encrypted file and the PIN challenge. Callers hold a
/// `Box<dyn VaultAdapter>` picked at construction time.
pub trait VaultAdapter: Send + Sync {
    /// Return the stored session, running the unlock gate if the vault is
    /// locked.
    ///
    /// `Ok(None)` means no session is stored, or the user backed out of the
    /// gate. `Err(VaultError::Locked)` means the vault is locked and no
    /// unlock attempt was possible.
    fn restore(&self) -> VaultResult<Option<Session>>;

    /// Persist a session under the given unlock requirement.
    fn login(&self, session: &Session, mode: AuthMode) -> VaultResult<()>;

    /// Erase the persisted session and any unlock material.
    fn logout(&self) -> VaultResult<()>;

    /// Drop the unlocked state immediately and notify subscribers.
    fn lock(&self);

    /// Whether a session is persisted, without touching the gate.
    fn has_stored_session(&self) -> bool;

    /// The unlock requirement the stored session was saved under.
    fn auth_mode(&self) -> VaultResult<AuthMode>;

    /// Whether the device currently reports biometrics available.
    fn is_biometrics_available(&self) -> bool;

    /// Subscribe to lock notifications.
    fn lock_events(&self) -> broadcast::Receiver<LockEvent>;
}
