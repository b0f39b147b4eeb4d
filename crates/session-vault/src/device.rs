//! Device vault: platform keyring + biometric/PIN gate.

use crate::lock_state::LockState;
use crate::{
    AuthMode, BiometricGate, LockEvent, PinPrompt, SecureStorage, Session, VaultAdapter,
    VaultError, VaultKeys, VaultMeta, VaultResult,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use pin_challenge::PinMode;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const UNLOCK_REASON: &str = "Unlock your session";
const PIN_SALT_SIZE: usize = 16;

/// Vault variant for hosts with a platform keyring.
///
/// The session and its metadata live in the keyring; the unlock gate is the
/// biometric sensor and/or a salted-digest PIN check, per the stored
/// [`AuthMode`].
pub struct DeviceVault {
    storage: Box<dyn SecureStorage>,
    gate: Box<dyn BiometricGate>,
    pin_prompt: Option<Box<dyn PinPrompt>>,
    lock_state: LockState,
}

impl DeviceVault {
    /// Create a device vault over the given keyring backend and gate.
    pub fn new(
        storage: Box<dyn SecureStorage>,
        gate: Box<dyn BiometricGate>,
        lock_after: Duration,
    ) -> Self {
        Self {
            storage,
            gate,
            pin_prompt: None,
            lock_state: LockState::new(lock_after),
        }
    }

    /// Wire a PIN source for the passcode unlock paths.
    pub fn with_pin_prompt(mut self, prompt: Box<dyn PinPrompt>) -> Self {
        self.pin_prompt = Some(prompt);
        self
    }

    fn read_meta(&self) -> VaultResult<Option<VaultMeta>> {
        match self.storage.get(VaultKeys::META)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn read_session(&self) -> VaultResult<Option<Session>> {
        match self.storage.get(VaultKeys::SESSION)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn store_pin_digest(&self, pin: &str) -> VaultResult<()> {
        let mut salt = [0u8; PIN_SALT_SIZE];
        rand::thread_rng().fill_bytes(&mut salt);
        let digest = pin_digest(&salt, pin);
        let record = format!("{}:{}", BASE64.encode(salt), BASE64.encode(digest));
        self.storage.set(VaultKeys::PIN_DIGEST, &record)?;
        Ok(())
    }

    fn verify_pin(&self, pin: &str) -> VaultResult<bool> {
        let Some(record) = self.storage.get(VaultKeys::PIN_DIGEST)? else {
            return Ok(false);
        };
        let Some((salt_b64, digest_b64)) = record.split_once(':') else {
            return Err(VaultError::Crypto("malformed PIN digest record".to_string()));
        };
        let salt = BASE64
            .decode(salt_b64)
            .map_err(|e| VaultError::Crypto(e.to_string()))?;
        let stored = BASE64
            .decode(digest_b64)
            .map_err(|e| VaultError::Crypto(e.to_string()))?;
        Ok(pin_digest(&salt, pin).as_slice() == stored.as_slice())
    }

    /// Run the PIN unlock round. `Ok(None)` when the user backs out.
    fn challenge_pin(&self) -> VaultResult<Option<Session>> {
        let Some(prompt) = self.pin_prompt.as_ref() else {
            return Err(VaultError::Locked);
        };
        let Some(pin) = prompt.request_pin(PinMode::Unlock) else {
            debug!("pin unlock dismissed by user");
            return Ok(None);
        };
        if !self.verify_pin(&pin)? {
            warn!("pin unlock rejected: wrong PIN");
            return Err(VaultError::InvalidPin);
        }
        self.read_session()
    }
}

impl VaultAdapter for DeviceVault {
    fn restore(&self) -> VaultResult<Option<Session>> {
        if let Some(session) = self.lock_state.cached() {
            return Ok(Some(session));
        }

        let Some(meta) = self.read_meta()? else {
            return Ok(None);
        };

        let unlocked = match meta.auth_mode {
            AuthMode::BiometricOnly => {
                if !self.gate.is_available() {
                    return Err(VaultError::Locked);
                }
                if !self.gate.authenticate(UNLOCK_REASON) {
                    debug!("biometric unlock declined");
                    return Ok(None);
                }
                self.read_session()?
            }
            AuthMode::PasscodeOnly => self.challenge_pin()?,
            AuthMode::BiometricAndPasscode => {
                if self.gate.is_available() {
                    if self.gate.authenticate(UNLOCK_REASON) {
                        self.read_session()?
                    } else if self.pin_prompt.is_some() {
                        // biometric declined, fall back to the PIN
                        self.challenge_pin()?
                    } else {
                        return Ok(None);
                    }
                } else if self.pin_prompt.is_some() {
                    self.challenge_pin()?
                } else {
                    return Err(VaultError::Locked);
                }
            }
        };

        if let Some(session) = unlocked {
            info!(username = %session.username, "vault unlocked");
            self.lock_state.unlock(session.clone());
            Ok(Some(session))
        } else {
            Ok(None)
        }
    }

    fn login(&self, session: &Session, mode: AuthMode) -> VaultResult<()> {
        if mode.uses_passcode() {
            let prompt = self
                .pin_prompt
                .as_ref()
                .ok_or(VaultError::PinUnavailable("no PIN prompt configured"))?;
            let pin = prompt
                .request_pin(PinMode::SetPasscode)
                .ok_or(VaultError::PinUnavailable("PIN setup cancelled"))?;
            self.store_pin_digest(&pin)?;
        }

        self.storage
            .set(VaultKeys::SESSION, &serde_json::to_string(session)?)?;
        let meta = VaultMeta::new(mode, session.username.clone());
        self.storage
            .set(VaultKeys::META, &serde_json::to_string(&meta)?)?;

        info!(username = %session.username, ?mode, "session stored in device vault");
        self.lock_state.unlock(session.clone());
        Ok(())
    }

    fn logout(&self) -> VaultResult<()> {
        self.storage.delete(VaultKeys::SESSION)?;
        self.storage.delete(VaultKeys::META)?;
        self.storage.delete(VaultKeys::PIN_DIGEST)?;
        self.lock_state.forget();
        debug!("device vault cleared");
        Ok(())
    }

    fn lock(&self) {
        self.lock_state.lock(self.has_stored_session());
    }

    fn has_stored_session(&self) -> bool {
        self.storage.has(VaultKeys::META).unwrap_or(false)
    }

    fn auth_mode(&self) -> VaultResult<AuthMode> {
        match self.read_meta()? {
            Some(meta) => Ok(meta.auth_mode),
            None => Err(crate::StorageError::NotFound(VaultKeys::META.to_string()).into()),
        }
    }

    fn is_biometrics_available(&self) -> bool {
        self.gate.is_available()
    }

    fn lock_events(&self) -> broadcast::Receiver<LockEvent> {
        self.lock_state.subscribe()
    }
}

fn pin_digest(salt: &[u8], pin: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(pin.as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStorage, ScriptedGate, ScriptedPrompt};

    fn session() -> Session {
        Session::new("3884915llf950", "test@test.org")
    }

    fn biometric_vault(available: bool, pass: bool) -> DeviceVault {
        DeviceVault::new(
            Box::new(MemoryStorage::new()),
            Box::new(ScriptedGate::new(available, pass)),
            Duration::ZERO,
        )
    }

    fn passcode_vault(prompt: ScriptedPrompt) -> DeviceVault {
        DeviceVault::new(
            Box::new(MemoryStorage::new()),
            Box::new(ScriptedGate::new(false, false)),
            Duration::ZERO,
        )
        .with_pin_prompt(Box::new(prompt))
    }

    #[test]
    fn restore_on_empty_vault_yields_none() {
        let vault = biometric_vault(true, true);
        assert_eq!(vault.restore().unwrap(), None);
        assert!(!vault.has_stored_session());
    }

    #[test]
    fn biometric_login_then_cached_restore() {
        let vault = biometric_vault(true, true);
        vault.login(&session(), AuthMode::BiometricOnly).unwrap();

        assert!(vault.has_stored_session());
        assert_eq!(vault.auth_mode().unwrap(), AuthMode::BiometricOnly);
        // cached, no gate needed
        assert_eq!(vault.restore().unwrap(), Some(session()));
    }

    #[test]
    fn locked_biometric_vault_prompts_the_gate() {
        let vault = biometric_vault(true, true);
        vault.login(&session(), AuthMode::BiometricOnly).unwrap();
        vault.lock();

        assert_eq!(vault.restore().unwrap(), Some(session()));
    }

    #[test]
    fn biometric_decline_leaves_vault_locked_without_error() {
        let vault = biometric_vault(true, false);
        vault.login(&session(), AuthMode::BiometricOnly).unwrap();
        vault.lock();

        assert_eq!(vault.restore().unwrap(), None);
        // the session is still stored for a later attempt
        assert!(vault.has_stored_session());
    }

    #[test]
    fn biometrics_gone_yields_locked_error() {
        let vault = biometric_vault(true, true);
        vault.login(&session(), AuthMode::BiometricOnly).unwrap();

        // simulate a relaunch with the sensor gone: same keyring contents,
        // fresh vault instance without biometrics
        let DeviceVault {
            storage, pin_prompt, ..
        } = vault;
        let vault = DeviceVault {
            storage,
            gate: Box::new(ScriptedGate::new(false, false)),
            pin_prompt,
            lock_state: crate::lock_state::LockState::new(Duration::ZERO),
        };
        assert!(matches!(vault.restore(), Err(VaultError::Locked)));
    }

    #[test]
    fn passcode_login_requires_a_pin_source() {
        let vault = biometric_vault(false, false);
        assert!(matches!(
            vault.login(&session(), AuthMode::PasscodeOnly),
            Err(VaultError::PinUnavailable(_))
        ));
    }

    #[test]
    fn passcode_round_trip() {
        let prompt = ScriptedPrompt::with_pins(&["4231", "4231"]);
        let vault = passcode_vault(prompt);
        vault.login(&session(), AuthMode::PasscodeOnly).unwrap();
        vault.lock();

        assert_eq!(vault.restore().unwrap(), Some(session()));
    }

    #[test]
    fn wrong_pin_is_an_invalid_pin_error() {
        let prompt = ScriptedPrompt::with_pins(&["4231", "9999"]);
        let vault = passcode_vault(prompt);
        vault.login(&session(), AuthMode::PasscodeOnly).unwrap();
        vault.lock();

        assert!(matches!(vault.restore(), Err(VaultError::InvalidPin)));
        assert!(vault.has_stored_session());
    }

    #[test]
    fn cancelled_pin_unlock_yields_none() {
        let prompt = ScriptedPrompt::new(vec![Some("4231".to_string()), None]);
        let vault = passcode_vault(prompt);
        vault.login(&session(), AuthMode::PasscodeOnly).unwrap();
        vault.lock();

        assert_eq!(vault.restore().unwrap(), None);
        assert!(vault.has_stored_session());
    }

    #[test]
    fn logout_erases_everything() {
        let prompt = ScriptedPrompt::with_pins(&["4231"]);
        let vault = passcode_vault(prompt);
        vault.login(&session(), AuthMode::PasscodeOnly).unwrap();
        vault.logout().unwrap();

        assert!(!vault.has_stored_session());
        assert_eq!(vault.restore().unwrap(), None);
        assert!(vault.auth_mode().is_err());
    }

    #[test]
    fn lock_emits_event_with_saved_flag() {
        let vault = biometric_vault(true, true);
        vault.login(&session(), AuthMode::BiometricOnly).unwrap();
        let mut rx = vault.lock_events();
        vault.lock();

        assert_eq!(
            rx.try_recv().unwrap(),
            LockEvent {
                saved: true,
                timeout: false
            }
        );
    }

    #[tokio::test]
    async fn idle_timeout_locks_the_vault() {
        let vault = DeviceVault::new(
            Box::new(MemoryStorage::new()),
            Box::new(ScriptedGate::new(true, true)),
            Duration::from_millis(20),
        );
        vault.login(&session(), AuthMode::BiometricOnly).unwrap();
        let mut rx = vault.lock_events();

        let event = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("timed out waiting for lock event")
            .unwrap();
        assert_eq!(
            event,
            LockEvent {
                saved: true,
                timeout: true
            }
        );
        // next restore runs the gate again
        assert_eq!(vault.restore().unwrap(), Some(session()));
    }
}
