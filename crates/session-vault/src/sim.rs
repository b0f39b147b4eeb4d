//! Simulated vault for hosts without a secure enclave.
//!
//! The session is sealed with a PIN-derived key into a single file; a
//! plaintext metadata sidecar answers availability questions without
//! unlocking. The "biometric" step is always the PIN challenge.

use crate::lock_state::LockState;
use crate::{
    crypto, AuthMode, LockEvent, PinPrompt, Session, VaultAdapter, VaultError, VaultMeta,
    VaultResult,
};
use pin_challenge::PinMode;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// File-backed vault variant gated by the in-app PIN.
pub struct SimVault {
    blob_path: PathBuf,
    meta_path: PathBuf,
    pin_prompt: Option<Box<dyn PinPrompt>>,
    lock_state: LockState,
}

impl SimVault {
    /// Create a simulated vault over the given blob and metadata paths.
    pub fn new(blob_path: PathBuf, meta_path: PathBuf, lock_after: Duration) -> Self {
        Self {
            blob_path,
            meta_path,
            pin_prompt: None,
            lock_state: LockState::new(lock_after),
        }
    }

    /// Wire the PIN source. Without one the vault can store nothing and a
    /// locked vault stays locked.
    pub fn with_pin_prompt(mut self, prompt: Box<dyn PinPrompt>) -> Self {
        self.pin_prompt = Some(prompt);
        self
    }

    fn read_meta(&self) -> VaultResult<Option<VaultMeta>> {
        if !self.meta_path.is_file() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.meta_path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn remove_if_present(path: &PathBuf) -> VaultResult<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl VaultAdapter for SimVault {
    fn restore(&self) -> VaultResult<Option<Session>> {
        if let Some(session) = self.lock_state.cached() {
            return Ok(Some(session));
        }
        if !self.has_stored_session() {
            return Ok(None);
        }

        let Some(prompt) = self.pin_prompt.as_ref() else {
            return Err(VaultError::Locked);
        };
        let Some(pin) = prompt.request_pin(PinMode::Unlock) else {
            debug!("pin unlock dismissed by user");
            return Ok(None);
        };

        let blob = std::fs::read(&self.blob_path)?;
        let plaintext = match crypto::open(&pin, &blob) {
            Ok(plaintext) => plaintext,
            Err(VaultError::Crypto(_)) => {
                warn!("simulated vault unlock rejected: wrong PIN");
                return Err(VaultError::InvalidPin);
            }
            Err(e) => return Err(e),
        };
        let session: Session = serde_json::from_slice(&plaintext)?;

        info!(username = %session.username, "simulated vault unlocked");
        self.lock_state.unlock(session.clone());
        Ok(Some(session))
    }

    fn login(&self, session: &Session, mode: AuthMode) -> VaultResult<()> {
        let prompt = self
            .pin_prompt
            .as_ref()
            .ok_or(VaultError::PinUnavailable("no PIN prompt configured"))?;
        let pin = prompt
            .request_pin(PinMode::SetPasscode)
            .ok_or(VaultError::PinUnavailable("PIN setup cancelled"))?;

        if let Some(parent) = self.blob_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let blob = crypto::seal(&pin, &serde_json::to_vec(session)?)?;
        std::fs::write(&self.blob_path, blob)?;

        let meta = VaultMeta::new(mode, session.username.clone());
        std::fs::write(&self.meta_path, serde_json::to_string(&meta)?)?;

        info!(username = %session.username, ?mode, "session stored in simulated vault");
        self.lock_state.unlock(session.clone());
        Ok(())
    }

    fn logout(&self) -> VaultResult<()> {
        Self::remove_if_present(&self.blob_path)?;
        Self::remove_if_present(&self.meta_path)?;
        self.lock_state.forget();
        debug!("simulated vault cleared");
        Ok(())
    }

    fn lock(&self) {
        self.lock_state.lock(self.has_stored_session());
    }

    fn has_stored_session(&self) -> bool {
        self.meta_path.is_file() && self.blob_path.is_file()
    }

    fn auth_mode(&self) -> VaultResult<AuthMode> {
        match self.read_meta()? {
            Some(meta) => Ok(meta.auth_mode),
            None => Err(crate::StorageError::NotFound("vault metadata".to_string()).into()),
        }
    }

    fn is_biometrics_available(&self) -> bool {
        false
    }

    fn lock_events(&self) -> broadcast::Receiver<LockEvent> {
        self.lock_state.subscribe()
    }
}
