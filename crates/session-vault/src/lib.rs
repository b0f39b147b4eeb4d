//! Secure session vault with an unlock gate.
//!
//! A vault holds the signed-in session behind the platform keyring (macOS
//! Keychain, linux Secret Service, Windows Credential Vault) and an unlock
//! gate chosen at login time: biometrics, a session PIN, or both. Hosts
//! without a keyring fall back to [`SimVault`], an encrypted file keyed by
//! the session PIN.
//!
//! [`VaultAdapter`] is the seam the session layer talks to; both variants
//! implement it, and so do the scripted fakes in tests.

mod crypto;
mod device;
mod keys;
pub(crate) mod lock_state;
mod sim;
mod traits;
mod types;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

pub use device::DeviceVault;
pub use keys::VaultKeys;
pub use pin_challenge::PinMode;
pub use sim::SimVault;
pub use traits::{BiometricGate, NoBiometrics, PinPrompt, SecureStorage, VaultAdapter};
pub use types::{AuthMode, LockEvent, Session, VaultMeta};

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Keyring service name shared by every stored entry.
pub const SERVICE_NAME: &str = "com.teataster.app";

/// Errors from the platform keyring backends.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Platform storage error: {0}")]
    Platform(String),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Errors from the vault itself.
#[derive(Error, Debug)]
pub enum VaultError {
    /// The vault holds a session but cannot run its unlock gate.
    #[error("Vault is locked")]
    Locked,

    #[error("Invalid PIN")]
    InvalidPin,

    /// A passcode path was taken without a usable PIN source.
    #[error("PIN unavailable: {0}")]
    PinUnavailable(&'static str),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type VaultResult<T> = Result<T, VaultError>;

/// Create the keyring backend for the current platform.
#[cfg(target_os = "macos")]
pub fn create_storage() -> StorageResult<Box<dyn SecureStorage>> {
    Ok(Box::new(macos::KeychainStorage::new(SERVICE_NAME)?))
}

/// Create the keyring backend for the current platform.
#[cfg(target_os = "linux")]
pub fn create_storage() -> StorageResult<Box<dyn SecureStorage>> {
    Ok(Box::new(linux::SecretServiceStorage::new(SERVICE_NAME)?))
}

/// Create the keyring backend for the current platform.
#[cfg(target_os = "windows")]
pub fn create_storage() -> StorageResult<Box<dyn SecureStorage>> {
    Ok(Box::new(windows::CredentialStorage::new(SERVICE_NAME)?))
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
pub fn create_storage() -> StorageResult<Box<dyn SecureStorage>> {
    Err(StorageError::Platform(
        "no keyring backend for this platform".to_string(),
    ))
}

/// Build the vault for this host.
///
/// Prefers [`DeviceVault`] over the platform keyring; when no keyring is
/// reachable, falls back to a [`SimVault`] at the given paths.
pub fn create_vault(
    gate: Box<dyn BiometricGate>,
    pin_prompt: Option<Box<dyn PinPrompt>>,
    sim_blob_path: PathBuf,
    sim_meta_path: PathBuf,
    lock_after: Duration,
) -> Box<dyn VaultAdapter> {
    match create_storage() {
        Ok(storage) => {
            info!("using device vault over the platform keyring");
            let mut vault = DeviceVault::new(storage, gate, lock_after);
            if let Some(prompt) = pin_prompt {
                vault = vault.with_pin_prompt(prompt);
            }
            Box::new(vault)
        }
        Err(e) => {
            warn!(error = %e, "platform keyring unavailable, using simulated vault");
            let mut vault = SimVault::new(sim_blob_path, sim_meta_path, lock_after);
            if let Some(prompt) = pin_prompt {
                vault = vault.with_pin_prompt(prompt);
            }
            Box::new(vault)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted fakes shared by the vault tests.

    use super::{PinMode, StorageResult};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory keyring stand-in.
    pub struct MemoryStorage {
        data: Mutex<HashMap<String, String>>,
    }

    impl MemoryStorage {
        pub fn new() -> Self {
            Self {
                data: Mutex::new(HashMap::new()),
            }
        }
    }

    impl super::SecureStorage for MemoryStorage {
        fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            self.data
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            Ok(self.data.lock().unwrap().get(key).cloned())
        }

        fn delete(&self, key: &str) -> StorageResult<bool> {
            Ok(self.data.lock().unwrap().remove(key).is_some())
        }
    }

    /// Gate with a fixed availability and verdict.
    pub struct ScriptedGate {
        available: bool,
        pass: bool,
    }

    impl ScriptedGate {
        pub fn new(available: bool, pass: bool) -> Self {
            Self { available, pass }
        }
    }

    impl super::BiometricGate for ScriptedGate {
        fn is_available(&self) -> bool {
            self.available
        }

        fn authenticate(&self, _reason: &str) -> bool {
            self.pass
        }
    }

    /// PIN source answering from a fixed queue. `None` entries model the
    /// user backing out of the prompt.
    pub struct ScriptedPrompt {
        answers: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedPrompt {
        pub fn new(answers: Vec<Option<String>>) -> Self {
            Self {
                answers: Mutex::new(answers),
            }
        }

        pub fn with_pins(pins: &[&str]) -> Self {
            Self::new(pins.iter().map(|p| Some(p.to_string())).collect())
        }
    }

    impl super::PinPrompt for ScriptedPrompt {
        fn request_pin(&self, _mode: PinMode) -> Option<String> {
            let mut answers = self.answers.lock().unwrap();
            if answers.is_empty() {
                None
            } else {
                answers.remove(0)
            }
        }
    }
}
