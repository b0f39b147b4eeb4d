//! Windows Credential Vault keyring backend.

use crate::{SecureStorage, StorageError, StorageResult};
use tracing::debug;
use windows::{
    core::HSTRING,
    Security::Credentials::{PasswordCredential, PasswordVault},
};

/// ERROR_NOT_FOUND as surfaced by the Credential Vault APIs.
const ERROR_NOT_FOUND: u32 = 0x80070490;

/// Credential Vault based storage for Windows.
pub struct CredentialStorage {
    resource_name: String,
}

impl CredentialStorage {
    pub fn new(service_name: &str) -> StorageResult<Self> {
        // verify the vault is reachable
        PasswordVault::new().map_err(|e| {
            StorageError::Platform(format!("Credential Vault unavailable: {}", e))
        })?;

        Ok(Self {
            resource_name: service_name.to_string(),
        })
    }

    fn vault(&self) -> StorageResult<PasswordVault> {
        PasswordVault::new()
            .map_err(|e| StorageError::Platform(format!("Credential Vault unavailable: {}", e)))
    }
}

impl SecureStorage for CredentialStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(resource = %self.resource_name, key = %key, "setting credential");

        let vault = self.vault()?;
        let _ = self.delete(key);

        let credential = PasswordCredential::CreatePasswordCredential(
            &HSTRING::from(&self.resource_name),
            &HSTRING::from(key),
            &HSTRING::from(value),
        )
        .map_err(|e| StorageError::Platform(format!("credential create failed: {}", e)))?;
        vault
            .Add(&credential)
            .map_err(|e| StorageError::Platform(format!("credential add failed: {}", e)))?;
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        debug!(resource = %self.resource_name, key = %key, "reading credential");

        let vault = self.vault()?;
        match vault.Retrieve(&HSTRING::from(&self.resource_name), &HSTRING::from(key)) {
            Ok(credential) => {
                credential.RetrievePassword().map_err(|e| {
                    StorageError::Platform(format!("password retrieve failed: {}", e))
                })?;
                let password = credential
                    .Password()
                    .map_err(|e| StorageError::Platform(format!("password read failed: {}", e)))?;
                Ok(Some(password.to_string()))
            }
            Err(e) if e.code().0 as u32 == ERROR_NOT_FOUND => Ok(None),
            Err(e) => Err(StorageError::Platform(format!(
                "credential retrieve failed: {}",
                e
            ))),
        }
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(resource = %self.resource_name, key = %key, "deleting credential");

        let vault = self.vault()?;
        match vault.Retrieve(&HSTRING::from(&self.resource_name), &HSTRING::from(key)) {
            Ok(credential) => {
                vault
                    .Remove(&credential)
                    .map_err(|e| StorageError::Platform(format!("credential remove failed: {}", e)))?;
                Ok(true)
            }
            Err(e) if e.code().0 as u32 == ERROR_NOT_FOUND => Ok(false),
            Err(e) => Err(StorageError::Platform(format!(
                "credential retrieve failed: {}",
                e
            ))),
        }
    }
}
