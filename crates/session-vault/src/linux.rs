//! Linux Secret Service keyring backend.

use crate::{SecureStorage, StorageError, StorageResult};
use secret_service::{blocking::SecretService, EncryptionType};
use std::collections::HashMap;
use tracing::debug;

/// Secret Service (GNOME Keyring / KWallet) backed storage.
pub struct SecretServiceStorage {
    service_name: String,
}

impl SecretServiceStorage {
    /// Create a new Secret Service storage instance, verifying the bus is
    /// reachable.
    pub fn new(service_name: &str) -> StorageResult<Self> {
        SecretService::connect(EncryptionType::Dh).map_err(|e| {
            StorageError::Platform(format!("Secret Service unavailable: {}", e))
        })?;

        Ok(Self {
            service_name: service_name.to_string(),
        })
    }

    fn with_collection<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&secret_service::blocking::Collection) -> StorageResult<T>,
    {
        let ss = SecretService::connect(EncryptionType::Dh)
            .map_err(|e| StorageError::Platform(e.to_string()))?;
        let collection = ss
            .get_default_collection()
            .map_err(|e| StorageError::Platform(e.to_string()))?;

        if collection.is_locked().unwrap_or(false) {
            collection
                .unlock()
                .map_err(|e| StorageError::Platform(format!("collection unlock failed: {}", e)))?;
        }

        f(&collection)
    }

    fn attributes<'a>(&'a self, key: &'a str) -> HashMap<&'a str, &'a str> {
        HashMap::from([("service", self.service_name.as_str()), ("key", key)])
    }
}

impl SecureStorage for SecretServiceStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(service = %self.service_name, key = %key, "setting keyring entry");

        self.with_collection(|collection| {
            collection
                .create_item(
                    &format!("{}/{}", self.service_name, key),
                    self.attributes(key),
                    value.as_bytes(),
                    true, // replace
                    "text/plain",
                )
                .map_err(|e| StorageError::Platform(e.to_string()))?;
            Ok(())
        })
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        debug!(service = %self.service_name, key = %key, "reading keyring entry");

        self.with_collection(|collection| {
            let items = collection
                .search_items(self.attributes(key))
                .map_err(|e| StorageError::Platform(e.to_string()))?;
            let Some(item) = items.first() else {
                return Ok(None);
            };

            let secret = item
                .get_secret()
                .map_err(|e| StorageError::Platform(e.to_string()))?;
            let value =
                String::from_utf8(secret).map_err(|e| StorageError::Encoding(e.to_string()))?;
            Ok(Some(value))
        })
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(service = %self.service_name, key = %key, "deleting keyring entry");

        self.with_collection(|collection| {
            let items = collection
                .search_items(self.attributes(key))
                .map_err(|e| StorageError::Platform(e.to_string()))?;
            let Some(item) = items.first() else {
                return Ok(false);
            };

            item.delete()
                .map_err(|e| StorageError::Platform(e.to_string()))?;
            Ok(true)
        })
    }
}
