//! macOS Keychain keyring backend.

use crate::{SecureStorage, StorageError, StorageResult};
use security_framework::item::{ItemClass, ItemSearchOptions, Limit, SearchResult};
use security_framework::passwords::{delete_generic_password, set_generic_password};
use tracing::debug;

/// Keychain based storage for macOS.
pub struct KeychainStorage {
    service_name: String,
}

impl KeychainStorage {
    pub fn new(service_name: &str) -> StorageResult<Self> {
        Ok(Self {
            service_name: service_name.to_string(),
        })
    }

    fn search(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let mut search = ItemSearchOptions::new();
        search
            .class(ItemClass::generic_password())
            .service(&self.service_name)
            .account(key)
            .limit(Limit::Max(1))
            .load_data(true);

        match search.search() {
            Ok(results) => {
                if let Some(SearchResult::Data(data)) = results.into_iter().next() {
                    Ok(Some(data))
                } else {
                    Ok(None)
                }
            }
            Err(e) if is_not_found(&e.to_string()) => Ok(None),
            Err(e) => Err(StorageError::Platform(format!(
                "keychain lookup failed: {}",
                e
            ))),
        }
    }
}

/// Keychain "item not found" errors come in several textual forms.
fn is_not_found(error: &str) -> bool {
    let lowered = error.to_lowercase();
    lowered.contains("not found")
        || lowered.contains("could not be found")
        || lowered.contains("-25300")
}

impl SecureStorage for KeychainStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(service = %self.service_name, key = %key, "setting keychain item");

        // replace any existing item
        let _ = delete_generic_password(&self.service_name, key);
        set_generic_password(&self.service_name, key, value.as_bytes())
            .map_err(|e| StorageError::Platform(format!("keychain write failed: {}", e)))?;
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        debug!(service = %self.service_name, key = %key, "reading keychain item");

        match self.search(key)? {
            Some(data) => {
                let value =
                    String::from_utf8(data).map_err(|e| StorageError::Encoding(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(service = %self.service_name, key = %key, "deleting keychain item");

        match delete_generic_password(&self.service_name, key) {
            Ok(()) => Ok(true),
            Err(e) if is_not_found(&e.to_string()) => Ok(false),
            Err(e) => Err(StorageError::Platform(format!(
                "keychain delete failed: {}",
                e
            ))),
        }
    }
}
