//! Storage key constants.

/// Keyring entry names used by the device vault.
pub struct VaultKeys;

impl VaultKeys {
    /// Persisted session (JSON)
    pub const SESSION: &'static str = "session";

    /// Vault metadata (JSON: auth mode, username, saved-at)
    pub const META: &'static str = "vault_meta";

    /// Salted digest of the session PIN
    pub const PIN_DIGEST: &'static str = "pin_digest";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_distinct_and_non_empty() {
        let keys = [VaultKeys::SESSION, VaultKeys::META, VaultKeys::PIN_DIGEST];
        for key in keys {
            assert!(!key.is_empty());
        }
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }
}
