//! File system paths for the client.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Simulated vault blob filename under the base directory.
const SIM_VAULT_NAME: &str = "vault.bin";
/// Simulated vault metadata filename under the base directory.
const SIM_VAULT_META_NAME: &str = "vault-meta.json";

/// Manages file system paths for the client.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for client runtime files (~/.tea-taster)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.tea-taster`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(".tea-taster"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.tea-taster).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.tea-taster/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the simulated vault blob path (~/.tea-taster/vault.bin).
    pub fn sim_vault_file(&self) -> PathBuf {
        self.base_dir.join(SIM_VAULT_NAME)
    }

    /// Get the simulated vault metadata path (~/.tea-taster/vault-meta.json).
    pub fn sim_vault_meta_file(&self) -> PathBuf {
        self.base_dir.join(SIM_VAULT_META_NAME)
    }

    /// Ensure the base directory exists.
    pub fn ensure_base_dir(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        Ok(())
    }
}
