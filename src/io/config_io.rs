use std::fs;
use std::path::{Path, PathBuf};

use crate::io::vault::STATE_DIR;
use crate::model::config::VaultConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    Parse(#[from] toml::de::Error),
}

/// `<vault>/.vaultprops/config.toml`
pub fn config_path(vault_root: &Path) -> PathBuf {
    vault_root.join(STATE_DIR).join("config.toml")
}

/// Read the vault config. A missing file gives the defaults.
pub fn read_config(vault_root: &Path) -> Result<VaultConfig, ConfigError> {
    let path = config_path(vault_root);
    if !path.exists() {
        return Ok(VaultConfig::default());
    }
    let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    Ok(toml::from_str(&text)?)
}
