use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::engine::settings::{Settings, SettingsError, SettingsSink};
use crate::io::vault::{STATE_DIR, atomic_write};

/// `<vault>/.vaultprops/settings.json`
pub fn settings_path(vault_root: &Path) -> PathBuf {
    vault_root.join(STATE_DIR).join("settings.json")
}

/// Read settings from `path`.
/// A missing file gives empty settings. A corrupt file is backed up as
/// `.bak` and empty settings are returned.
pub fn read_settings_from(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read settings");
            return Settings::default();
        }
    };
    match serde_json::from_str::<Settings>(&content) {
        Ok(settings) => settings,
        Err(e) => {
            let bak = path.with_extension("json.bak");
            let _ = fs::copy(path, &bak);
            warn!(
                path = %path.display(),
                backup = %bak.display(),
                error = %e,
                "could not parse settings, starting empty"
            );
            Settings::default()
        }
    }
}

/// Writes settings as pretty JSON, atomically
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSink { path: path.into() }
    }

    pub fn for_vault(vault_root: &Path) -> Self {
        Self::new(settings_path(vault_root))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsSink for FileSink {
    fn save(&mut self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut json = serde_json::to_string_pretty(settings)?;
        json.push('\n');
        atomic_write(&self.path, json.as_bytes())?;
        Ok(())
    }
}
