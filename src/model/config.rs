use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration from `.vaultprops/config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default)]
    pub triggers: TriggerConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub tags: TagConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
}

/// First-line markers that apply a template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default = "default_child_trigger")]
    pub child: String,
    #[serde(default = "default_parent_trigger")]
    pub parent: String,
    /// Role taken from the filename
    #[serde(default = "default_auto_trigger")]
    pub auto: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        TriggerConfig {
            child: default_child_trigger(),
            parent: default_parent_trigger(),
            auto: default_auto_trigger(),
        }
    }
}

fn default_child_trigger() -> String {
    "--ccprop".to_string()
}

fn default_parent_trigger() -> String {
    "--pcprop".to_string()
}

fn default_auto_trigger() -> String {
    "--cprop".to_string()
}

/// Coalescing windows, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_metadata_repaint_ms")]
    pub metadata_repaint_ms: u64,
    #[serde(default = "default_command_repaint_ms")]
    pub command_repaint_ms: u64,
    #[serde(default = "default_template_repaint_ms")]
    pub template_repaint_ms: u64,
    #[serde(default = "default_rename_template_ms")]
    pub rename_template_ms: u64,
    #[serde(default = "default_last_update_debounce_ms")]
    pub last_update_debounce_ms: u64,
    #[serde(default = "default_startup_normalize_ms")]
    pub startup_normalize_ms: u64,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

impl TimingConfig {
    pub fn metadata_repaint(&self) -> Duration {
        Duration::from_millis(self.metadata_repaint_ms)
    }

    pub fn command_repaint(&self) -> Duration {
        Duration::from_millis(self.command_repaint_ms)
    }

    pub fn template_repaint(&self) -> Duration {
        Duration::from_millis(self.template_repaint_ms)
    }

    pub fn rename_template(&self) -> Duration {
        Duration::from_millis(self.rename_template_ms)
    }

    pub fn last_update_debounce(&self) -> Duration {
        Duration::from_millis(self.last_update_debounce_ms)
    }

    pub fn startup_normalize(&self) -> Duration {
        Duration::from_millis(self.startup_normalize_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            metadata_repaint_ms: default_metadata_repaint_ms(),
            command_repaint_ms: default_command_repaint_ms(),
            template_repaint_ms: default_template_repaint_ms(),
            rename_template_ms: default_rename_template_ms(),
            last_update_debounce_ms: default_last_update_debounce_ms(),
            startup_normalize_ms: default_startup_normalize_ms(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

fn default_metadata_repaint_ms() -> u64 {
    50
}

fn default_command_repaint_ms() -> u64 {
    100
}

fn default_template_repaint_ms() -> u64 {
    200
}

fn default_rename_template_ms() -> u64 {
    200
}

fn default_last_update_debounce_ms() -> u64 {
    1000
}

fn default_startup_normalize_ms() -> u64 {
    1000
}

fn default_refresh_interval_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagConfig {
    /// Chip color for tags without an assigned color
    #[serde(default = "default_tag_color")]
    pub default_color: String,
    /// Colors offered by the recolor menu
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
}

impl Default for TagConfig {
    fn default() -> Self {
        TagConfig {
            default_color: default_tag_color(),
            palette: default_palette(),
        }
    }
}

fn default_tag_color() -> String {
    "#4a90e2".to_string()
}

fn default_palette() -> Vec<String> {
    [
        "#4a90e2", "#f39c12", "#e74c3c", "#2ecc71", "#9b59b6", "#1abc9c", "#e67e22", "#f1c40f",
        "#e91e63",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Rewrite every hierarchy-coded note into template shape at startup.
    /// Destructive: keys outside the template are dropped.
    #[serde(default)]
    pub on_startup: bool,
}
