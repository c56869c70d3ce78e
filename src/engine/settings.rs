use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::semantic::SemanticType;
use crate::ops::property_map::PropertyMap;
use crate::ops::tag_colors::TagColors;

/// Error type for settings persistence
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything the engine persists, loaded and saved as one object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub map: PropertyMap,
    #[serde(default, rename = "tagColors")]
    pub tag_colors: TagColors,
}

/// Where settings go after each mutation
pub trait SettingsSink {
    fn save(&mut self, settings: &Settings) -> Result<(), SettingsError>;
}

/// In-memory sink. Clones share the stored copy and save counter.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    stored: Rc<RefCell<Option<Settings>>>,
    saves: Rc<Cell<usize>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(&self) -> Option<Settings> {
        self.stored.borrow().clone()
    }

    pub fn saves(&self) -> usize {
        self.saves.get()
    }
}

impl SettingsSink for MemorySink {
    fn save(&mut self, settings: &Settings) -> Result<(), SettingsError> {
        *self.stored.borrow_mut() = Some(settings.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

/// Settings plus the sink they are written through.
///
/// Every mutating call that changes something saves before returning.
/// A failed save is logged and the in-memory state is kept.
pub struct PersistedSettings {
    settings: Settings,
    sink: Box<dyn SettingsSink>,
}

impl PersistedSettings {
    pub fn new(settings: Settings, sink: Box<dyn SettingsSink>) -> Self {
        PersistedSettings { settings, sink }
    }

    pub fn in_memory() -> Self {
        Self::new(Settings::default(), Box::new(MemorySink::new()))
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn map(&self) -> &PropertyMap {
        &self.settings.map
    }

    pub fn tag_colors(&self) -> &TagColors {
        &self.settings.tag_colors
    }

    pub fn set_mapping(&mut self, key: &str, ty: SemanticType) -> bool {
        self.update_map(|map| map.set(key, ty))
    }

    pub fn remove_mapping(&mut self, key: &str) -> bool {
        self.update_map(|map| map.remove(key).is_some())
    }

    /// Batch map edit; `edit` reports whether it changed anything
    pub fn update_map<F>(&mut self, edit: F) -> bool
    where
        F: FnOnce(&mut PropertyMap) -> bool,
    {
        let changed = edit(&mut self.settings.map);
        if changed {
            self.persist();
        }
        changed
    }

    pub fn set_tag_color(&mut self, tag: &str, color: &str) -> bool {
        let changed = self.settings.tag_colors.set(tag, color);
        if changed {
            self.persist();
        }
        changed
    }

    pub fn persist(&mut self) {
        if let Err(e) = self.sink.save(&self.settings) {
            warn!(error = %e, "could not save settings");
        }
    }
}
