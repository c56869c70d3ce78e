use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Tag → chip color, shared by every note in the vault
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagColors(IndexMap<String, String>);

impl TagColors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.0.get(tag).map(|c| c.as_str())
    }

    /// Assigned color, or `default` for tags never recolored
    pub fn color_of<'a>(&'a self, tag: &str, default: &'a str) -> &'a str {
        self.get(tag).unwrap_or(default)
    }

    /// Returns whether the registry changed
    pub fn set(&mut self, tag: &str, color: &str) -> bool {
        if self.get(tag) == Some(color) {
            return false;
        }
        self.0.insert(tag.to_string(), color.to_string());
        true
    }

    pub fn remove(&mut self, tag: &str) -> Option<String> {
        self.0.shift_remove(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(t, c)| (t.as_str(), c.as_str()))
    }
}
