use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::note::FrontMatter;
use crate::model::semantic::SemanticType;

/// Which metadata keys behave as which semantic type.
///
/// One map for the whole vault, not per note. Insertion order is kept so
/// reconciliation visits orphans deterministically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyMap(IndexMap<String, SemanticType>);

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<SemanticType> {
        self.0.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Map `key` to `ty`. Returns whether the map changed.
    pub fn set(&mut self, key: &str, ty: SemanticType) -> bool {
        if self.get(key) == Some(ty) {
            return false;
        }
        self.0.insert(key.to_string(), ty);
        true
    }

    pub fn remove(&mut self, key: &str) -> Option<SemanticType> {
        self.0.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SemanticType)> {
        self.0.iter().map(|(k, t)| (k.as_str(), *t))
    }

    /// Keys mapped to `ty`, in map order
    pub fn keys_of(&self, ty: SemanticType) -> impl Iterator<Item = &str> {
        self.iter().filter(move |(_, t)| *t == ty).map(|(k, _)| k)
    }

    /// Mapped keys absent from `fm`, in map order
    pub fn orphans(&self, fm: &FrontMatter) -> Vec<(String, SemanticType)> {
        self.iter()
            .filter(|(k, _)| !fm.contains_key(*k))
            .map(|(k, t)| (k.to_string(), t))
            .collect()
    }

    /// Keys of `fm` with no mapping, in front matter order
    pub fn unmapped<'a>(&self, fm: &'a FrontMatter) -> Vec<&'a str> {
        fm.keys()
            .map(|k| k.as_str())
            .filter(|k| !self.contains(k))
            .collect()
    }
}
