//! In-memory host: a note store and a recording view. Used by the CLI for
//! one-shot repaints and by tests that drive the engine directly.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::host::{DocumentStore, Menu, Prompt, PropertyView, Rendering, StoreError, ViewRow};
use crate::model::note::NotePath;

#[derive(Debug, Clone, Default)]
pub struct MemoryVault {
    notes: BTreeMap<NotePath, String>,
    writes: usize,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert for test setup
    pub fn with(mut self, note: &str, text: &str) -> Self {
        self.insert(note, text);
        self
    }

    /// Set a note's text without counting a write
    pub fn insert(&mut self, note: &str, text: &str) {
        self.notes.insert(NotePath::new(note), text.to_string());
    }

    pub fn remove(&mut self, note: &NotePath) -> Option<String> {
        self.notes.remove(note)
    }

    /// Move a note's text to a new path. Returns `false` if `from` is missing.
    pub fn rename(&mut self, from: &NotePath, to: &NotePath) -> bool {
        match self.notes.remove(from) {
            Some(text) => {
                self.notes.insert(to.clone(), text);
                true
            }
            None => false,
        }
    }

    pub fn text(&self, note: &str) -> Option<&str> {
        self.notes.get(&NotePath::new(note)).map(String::as_str)
    }

    /// Number of `write` calls since creation
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn snapshot(&self) -> BTreeMap<NotePath, String> {
        self.notes.clone()
    }
}

impl DocumentStore for MemoryVault {
    fn list(&self) -> Result<Vec<NotePath>, StoreError> {
        Ok(self.notes.keys().filter(|n| n.is_markdown()).cloned().collect())
    }

    fn exists(&self, note: &NotePath) -> bool {
        self.notes.contains_key(note)
    }

    fn read(&self, note: &NotePath) -> Result<String, StoreError> {
        self.notes
            .get(note)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(note.clone()))
    }

    fn write(&mut self, note: &NotePath, text: &str) -> Result<(), StoreError> {
        self.notes.insert(note.clone(), text.to_string());
        self.writes += 1;
        Ok(())
    }
}

/// A view that records everything the engine asks it to show
#[derive(Debug, Clone, Default)]
pub struct MemoryView {
    rows: Vec<ViewRow>,
    rendered: IndexMap<String, Rendering>,
    renders: usize,
    pub menus: Vec<Menu>,
    pub prompts: Vec<Prompt>,
    pub opened: Vec<NotePath>,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the displayed rows, dropping drafts and stale renderings
    pub fn set_keys<I, K>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.rows = keys.into_iter().map(ViewRow::new).collect();
        let keys: Vec<&str> = self.rows.iter().map(|r| r.key.as_str()).collect();
        self.rendered.retain(|k, _| keys.contains(&k.as_str()));
    }

    /// Type into a row's tag entry without committing
    pub fn set_draft(&mut self, key: &str, draft: &str) {
        if let Some(row) = self.rows.iter_mut().find(|r| r.key == key) {
            row.draft = draft.to_string();
        }
    }

    pub fn rendering(&self, key: &str) -> Option<&Rendering> {
        self.rendered.get(key)
    }

    /// Latest rendering per key, in first-render order
    pub fn renderings(&self) -> impl Iterator<Item = (&str, &Rendering)> {
        self.rendered.iter().map(|(k, r)| (k.as_str(), r))
    }

    /// Total `render_row` calls
    pub fn render_count(&self) -> usize {
        self.renders
    }
}

impl PropertyView for MemoryView {
    fn rows(&self) -> Vec<ViewRow> {
        self.rows.clone()
    }

    fn render_row(&mut self, key: &str, rendering: &Rendering) {
        self.rendered.insert(key.to_string(), rendering.clone());
        self.renders += 1;
    }

    fn show_menu(&mut self, menu: Menu) {
        self.menus.push(menu);
    }

    fn show_prompt(&mut self, prompt: Prompt) {
        self.prompts.push(prompt);
    }

    fn open_note(&mut self, note: &NotePath) {
        self.opened.push(note.clone());
    }
}
