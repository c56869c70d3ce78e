//! Seams between the engine and whatever hosts it: a store of note text and
//! a view that shows metadata rows and takes clicks.

use serde::Serialize;

use crate::model::note::{FrontMatter, NotePath};
use crate::model::semantic::{SemanticType, StatusGlyph};
use crate::model::version::{Direction, Segment};
use crate::parse::front_matter;

/// Error type for document store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("note not found: {0}")]
    NotFound(NotePath),
    #[error("could not read {path}: {source}")]
    Read {
        path: NotePath,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: NotePath,
        source: std::io::Error,
    },
    #[error("malformed front matter in {path}: {source}")]
    MalformedFrontMatter {
        path: NotePath,
        source: serde_yaml::Error,
    },
    #[error("could not encode front matter for {path}: {source}")]
    Encode {
        path: NotePath,
        source: serde_yaml::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Document store
// ---------------------------------------------------------------------------

/// Read/write access to the notes of one vault
pub trait DocumentStore {
    /// Every markdown note in the vault
    fn list(&self) -> Result<Vec<NotePath>, StoreError>;

    fn exists(&self, note: &NotePath) -> bool;

    fn read(&self, note: &NotePath) -> Result<String, StoreError>;

    fn write(&mut self, note: &NotePath, text: &str) -> Result<(), StoreError>;

    /// Parsed metadata block. `Ok(None)` when the note has none.
    fn front_matter(&self, note: &NotePath) -> Result<Option<FrontMatter>, StoreError> {
        let text = self.read(note)?;
        front_matter::parse_front_matter(&text).map_err(|source| {
            StoreError::MalformedFrontMatter {
                path: note.clone(),
                source,
            }
        })
    }

    /// Read-modify-write of a note's metadata. The body is kept as is.
    ///
    /// Returns `false` without writing when `edit` leaves keys, order and
    /// values untouched.
    fn update_front_matter<F>(&mut self, note: &NotePath, edit: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut FrontMatter),
    {
        let text = self.read(note)?;
        let parts = front_matter::split(&text);
        let before = match parts.yaml {
            Some(yaml) => front_matter::parse_yaml(yaml).map_err(|source| {
                StoreError::MalformedFrontMatter {
                    path: note.clone(),
                    source,
                }
            })?,
            None => FrontMatter::new(),
        };

        let mut fm = before.clone();
        edit(&mut fm);
        if fm.iter().eq(before.iter()) {
            return Ok(false);
        }

        let rendered =
            front_matter::render_note(&fm, parts.body).map_err(|source| StoreError::Encode {
                path: note.clone(),
                source,
            })?;
        self.write(note, &rendered)?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// Screen position a menu or prompt is attached to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Anchor {
    pub x: i32,
    pub y: i32,
}

/// A metadata row as currently shown by the view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRow {
    pub key: String,
    /// Text typed into the row's tag entry and not yet committed
    pub draft: String,
}

impl ViewRow {
    pub fn new(key: impl Into<String>) -> Self {
        ViewRow {
            key: key.into(),
            draft: String::new(),
        }
    }

    pub fn has_uncommitted_input(&self) -> bool {
        !self.draft.trim().is_empty()
    }
}

/// Something the user can trigger from a rendered row or menu.
/// Keys refer to rows of the active note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    OpenTypeMenu { key: String },
    ConvertRow { key: String, ty: SemanticType },
    OpenStatusMenu { key: String },
    SetStatus { key: String, status: StatusGlyph },
    BumpVersion {
        key: String,
        segment: Segment,
        direction: Direction,
    },
    ToggleVersionLock { key: String },
    OpenAuthorPicker { key: String },
    SetAuthor { key: String, author: String },
    PromptNewAuthor { key: String },
    OpenTagColorMenu { tag: String },
    SetTagColor { tag: String, color: String },
    RemoveTag { key: String, tag: String },
    PromptAddTag { key: String },
    AddTag { key: String, tag: String },
    OpenNote { note: NotePath },
    ToggleLinks { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub label: String,
    pub action: Action,
    pub checked: bool,
}

impl MenuItem {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        MenuItem {
            label: label.into(),
            action,
            checked: false,
        }
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }
}

/// A contextual choice list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Menu {
    pub anchor: Anchor,
    pub items: Vec<MenuItem>,
}

/// What a text prompt is for; echoed back through `Engine::submit_prompt`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromptKind {
    NewAuthor { key: String },
    NewTag { key: String },
}

/// A small modal with one text field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub kind: PromptKind,
    pub title: String,
    /// Existing values the user can pick instead of typing
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub label: String,
    pub note: NotePath,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagChip {
    pub tag: String,
    pub color: String,
}

/// How one row should look after a repaint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rendering {
    /// Derived value, not editable (id, type, category)
    Derived { value: String },
    Links {
        links: Vec<Link>,
        /// Links beyond the first three while collapsed
        hidden: usize,
        expanded: bool,
    },
    Tags { chips: Vec<TagChip> },
    Author { value: String },
    Version { value: String, locked: bool },
    LastUpdate { value: String },
    Status {
        status: Option<StatusGlyph>,
        raw: String,
    },
}

/// The UI collaborator
pub trait PropertyView {
    /// Rows currently shown for the active note, in display order
    fn rows(&self) -> Vec<ViewRow>;

    fn render_row(&mut self, key: &str, rendering: &Rendering);

    fn show_menu(&mut self, menu: Menu);

    fn show_prompt(&mut self, prompt: Prompt);

    fn open_note(&mut self, note: &NotePath);
}
