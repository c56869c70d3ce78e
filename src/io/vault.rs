use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::host::{DocumentStore, StoreError};
use crate::model::note::NotePath;

/// Directory holding this tool's config and settings inside a vault
pub const STATE_DIR: &str = ".vaultprops";

/// Editor directory that also marks a vault root
pub const EDITOR_DIR: &str = ".obsidian";

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("not a vault: no {STATE_DIR}/ or {EDITOR_DIR}/ directory found")]
    NotAVault,
}

/// Walk up from `start` to the first directory containing `.vaultprops/`
/// or `.obsidian/`.
pub fn discover_vault(start: &Path) -> Result<PathBuf, VaultError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(STATE_DIR).is_dir() || current.join(EDITOR_DIR).is_dir() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(VaultError::NotAVault);
        }
    }
}

/// Write a file atomically via a temp file in the same directory.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Notes stored as files under a vault root
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        FsVault { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, note: &NotePath) -> PathBuf {
        self.root.join(note.as_str())
    }

    /// Vault-relative note path for a file under the root. `None` outside
    /// the vault, in hidden directories, or for non-markdown files.
    pub fn note_for(&self, path: &Path) -> Option<NotePath> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let mut parts = Vec::new();
        for component in rel.components() {
            let part = component.as_os_str().to_str()?;
            if part.starts_with('.') {
                return None;
            }
            parts.push(part);
        }
        let note = NotePath::new(parts.join("/"));
        note.is_markdown().then_some(note)
    }

    fn collect(&self, dir: &Path, out: &mut Vec<NotePath>) -> Result<(), StoreError> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_none_or(|n| n.starts_with('.'));
            if hidden {
                continue;
            }
            if path.is_dir() {
                self.collect(&path, out)?;
            } else if let Some(note) = self.note_for(&path) {
                out.push(note);
            }
        }
        Ok(())
    }
}

impl DocumentStore for FsVault {
    fn list(&self) -> Result<Vec<NotePath>, StoreError> {
        let mut notes = Vec::new();
        self.collect(&self.root, &mut notes)?;
        notes.sort();
        Ok(notes)
    }

    fn exists(&self, note: &NotePath) -> bool {
        self.path_of(note).is_file()
    }

    fn read(&self, note: &NotePath) -> Result<String, StoreError> {
        let path = self.path_of(note);
        fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(note.clone()),
            _ => StoreError::Read {
                path: note.clone(),
                source,
            },
        })
    }

    fn write(&mut self, note: &NotePath, text: &str) -> Result<(), StoreError> {
        atomic_write(&self.path_of(note), text.as_bytes()).map_err(|source| StoreError::Write {
            path: note.clone(),
            source,
        })
    }
}
