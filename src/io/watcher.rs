use std::path::Path;
use std::sync::mpsc;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::io::vault::FsVault;
use crate::model::note::NotePath;

/// Note-level changes seen on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
    /// Created or written
    Modified(NotePath),
    Renamed { from: NotePath, to: NotePath },
    Removed(NotePath),
}

/// Translate one notify event into note events. Paths outside the vault,
/// in hidden directories, or not ending in `.md` are dropped.
pub fn classify(vault: &FsVault, event: &Event) -> Vec<VaultEvent> {
    let note = |i: usize| event.paths.get(i).and_then(|p| vault.note_for(p));
    match event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match (note(0), note(1)) {
            (Some(from), Some(to)) => vec![VaultEvent::Renamed { from, to }],
            (Some(from), None) => vec![VaultEvent::Removed(from)],
            (None, Some(to)) => vec![VaultEvent::Modified(to)],
            (None, None) => Vec::new(),
        },
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) | EventKind::Remove(_) => event
            .paths
            .iter()
            .filter_map(|p| vault.note_for(p))
            .map(VaultEvent::Removed)
            .collect(),
        EventKind::Create(_) | EventKind::Modify(_) => event
            .paths
            .iter()
            .filter_map(|p| vault.note_for(p))
            .map(VaultEvent::Modified)
            .collect(),
        _ => Vec::new(),
    }
}

/// Recursive watcher over a vault root
pub struct VaultWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<VaultEvent>,
}

impl VaultWatcher {
    /// Start watching. Call `poll` or `wait` from the host loop.
    pub fn start(root: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let vault = FsVault::open(root);

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let Ok(event) = result else {
                    return;
                };
                for change in classify(&vault, &event) {
                    let _ = tx.send(change);
                }
            },
            Config::default(),
        )?;

        watcher.watch(root, RecursiveMode::Recursive)?;
        Ok(VaultWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Non-blocking poll for queued events
    pub fn poll(&self) -> Vec<VaultEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.rx.try_recv() {
            events.push(evt);
        }
        events
    }

    /// Block up to `timeout` for the first event, then drain the rest
    pub fn wait(&self, timeout: std::time::Duration) -> Vec<VaultEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(first) => {
                let mut events = vec![first];
                events.extend(self.poll());
                events
            }
            Err(_) => Vec::new(),
        }
    }
}
