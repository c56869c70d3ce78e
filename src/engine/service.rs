use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use serde_yaml::Value;
use tracing::{debug, info, warn};

use crate::engine::scheduler::{Clock, Scheduler, Task};
use crate::engine::settings::PersistedSettings;
use crate::host::{
    Action, Anchor, DocumentStore, Menu, MenuItem, Prompt, PromptKind, PropertyView, StoreError,
    ViewRow,
};
use crate::model::config::VaultConfig;
use crate::model::hierarchy::Role;
use crate::model::note::{
    FrontMatter, NotePath, list_value, string_value, unique_key, value_list, value_text,
};
use crate::model::semantic::{SemanticType, StatusGlyph};
use crate::model::version;
use crate::ops::property_map::PropertyMap;
use crate::ops::reconcile::{self, ReconcileOutcome};
use crate::ops::render::{self, RenderContext, RowState};
use crate::ops::{template, types};
use crate::parse::front_matter;

/// Error type for explicit engine operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no active note")]
    NoActiveNote,
    #[error("{note} has no property '{key}'")]
    MissingKey { note: NotePath, key: String },
}

/// Whether bulk normalization may write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirm {
    DryRun,
    Apply,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedNote {
    pub note: NotePath,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    /// Hierarchy-coded notes with a metadata block
    pub examined: usize,
    /// Notes rewritten, or that would be on a dry run
    pub rewritten: Vec<NotePath>,
    pub skipped: Vec<SkippedNote>,
    pub applied: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoActiveNote,
    UncommittedInput,
    MissingNote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RepaintOutcome {
    Skipped { reason: SkipReason },
    Painted {
        rows: usize,
        wrote: bool,
        reconciled: ReconcileOutcome,
    },
}

type RowId = (NotePath, String);

/// Engine-owned state keyed by note path and key. Nothing here is persisted.
#[derive(Debug, Default)]
struct SideTable {
    /// Rows rendered since the last full refresh
    painted: HashSet<RowId>,
    expanded: HashSet<RowId>,
    locked: HashSet<RowId>,
    /// Notes whose `last update` is stamped on the next repaint
    touch_pending: HashSet<NotePath>,
}

impl SideTable {
    fn row_state(&self, id: &RowId) -> RowState {
        RowState {
            version_locked: self.locked.contains(id),
            links_expanded: self.expanded.contains(id),
        }
    }

    fn rename_note(&mut self, old: &NotePath, new: &NotePath) {
        for set in [&mut self.painted, &mut self.expanded, &mut self.locked] {
            let moved: Vec<RowId> = set.iter().filter(|(n, _)| n == old).cloned().collect();
            for id in moved {
                set.remove(&id);
                set.insert((new.clone(), id.1));
            }
        }
        if self.touch_pending.remove(old) {
            self.touch_pending.insert(new.clone());
        }
    }
}

/// Whether any rendered tag entry holds text the user has not committed
fn input_pending(rows: &[ViewRow]) -> bool {
    rows.iter().any(ViewRow::has_uncommitted_input)
}

fn toggle(set: &mut HashSet<RowId>, id: RowId) -> bool {
    if set.remove(&id) {
        false
    } else {
        set.insert(id);
        true
    }
}

/// The property engine for one vault.
///
/// Runs on a single thread. Host notifications either act at once or
/// schedule a coalesced task; the host drives delayed work with `tick`.
pub struct Engine<S: DocumentStore, V: PropertyView> {
    store: S,
    view: V,
    settings: PersistedSettings,
    config: VaultConfig,
    clock: Box<dyn Clock>,
    scheduler: Scheduler,
    active: Option<NotePath>,
    side: SideTable,
}

impl<S: DocumentStore, V: PropertyView> Engine<S, V> {
    pub fn new(
        store: S,
        view: V,
        settings: PersistedSettings,
        config: VaultConfig,
        clock: Box<dyn Clock>,
    ) -> Self {
        Engine {
            store,
            view,
            settings,
            config,
            clock,
            scheduler: Scheduler::new(),
            active: None,
            side: SideTable::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn settings(&self) -> &PersistedSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut PersistedSettings {
        &mut self.settings
    }

    pub fn map(&self) -> &PropertyMap {
        self.settings.map()
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn active_note(&self) -> Option<&NotePath> {
        self.active.as_ref()
    }

    pub fn is_version_locked(&self, note: &NotePath, key: &str) -> bool {
        self.side.locked.contains(&(note.clone(), key.to_string()))
    }

    pub fn is_painted(&self, note: &NotePath, key: &str) -> bool {
        self.side.painted.contains(&(note.clone(), key.to_string()))
    }

    /// Time until the earliest pending task, zero if one is already due
    pub fn next_wakeup(&self) -> Option<Duration> {
        self.scheduler
            .next_due()
            .map(|at| at.saturating_sub(self.clock.now()))
    }

    fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn after(&mut self, task: Task, delay: Duration) {
        let at = self.clock.now() + delay;
        if self.scheduler.schedule(task.clone(), at) {
            debug!(?task, "rescheduled");
        }
    }

    fn require_active(&self) -> Result<NotePath, EngineError> {
        self.active.clone().ok_or(EngineError::NoActiveNote)
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    /// Schedule the periodic refresh, and startup normalization when enabled
    pub fn start(&mut self) {
        self.after(Task::PeriodicRefresh, self.config.timing.refresh_interval());
        if self.config.normalize.on_startup {
            self.after(Task::BulkNormalize, self.config.timing.startup_normalize());
        }
    }

    pub fn on_active_note_changed(&mut self, note: Option<NotePath>) {
        if let Err(e) = self.activate(note) {
            warn!(error = %e, "repaint failed");
        }
    }

    /// Switch the active note and repaint it at once
    pub fn activate(&mut self, note: Option<NotePath>) -> Result<RepaintOutcome, EngineError> {
        self.active = note;
        self.repaint()
    }

    pub fn on_layout_changed(&mut self) {
        self.repaint_logged();
    }

    pub fn on_metadata_changed(&mut self, note: &NotePath) {
        if self.active.as_ref() == Some(note) {
            self.after(Task::Repaint, self.config.timing.metadata_repaint());
        }
    }

    /// A note's text changed. Applies a template when the body starts with
    /// a trigger marker.
    pub fn on_note_modified(&mut self, note: &NotePath) {
        if !note.is_markdown() {
            return;
        }
        if let Err(e) = self.check_trigger(note) {
            warn!(note = %note, error = %e, "trigger check failed");
        }
    }

    pub fn on_note_renamed(&mut self, old: &NotePath, new: &NotePath) {
        if !new.is_markdown() {
            return;
        }
        self.side.rename_note(old, new);
        if self.active.as_ref() == Some(old) {
            self.active = Some(new.clone());
        }
        for (from, to) in [
            (
                Task::TouchLastUpdate(old.clone()),
                Task::TouchLastUpdate(new.clone()),
            ),
            (
                Task::TemplateOnRename(old.clone()),
                Task::TemplateOnRename(new.clone()),
            ),
        ] {
            if let Some(at) = self.scheduler.deadline(&from) {
                self.scheduler.cancel(&from);
                self.scheduler.schedule(to, at);
            }
        }

        match (old.descriptor(), new.descriptor()) {
            (None, Some(_)) => {
                self.after(
                    Task::TemplateOnRename(new.clone()),
                    self.config.timing.rename_template(),
                );
            }
            (Some(before), Some(after)) if before.role() != after.role() => {
                if let Err(e) = self.rebuild_for_role(new, after.role()) {
                    warn!(note = %new, error = %e, "role rebuild failed");
                }
            }
            (Some(_), Some(_)) => {}
            _ => debug!(old = %old, new = %new, "rename outside the hierarchy"),
        }
    }

    /// A key was typed in a note body; `last update` follows after a quiet second
    pub fn on_body_keystroke(&mut self, note: &NotePath) {
        self.after(
            Task::TouchLastUpdate(note.clone()),
            self.config.timing.last_update_debounce(),
        );
    }

    /// Run every task due now. Returns how many ran.
    pub fn tick(&mut self) -> usize {
        let mut ran = 0;
        loop {
            let due = self.scheduler.take_due(self.clock.now());
            if due.is_empty() {
                return ran;
            }
            for task in due {
                debug!(?task, "running task");
                self.run_task(task);
                ran += 1;
            }
        }
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::Repaint => self.repaint_logged(),
            Task::TemplateOnRename(note) => {
                if let Err(e) = self.template_on_rename(&note) {
                    warn!(note = %note, error = %e, "template on rename failed");
                }
            }
            Task::TouchLastUpdate(note) => {
                if !self.store.exists(&note) {
                    debug!(note = %note, "stale last-update touch");
                } else if self.map().keys_of(SemanticType::LastUpdate).next().is_some() {
                    self.side.touch_pending.insert(note);
                    self.after(Task::Repaint, self.config.timing.command_repaint());
                }
            }
            Task::PeriodicRefresh => {
                self.side.painted.clear();
                self.after(Task::Repaint, self.config.timing.command_repaint());
                let every = self
                    .config
                    .timing
                    .refresh_interval()
                    .max(Duration::from_secs(1));
                self.after(Task::PeriodicRefresh, every);
            }
            Task::BulkNormalize => match self.bulk_normalize(Confirm::Apply) {
                Ok(report) => info!(
                    examined = report.examined,
                    rewritten = report.rewritten.len(),
                    "startup normalization done"
                ),
                Err(e) => warn!(error = %e, "startup normalization failed"),
            },
        }
    }

    // -----------------------------------------------------------------------
    // Repaint
    // -----------------------------------------------------------------------

    fn repaint_logged(&mut self) {
        if let Err(e) = self.repaint() {
            warn!(error = %e, "repaint failed");
        }
    }

    /// Reconcile the map against the active note, write back derived values
    /// and render every mapped row. Does nothing while any row holds
    /// uncommitted tag input.
    pub fn repaint(&mut self) -> Result<RepaintOutcome, EngineError> {
        let Some(note) = self.active.clone() else {
            return Ok(RepaintOutcome::Skipped {
                reason: SkipReason::NoActiveNote,
            });
        };
        let rows = self.view.rows();
        if input_pending(&rows) {
            debug!(note = %note, "repaint skipped: uncommitted tag input");
            return Ok(RepaintOutcome::Skipped {
                reason: SkipReason::UncommittedInput,
            });
        }
        if !self.store.exists(&note) {
            debug!(note = %note, "repaint skipped: active note is gone");
            return Ok(RepaintOutcome::Skipped {
                reason: SkipReason::MissingNote,
            });
        }

        let mut fm = self.store.front_matter(&note)?;
        let mut reconciled = ReconcileOutcome::default();
        // A note without a block says nothing about renamed keys
        if let Some(current) = &fm {
            let descriptor = note.descriptor();
            self.settings.update_map(|map| {
                reconciled = reconcile::reconcile_renames(map, current);
                let corrected = reconcile::correct_role_mappings(map, current, descriptor);
                reconciled.changed() || corrected
            });
            for r in &reconciled.reassigned {
                info!(note = %note, from = %r.from, to = %r.to, ty = %r.ty, "mapping follows renamed key");
            }
            for (key, ty) in &reconciled.dropped {
                debug!(note = %note, key = %key, ty = %ty, "dropped orphaned mapping");
            }
        }

        let wrote = self.write_back(&note, fm.as_ref())?;
        if wrote {
            fm = self.store.front_matter(&note)?;
        }
        let fm = fm.unwrap_or_default();
        let rows = self.paint_rows(&note, &rows, &fm, |_| true)?;
        Ok(RepaintOutcome::Painted {
            rows,
            wrote,
            reconciled,
        })
    }

    /// Render only rows not painted since the last refresh, e.g. rows the
    /// host just added. Returns how many were rendered; none while any row
    /// holds uncommitted tag input.
    pub fn paint_new_rows(&mut self) -> Result<usize, EngineError> {
        let note = self.require_active()?;
        let rows = self.view.rows();
        if input_pending(&rows) {
            debug!(note = %note, "new rows wait for uncommitted tag input");
            return Ok(0);
        }
        let fm = self.store.front_matter(&note)?.unwrap_or_default();
        let painted: Vec<String> = rows
            .iter()
            .filter(|r| self.is_painted(&note, &r.key))
            .map(|r| r.key.clone())
            .collect();
        self.paint_rows(&note, &rows, &fm, |key| !painted.iter().any(|k| k == key))
    }

    fn repaint_row(&mut self, key: &str) -> Result<(), EngineError> {
        let note = self.require_active()?;
        let rows = self.view.rows();
        if input_pending(&rows) {
            debug!(note = %note, key, "row repaint waits for uncommitted tag input");
            return Ok(());
        }
        let fm = self.store.front_matter(&note)?.unwrap_or_default();
        self.paint_rows(&note, &rows, &fm, |k| k == key)?;
        Ok(())
    }

    /// Stamp derived values (`id`, `type`, `category`) and a pending
    /// `last update` into the note. Returns whether the note was written.
    fn write_back(&mut self, note: &NotePath, fm: Option<&FrontMatter>) -> Result<bool, EngineError> {
        let Some(fm) = fm else {
            return Ok(false);
        };
        let touch = self.side.touch_pending.remove(note);
        let today = types::format_date(self.today());
        let mut edits: Vec<(String, String)> = Vec::new();
        for (key, value) in fm {
            let Some(ty) = self.map().get(key) else {
                continue;
            };
            let wanted = match ty {
                SemanticType::LastUpdate if touch => Some(today.clone()),
                _ => render::derived_value(ty, note),
            };
            if let Some(wanted) = wanted
                && value.as_str() != Some(wanted.as_str())
            {
                edits.push((key.clone(), wanted));
            }
        }
        if edits.is_empty() {
            return Ok(false);
        }
        let wrote = self.store.update_front_matter(note, |fm| {
            for (key, value) in edits {
                fm.insert(key, string_value(value));
            }
        })?;
        Ok(wrote)
    }

    fn paint_rows<F>(
        &mut self,
        note: &NotePath,
        rows: &[ViewRow],
        fm: &FrontMatter,
        wanted: F,
    ) -> Result<usize, EngineError>
    where
        F: Fn(&str) -> bool,
    {
        let needs_links = rows.iter().any(|r| {
            matches!(
                self.map().get(&r.key),
                Some(SemanticType::Parent | SemanticType::Child)
            )
        });
        let notes = if needs_links {
            self.store.list()?
        } else {
            Vec::new()
        };
        let ctx = RenderContext {
            note,
            notes: &notes,
            tag_colors: self.settings.tag_colors(),
            default_color: &self.config.tags.default_color,
        };

        let mut painted = 0;
        for row in rows.iter().filter(|r| wanted(&r.key)) {
            let Some(ty) = self.settings.map().get(&row.key) else {
                continue;
            };
            let id = (note.clone(), row.key.clone());
            self.side.painted.remove(&id);
            let rendering = render::render(ty, fm.get(&row.key), &ctx, self.side.row_state(&id));
            self.view.render_row(&row.key, &rendering);
            self.side.painted.insert(id);
            painted += 1;
        }
        Ok(painted)
    }

    // -----------------------------------------------------------------------
    // Templates
    // -----------------------------------------------------------------------

    fn trigger_role(&self, line: &str) -> Option<Option<Role>> {
        let triggers = &self.config.triggers;
        if line == triggers.child {
            Some(Some(Role::Child))
        } else if line == triggers.parent {
            Some(Some(Role::Parent))
        } else if line == triggers.auto {
            Some(None)
        } else {
            None
        }
    }

    fn check_trigger(&mut self, note: &NotePath) -> Result<bool, EngineError> {
        if !self.store.exists(note) {
            return Ok(false);
        }
        let text = self.store.read(note)?;
        let line = front_matter::first_line(front_matter::split(&text).body);
        match self.trigger_role(line) {
            Some(role) => self.apply_trigger(note, role),
            None => Ok(false),
        }
    }

    /// Write a fresh template block for `role`, or for the role in the
    /// filename when `role` is `None`. A leading trigger line is consumed.
    pub fn apply_trigger(&mut self, note: &NotePath, role: Option<Role>) -> Result<bool, EngineError> {
        let Some(role) = role.or_else(|| note.descriptor().map(|d| d.role())) else {
            debug!(note = %note, "not hierarchy-coded, no template");
            return Ok(false);
        };
        if !self.store.exists(note) {
            debug!(note = %note, "stale template request");
            return Ok(false);
        }
        let text = self.store.read(note)?;
        let body = front_matter::split(&text).body;
        let body = match self.trigger_role(front_matter::first_line(body)) {
            Some(_) => front_matter::drop_first_line(body),
            None => body,
        };

        let notes = self.store.list()?;
        let parents = render::parent_names(note, &notes);
        let fm = template::build(note, role, &parents, self.today());
        let rendered = front_matter::render_note(&fm, body).map_err(|source| StoreError::Encode {
            path: note.clone(),
            source,
        })?;
        self.store.write(note, &rendered)?;
        self.register_template(role);
        info!(note = %note, role = role.label(), "applied template");
        self.after(Task::Repaint, self.config.timing.template_repaint());
        Ok(true)
    }

    fn template_on_rename(&mut self, note: &NotePath) -> Result<bool, EngineError> {
        if !self.store.exists(note) {
            debug!(note = %note, "renamed note is gone");
            return Ok(false);
        }
        let text = self.store.read(note)?;
        if !text.trim().is_empty() && front_matter::split(&text).yaml.is_some() {
            return Ok(false);
        }
        self.apply_trigger(note, None)
    }

    fn register_template(&mut self, role: Role) {
        self.settings.update_map(|map| {
            template::template_for(role)
                .into_iter()
                .fold(false, |changed, ty| map.set(ty.canonical_key(), ty) || changed)
        });
    }

    fn rebuild_for_role(&mut self, note: &NotePath, role: Role) -> Result<bool, EngineError> {
        if !self.store.exists(note) {
            return Ok(false);
        }
        let Some(existing) = self.store.front_matter(note)? else {
            return Ok(false);
        };
        let rebuilt = template::rebuild_for_role(&existing, self.map(), note, role, self.today());
        let wrote = self.store.update_front_matter(note, |fm| *fm = rebuilt)?;

        // The slot the old role carried
        let stale = match role {
            Role::Parent => SemanticType::Parent,
            Role::Child => SemanticType::Child,
        };
        self.settings.update_map(|map| {
            let removed = map.remove(stale.canonical_key()).is_some();
            template::template_for(role)
                .into_iter()
                .fold(removed, |changed, ty| map.set(ty.canonical_key(), ty) || changed)
        });
        info!(note = %note, role = role.label(), "rebuilt metadata for new role");
        self.after(Task::Repaint, self.config.timing.command_repaint());
        Ok(wrote)
    }

    /// "Apply template to current note": add missing template keys to the
    /// active note. No-op for notes outside the hierarchy.
    pub fn apply_template_command(&mut self) -> Result<bool, EngineError> {
        let note = self.require_active()?;
        self.apply_template_to(&note)
    }

    pub fn apply_template_to(&mut self, note: &NotePath) -> Result<bool, EngineError> {
        let Some(descriptor) = note.descriptor() else {
            debug!(note = %note, "not hierarchy-coded, nothing to apply");
            return Ok(false);
        };
        if !self.store.exists(note) {
            return Err(StoreError::NotFound(note.clone()).into());
        }
        let role = descriptor.role();
        let notes = self.store.list()?;
        let parents = render::parent_names(note, &notes);
        let today = self.today();
        let wrote = self.store.update_front_matter(note, |fm| {
            template::fill_missing(fm, note, role, &parents, today);
        })?;
        self.register_template(role);
        self.after(Task::Repaint, self.config.timing.command_repaint());
        Ok(wrote)
    }

    /// Rewrite every hierarchy-coded note with a metadata block into its
    /// canonical shape. Keys outside the template are dropped, so nothing is
    /// written unless `confirm` is `Apply`.
    pub fn bulk_normalize(&mut self, confirm: Confirm) -> Result<NormalizeReport, EngineError> {
        let mut report = NormalizeReport {
            applied: confirm == Confirm::Apply,
            ..NormalizeReport::default()
        };
        let today = self.today();
        let mut roles = BTreeSet::new();

        for note in self.store.list()? {
            let Some(descriptor) = note.descriptor() else {
                continue;
            };
            let existing = match self.store.front_matter(&note) {
                Ok(Some(fm)) => fm,
                Ok(None) => continue,
                Err(e) => {
                    warn!(note = %note, error = %e, "skipping note");
                    report.skipped.push(SkippedNote {
                        note: note.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            report.examined += 1;
            let role = descriptor.role();
            let Some(rebuilt) = template::normalize(&existing, self.map(), &note, role, today)
            else {
                continue;
            };
            if confirm == Confirm::Apply {
                self.store.update_front_matter(&note, |fm| *fm = rebuilt)?;
                roles.insert(role);
            }
            report.rewritten.push(note);
        }

        for role in roles {
            self.register_template(role);
        }
        if report.applied && !report.rewritten.is_empty() {
            info!(rewritten = report.rewritten.len(), "normalized notes");
            self.after(Task::Repaint, self.config.timing.command_repaint());
        }
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Row interaction
    // -----------------------------------------------------------------------

    fn current_value(&self, note: &NotePath, key: &str) -> Result<Value, EngineError> {
        self.store
            .front_matter(note)?
            .and_then(|mut fm| fm.shift_remove(key))
            .ok_or_else(|| EngineError::MissingKey {
                note: note.clone(),
                key: key.to_string(),
            })
    }

    fn set_value(&mut self, key: &str, value: Value) -> Result<bool, EngineError> {
        let note = self.require_active()?;
        self.current_value(&note, key)?;
        let wrote = self.store.update_front_matter(&note, |fm| {
            fm.insert(key.to_string(), value);
        })?;
        if wrote {
            self.after(Task::Repaint, self.config.timing.command_repaint());
        }
        Ok(wrote)
    }

    /// Handle a click on a rendered row or menu item
    pub fn dispatch(&mut self, action: Action, anchor: Anchor) -> Result<(), EngineError> {
        match action {
            Action::OpenTypeMenu { key } => {
                let current = self.map().get(&key);
                let mut types = SemanticType::ALL.to_vec();
                types.sort_by_key(|t| t.label());
                let items = types
                    .into_iter()
                    .map(|ty| {
                        MenuItem::new(
                            ty.label(),
                            Action::ConvertRow {
                                key: key.clone(),
                                ty,
                            },
                        )
                        .checked(current == Some(ty))
                    })
                    .collect();
                self.view.show_menu(Menu { anchor, items });
            }
            Action::ConvertRow { key, ty } => {
                self.convert_row(&key, ty)?;
            }
            Action::OpenStatusMenu { key } => {
                let note = self.require_active()?;
                let current = value_text(&self.current_value(&note, &key)?)
                    .and_then(|s| StatusGlyph::normalize(&s));
                let items = StatusGlyph::ALL
                    .into_iter()
                    .map(|status| {
                        MenuItem::new(
                            format!("{} {}", status.glyph(), status.name()),
                            Action::SetStatus {
                                key: key.clone(),
                                status,
                            },
                        )
                        .checked(current == Some(status))
                    })
                    .collect();
                self.view.show_menu(Menu { anchor, items });
            }
            Action::SetStatus { key, status } => {
                self.set_value(&key, string_value(status.glyph()))?;
            }
            Action::BumpVersion {
                key,
                segment,
                direction,
            } => {
                self.bump_version(&key, segment, direction)?;
            }
            Action::ToggleVersionLock { key } => {
                let note = self.require_active()?;
                let locked = toggle(&mut self.side.locked, (note.clone(), key.clone()));
                debug!(note = %note, key = %key, locked, "version lock toggled");
                self.after(Task::Repaint, self.config.timing.metadata_repaint());
            }
            Action::OpenAuthorPicker { key } => {
                let note = self.require_active()?;
                let current = value_text(&self.current_value(&note, &key)?).unwrap_or_default();
                let mut items: Vec<MenuItem> = self
                    .authors()?
                    .into_iter()
                    .map(|author| {
                        let checked = author == current.trim();
                        MenuItem::new(
                            author.clone(),
                            Action::SetAuthor {
                                key: key.clone(),
                                author,
                            },
                        )
                        .checked(checked)
                    })
                    .collect();
                items.push(MenuItem::new("+ New author...", Action::PromptNewAuthor { key }));
                self.view.show_menu(Menu { anchor, items });
            }
            Action::SetAuthor { key, author } => {
                self.set_author(&key, &author)?;
            }
            Action::PromptNewAuthor { key } => {
                self.view.show_prompt(Prompt {
                    kind: PromptKind::NewAuthor { key },
                    title: "New author".to_string(),
                    suggestions: Vec::new(),
                });
            }
            Action::OpenTagColorMenu { tag } => {
                let current = self
                    .settings
                    .tag_colors()
                    .color_of(&tag, &self.config.tags.default_color)
                    .to_string();
                let items = self
                    .config
                    .tags
                    .palette
                    .iter()
                    .map(|color| {
                        MenuItem::new(
                            color.clone(),
                            Action::SetTagColor {
                                tag: tag.clone(),
                                color: color.clone(),
                            },
                        )
                        .checked(*color == current)
                    })
                    .collect();
                self.view.show_menu(Menu { anchor, items });
            }
            Action::SetTagColor { tag, color } => {
                if self.settings.set_tag_color(&tag, &color) {
                    self.after(Task::Repaint, self.config.timing.command_repaint());
                }
            }
            Action::RemoveTag { key, tag } => {
                self.remove_tag(&key, &tag)?;
            }
            Action::PromptAddTag { key } => {
                let note = self.require_active()?;
                let current = value_list(&self.current_value(&note, &key)?);
                let suggestions = self
                    .vault_tags()?
                    .into_iter()
                    .filter(|t| !current.contains(t))
                    .collect();
                self.view.show_prompt(Prompt {
                    kind: PromptKind::NewTag { key },
                    title: "Add tag".to_string(),
                    suggestions,
                });
            }
            Action::AddTag { key, tag } => {
                self.add_tag(&key, &tag)?;
            }
            Action::OpenNote { note } => {
                if self.store.exists(&note) {
                    self.view.open_note(&note);
                } else {
                    debug!(note = %note, "link target is gone");
                }
            }
            Action::ToggleLinks { key } => {
                let note = self.require_active()?;
                toggle(&mut self.side.expanded, (note, key.clone()));
                self.repaint_row(&key)?;
            }
        }
        Ok(())
    }

    /// Text entered in a prompt. Returns whether it was accepted.
    pub fn submit_prompt(&mut self, kind: PromptKind, text: &str) -> Result<bool, EngineError> {
        match kind {
            PromptKind::NewAuthor { key } => self.set_author(&key, text),
            PromptKind::NewTag { key } => self.add_tag(&key, text),
        }
    }

    /// Give a row a new semantic type: the key is renamed to the type's
    /// base name (made unique), keeps its position, and gets the default value.
    pub fn convert_row(&mut self, key: &str, ty: SemanticType) -> Result<String, EngineError> {
        let note = self.require_active()?;
        let found = self
            .store
            .front_matter(&note)?
            .and_then(|fm| fm.get_index_of(key).map(|index| (fm, index)));
        let Some((mut fm, index)) = found else {
            return Err(EngineError::MissingKey {
                note,
                key: key.to_string(),
            });
        };
        fm.shift_remove(key);
        let new_key = unique_key(&fm, ty.canonical_key());
        let value = types::default_value(ty, &note, self.today());
        fm.shift_insert(index, new_key.clone(), value);

        self.store.update_front_matter(&note, |current| *current = fm)?;
        self.settings.update_map(|map| {
            let removed = map.remove(key).is_some();
            map.set(&new_key, ty) || removed
        });
        info!(note = %note, from = key, to = %new_key, ty = %ty, "converted row");
        self.after(Task::Repaint, self.config.timing.command_repaint());
        Ok(new_key)
    }

    /// Step a version row. Locked rows are left alone.
    pub fn bump_version(
        &mut self,
        key: &str,
        segment: version::Segment,
        direction: version::Direction,
    ) -> Result<Option<String>, EngineError> {
        let note = self.require_active()?;
        if self.is_version_locked(&note, key) {
            debug!(note = %note, key, "version is locked");
            return Ok(None);
        }
        let current = value_text(&self.current_value(&note, key)?).unwrap_or_default();
        let bumped = version::bump_str(&current, segment, direction);
        self.set_value(key, string_value(bumped.clone()))?;
        self.settings.set_mapping(key, SemanticType::Version);
        Ok(Some(bumped))
    }

    fn set_author(&mut self, key: &str, author: &str) -> Result<bool, EngineError> {
        let author = author.trim();
        if author.is_empty() {
            return Ok(false);
        }
        self.set_value(key, string_value(author))?;
        Ok(true)
    }

    /// Append a tag to a row. Empty and duplicate tags are rejected.
    pub fn add_tag(&mut self, key: &str, tag: &str) -> Result<bool, EngineError> {
        let note = self.require_active()?;
        let tag = tag.trim();
        let mut tags = value_list(&self.current_value(&note, key)?);
        if tag.is_empty() || tags.iter().any(|t| t == tag) {
            debug!(note = %note, key, tag, "tag rejected");
            return Ok(false);
        }
        tags.push(tag.to_string());
        self.set_value(key, list_value(tags))?;
        Ok(true)
    }

    pub fn remove_tag(&mut self, key: &str, tag: &str) -> Result<bool, EngineError> {
        let note = self.require_active()?;
        let tags = value_list(&self.current_value(&note, key)?);
        if !tags.iter().any(|t| t == tag) {
            return Ok(false);
        }
        let kept: Vec<String> = tags.into_iter().filter(|t| t != tag).collect();
        self.set_value(key, list_value(kept))
    }

    // -----------------------------------------------------------------------
    // Vault-wide lookups
    // -----------------------------------------------------------------------

    /// Values of every key mapped to `ty` across the vault, flattened
    fn collect_values<F>(&self, ty: SemanticType, mut visit: F) -> Result<(), EngineError>
    where
        F: FnMut(&Value),
    {
        let keys: Vec<&str> = self.map().keys_of(ty).collect();
        if keys.is_empty() {
            return Ok(());
        }
        for note in self.store.list()? {
            let fm = match self.store.front_matter(&note) {
                Ok(Some(fm)) => fm,
                Ok(None) => continue,
                Err(e) => {
                    debug!(note = %note, error = %e, "skipping unreadable note");
                    continue;
                }
            };
            for key in &keys {
                if let Some(value) = fm.get(*key) {
                    visit(value);
                }
            }
        }
        Ok(())
    }

    /// Distinct author names used anywhere in the vault, sorted
    pub fn authors(&self) -> Result<Vec<String>, EngineError> {
        let mut authors = BTreeSet::new();
        self.collect_values(SemanticType::Author, |value| {
            if let Some(name) = value_text(value) {
                let name = name.trim();
                if !name.is_empty() {
                    authors.insert(name.to_string());
                }
            }
        })?;
        Ok(authors.into_iter().collect())
    }

    /// Every tag used anywhere in the vault, sorted like tag chips
    pub fn vault_tags(&self) -> Result<Vec<String>, EngineError> {
        let mut tags = Vec::new();
        self.collect_values(SemanticType::Tags, |value| tags.extend(value_list(value)))?;
        Ok(render::sorted_tags(Some(&list_value(tags))))
    }
}
