//! End-to-end engine behavior against the in-memory vault and view.
//!
//! Every delayed action runs on a `ManualClock`, so timing is exact.

use std::time::Duration;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use vaultprops::cli::output::{Painter, RowJson, format_rows};
use vaultprops::engine::{
    Confirm, Engine, ManualClock, MemorySink, PersistedSettings, RepaintOutcome, Settings,
    SkipReason, Task,
};
use vaultprops::host::{Action, Anchor, DocumentStore, PropertyView, Rendering, TagChip};
use vaultprops::io::{MemoryVault, MemoryView};
use vaultprops::model::hierarchy::Role;
use vaultprops::model::note::{FrontMatter, NotePath, list_value, string_value};
use vaultprops::model::semantic::{SemanticType, StatusGlyph};
use vaultprops::model::version::{Direction, Segment};
use vaultprops::model::VaultConfig;
use vaultprops::ops::template;
use vaultprops::parse::parse_front_matter;

type TestEngine = Engine<MemoryVault, MemoryView>;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn engine_with(vault: MemoryVault) -> (TestEngine, ManualClock, MemorySink) {
    engine_with_config(vault, VaultConfig::default())
}

fn engine_with_config(
    vault: MemoryVault,
    config: VaultConfig,
) -> (TestEngine, ManualClock, MemorySink) {
    let clock = ManualClock::new(day());
    let sink = MemorySink::new();
    let settings = PersistedSettings::new(Settings::default(), Box::new(sink.clone()));
    let engine = Engine::new(
        vault,
        MemoryView::new(),
        settings,
        config,
        Box::new(clock.clone()),
    );
    (engine, clock, sink)
}

fn fm_of(engine: &TestEngine, note: &str) -> FrontMatter {
    engine
        .store()
        .front_matter(&NotePath::new(note))
        .unwrap()
        .unwrap_or_default()
}

/// Mirror the note's keys into the view, as an editor would
fn sync(engine: &mut TestEngine, note: &str) {
    let keys: Vec<String> = fm_of(engine, note).into_keys().collect();
    engine.view_mut().set_keys(keys);
}

fn open(engine: &mut TestEngine, note: &str) -> RepaintOutcome {
    sync(engine, note);
    engine.activate(Some(NotePath::new(note))).unwrap()
}

fn renderings(engine: &TestEngine) -> Vec<(String, Rendering)> {
    engine
        .view()
        .renderings()
        .map(|(k, r)| (k.to_string(), r.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Rename reconciliation
// ---------------------------------------------------------------------------

#[test]
fn renamed_key_keeps_its_type() {
    let vault = MemoryVault::new().with("Readme.md", "---\nA: \u{1F7E2}\nnote: x\n---\nbody\n");
    let (mut engine, _clock, sink) = engine_with(vault);
    engine
        .settings_mut()
        .set_mapping("A", SemanticType::Status);
    open(&mut engine, "Readme.md");

    // The user renames A to B in the editor
    engine
        .store_mut()
        .write(
            &NotePath::new("Readme.md"),
            "---\nB: \u{1F7E2}\nnote: x\n---\nbody\n",
        )
        .unwrap();
    sync(&mut engine, "Readme.md");
    let outcome = engine.repaint().unwrap();

    assert_eq!(engine.map().get("B"), Some(SemanticType::Status));
    assert!(!engine.map().contains("A"));
    assert!(!engine.map().contains("note"));
    match outcome {
        RepaintOutcome::Painted { reconciled, .. } => {
            assert_eq!(reconciled.reassigned.len(), 1);
            assert_eq!(reconciled.reassigned[0].from, "A");
            assert_eq!(reconciled.reassigned[0].to, "B");
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(
        sink.stored().unwrap().map.get("B"),
        Some(SemanticType::Status)
    );
    assert_eq!(
        engine.view().rendering("B"),
        Some(&Rendering::Status {
            status: Some(StatusGlyph::Complete),
            raw: "\u{1F7E2}".to_string(),
        })
    );
}

#[test]
fn deleted_key_mapping_is_dropped() {
    let vault = MemoryVault::new().with("Readme.md", "---\nauthor: Ada\nnote: plain\n---\n");
    let (mut engine, _clock, _sink) = engine_with(vault);
    engine
        .settings_mut()
        .set_mapping("A", SemanticType::Status);
    engine
        .settings_mut()
        .set_mapping("author", SemanticType::Author);

    open(&mut engine, "Readme.md");

    assert!(!engine.map().contains("A"));
    assert_eq!(engine.map().get("author"), Some(SemanticType::Author));
    assert_eq!(engine.map().len(), 1);
}

// ---------------------------------------------------------------------------
// Bulk normalization
// ---------------------------------------------------------------------------

fn messy_vault() -> MemoryVault {
    MemoryVault::new()
        .with(
            "10_AI.md",
            "---\nstatus: \u{1F7E2}\nscratch: drop me\nid: AI\n---\nBody\n",
        )
        .with("11_Path.md", "---\nstatus: Draft\n---\n")
        .with("12_Empty.md", "just text\n")
        .with("Readme.md", "---\nfoo: 1\n---\n")
}

#[test]
fn normalization_is_a_dry_run_by_default() {
    let (mut engine, _clock, _sink) = engine_with(messy_vault());
    let report = engine.bulk_normalize(Confirm::DryRun).unwrap();
    assert!(!report.applied);
    assert_eq!(report.examined, 2);
    assert_eq!(
        report.rewritten,
        vec![NotePath::new("10_AI.md"), NotePath::new("11_Path.md")]
    );
    assert_eq!(engine.store().writes(), 0);
}

#[test]
fn normalization_is_idempotent() {
    let (mut engine, _clock, _sink) = engine_with(messy_vault());
    let first = engine.bulk_normalize(Confirm::Apply).unwrap();
    assert_eq!(first.rewritten.len(), 2);
    assert_eq!(engine.store().writes(), 2);

    let ai = fm_of(&engine, "10_AI.md");
    assert_eq!(
        ai.keys().map(String::as_str).collect::<Vec<_>>(),
        template::template_keys(Role::Parent)
    );
    assert_eq!(ai["status"], string_value("\u{1F7E2}"));
    assert_eq!(ai["id"], string_value("AI"));
    assert!(!ai.contains_key("scratch"));
    assert!(engine.store().text("10_AI.md").unwrap().ends_with("---\nBody\n"));
    assert_eq!(fm_of(&engine, "11_Path.md")["status"], string_value("Draft"));
    assert_eq!(engine.store().text("Readme.md"), Some("---\nfoo: 1\n---\n"));

    let second = engine.bulk_normalize(Confirm::Apply).unwrap();
    assert!(second.rewritten.is_empty());
    assert_eq!(engine.store().writes(), 2);
}

#[test]
fn other_role_slot_is_normalized_away() {
    let vault = MemoryVault::new().with("11_X.md", "--ccprop\n");
    let (mut engine, _clock, _sink) = engine_with(vault);
    let note = NotePath::new("11_X.md");
    engine.on_note_modified(&note);
    engine
        .settings_mut()
        .set_mapping("child", SemanticType::Child);
    engine
        .store_mut()
        .update_front_matter(&note, |fm| {
            fm.insert("child".into(), string_value("stray"));
        })
        .unwrap();

    let report = engine.bulk_normalize(Confirm::Apply).unwrap();
    assert_eq!(report.rewritten, vec![note.clone()]);
    assert_eq!(
        fm_of(&engine, "11_X.md")
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>(),
        template::template_keys(Role::Child)
    );
    assert!(engine.bulk_normalize(Confirm::Apply).unwrap().rewritten.is_empty());
}

// ---------------------------------------------------------------------------
// Uncommitted input guard
// ---------------------------------------------------------------------------

#[test]
fn repaint_waits_for_uncommitted_tag_input() {
    let vault = MemoryVault::new().with("Readme.md", "---\ntags: [ai]\nauthor: Ada\n---\n");
    let (mut engine, _clock, _sink) = engine_with(vault);
    engine.settings_mut().set_mapping("tags", SemanticType::Tags);
    engine
        .settings_mut()
        .set_mapping("author", SemanticType::Author);
    open(&mut engine, "Readme.md");
    let before = renderings(&engine);
    let count = engine.view().render_count();

    engine
        .store_mut()
        .write(
            &NotePath::new("Readme.md"),
            "---\ntags: [ai, combat]\nauthor: Grace\n---\n",
        )
        .unwrap();
    engine.view_mut().set_draft("tags", "per");

    assert_eq!(
        engine.repaint().unwrap(),
        RepaintOutcome::Skipped {
            reason: SkipReason::UncommittedInput
        }
    );
    assert_eq!(renderings(&engine), before);
    assert_eq!(engine.view().render_count(), count);

    engine.view_mut().set_draft("tags", "");
    engine.repaint().unwrap();
    assert_eq!(
        engine.view().rendering("author"),
        Some(&Rendering::Author {
            value: "Grace".to_string()
        })
    );
}

fn tag_labels(engine: &TestEngine) -> Vec<String> {
    match engine.view().rendering("tags") {
        Some(Rendering::Tags { chips }) => chips.iter().map(|c| c.tag.clone()).collect(),
        other => panic!("unexpected rendering {:?}", other),
    }
}

#[test]
fn new_rows_wait_for_uncommitted_tag_input() {
    let vault = MemoryVault::new().with("Readme.md", "---\ntags: [ai]\n---\n");
    let (mut engine, clock, _sink) = engine_with(vault);
    engine.settings_mut().set_mapping("tags", SemanticType::Tags);
    open(&mut engine, "Readme.md");
    let note = NotePath::new("Readme.md");
    engine.start();

    engine.view_mut().set_draft("tags", "typing");
    engine
        .store_mut()
        .write(&note, "---\ntags: [ai, zz]\n---\n")
        .unwrap();
    clock.advance(Duration::from_secs(300));
    engine.tick();
    assert!(!engine.is_painted(&note, "tags"));

    let count = engine.view().render_count();
    assert_eq!(engine.paint_new_rows().unwrap(), 0);
    assert_eq!(tag_labels(&engine), vec!["ai"]);
    assert_eq!(engine.view().render_count(), count);

    engine.view_mut().set_draft("tags", "");
    assert_eq!(engine.paint_new_rows().unwrap(), 1);
    assert_eq!(tag_labels(&engine), vec!["ai", "zz"]);
    assert!(engine.is_painted(&note, "tags"));
    assert_eq!(engine.paint_new_rows().unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

#[test]
fn child_trigger_is_consumed() {
    let vault = MemoryVault::new()
        .with("10_AI.md", "")
        .with("11_Pathfinding.md", "--ccprop\nHello\n");
    let (mut engine, clock, sink) = engine_with(vault);
    let note = NotePath::new("11_Pathfinding.md");

    engine.on_note_modified(&note);

    let text = engine.store().text("11_Pathfinding.md").unwrap().to_string();
    assert!(text.ends_with("---\nHello\n"));
    let fm = parse_front_matter(&text).unwrap().unwrap();
    assert_eq!(
        fm.keys().map(String::as_str).collect::<Vec<_>>(),
        template::template_keys(Role::Child)
    );
    assert_eq!(fm["id"], string_value("11_Pathfinding"));
    assert_eq!(fm["parent"], string_value("AI"));
    assert_eq!(fm["last update"], string_value("14/03/2025"));
    assert_eq!(engine.map().get("parent"), Some(SemanticType::Parent));
    assert!(sink.saves() > 0);

    // Repainting writes the display id
    open(&mut engine, "11_Pathfinding.md");
    clock.advance(ms(200));
    engine.tick();
    assert_eq!(
        fm_of(&engine, "11_Pathfinding.md")["id"],
        string_value("Pathfinding")
    );

    let rows: Vec<RowJson> = engine
        .view()
        .rows()
        .into_iter()
        .filter_map(|row| {
            Some(RowJson {
                ty: engine.map().get(&row.key)?,
                rendering: engine.view().rendering(&row.key)?.clone(),
                key: row.key,
            })
        })
        .collect();
    insta::assert_snapshot!(format_rows(&rows, &Painter::plain()).join("\n"), @r"
    id           (id)  Pathfinding
    type         (type)  Child
    category     (category)  Game Architecture
    parent       (parent)  AI
    tags         (tags)  (none)
    author       (author)  (unassigned)
    version      (version)  0.0.1
    last update  (last update)  14/03/2025
    status       (status)  🔴 Incomplete
    ");
}

#[test]
fn trigger_on_uncoded_note_needs_explicit_role() {
    let vault = MemoryVault::new()
        .with("Ideas.md", "--cprop\nstuff\n")
        .with("Plan.md", "--pcprop\nstuff\n");
    let (mut engine, _clock, _sink) = engine_with(vault);

    engine.on_note_modified(&NotePath::new("Ideas.md"));
    assert_eq!(engine.store().text("Ideas.md"), Some("--cprop\nstuff\n"));

    engine.on_note_modified(&NotePath::new("Plan.md"));
    let fm = fm_of(&engine, "Plan.md");
    assert_eq!(fm["type"], string_value("Parent"));
    assert_eq!(fm["category"], string_value("Unknown"));
    assert!(fm.contains_key("child"));
}

#[test]
fn template_round_trip_parent_to_child() {
    let vault = MemoryVault::new().with("10_Combat.md", "--pcprop\nNotes\n");
    let (mut engine, clock, _sink) = engine_with(vault);
    let old = NotePath::new("10_Combat.md");
    engine.on_note_modified(&old);
    open(&mut engine, "10_Combat.md");

    engine
        .dispatch(
            Action::SetAuthor {
                key: "author".into(),
                author: "Ada".into(),
            },
            Anchor::default(),
        )
        .unwrap();
    assert!(engine.add_tag("tags", "combat").unwrap());
    engine
        .bump_version("version", Segment::Minor, Direction::Up)
        .unwrap();
    engine
        .dispatch(
            Action::SetStatus {
                key: "status".into(),
                status: StatusGlyph::Draft,
            },
            Anchor::default(),
        )
        .unwrap();
    let before = fm_of(&engine, "10_Combat.md");

    let new = NotePath::new("11_Combat.md");
    assert!(engine.store_mut().rename(&old, &new));
    engine.on_note_renamed(&old, &new);

    let after = fm_of(&engine, "11_Combat.md");
    assert_eq!(
        after.keys().map(String::as_str).collect::<Vec<_>>(),
        template::template_keys(Role::Child)
    );
    for key in ["tags", "author", "version", "last update", "status"] {
        assert_eq!(after[key], before[key], "{} carried over", key);
    }
    assert_eq!(after["id"], string_value("Combat"));
    assert_eq!(after["type"], string_value("Child"));
    assert_eq!(after["category"], string_value("Game Architecture"));
    assert_eq!(after["parent"], string_value("auto-detected"));
    assert_eq!(after["tags"], list_value(["combat"]));
    assert!(engine.store().text("11_Combat.md").unwrap().ends_with("Notes\n"));

    assert_eq!(engine.map().get("parent"), Some(SemanticType::Parent));
    assert!(!engine.map().contains("child"));
    assert_eq!(engine.active_note(), Some(&new));

    clock.advance(ms(100));
    sync(&mut engine, "11_Combat.md");
    assert!(engine.tick() > 0);
}

#[test]
fn rename_into_hierarchy_applies_template_later() {
    let vault = MemoryVault::new()
        .with("Draft.md", "")
        .with("Kept.md", "---\nfoo: 1\n---\n");
    let (mut engine, clock, _sink) = engine_with(vault);

    for (old, new) in [("Draft.md", "12_Draft.md"), ("Kept.md", "13_Kept.md")] {
        let (old, new) = (NotePath::new(old), NotePath::new(new));
        engine.store_mut().rename(&old, &new);
        engine.on_note_renamed(&old, &new);
    }

    clock.advance(ms(199));
    assert_eq!(engine.tick(), 0);
    assert_eq!(engine.store().text("12_Draft.md"), Some(""));

    clock.advance(ms(1));
    engine.tick();
    let fm = fm_of(&engine, "12_Draft.md");
    assert_eq!(fm["type"], string_value("Child"));
    assert_eq!(engine.store().text("13_Kept.md"), Some("---\nfoo: 1\n---\n"));
}

#[test]
fn stale_rename_template_is_a_no_op() {
    let vault = MemoryVault::new().with("Draft.md", "");
    let (mut engine, clock, _sink) = engine_with(vault);
    let (old, new) = (NotePath::new("Draft.md"), NotePath::new("12_Draft.md"));
    engine.store_mut().rename(&old, &new);
    engine.on_note_renamed(&old, &new);
    engine.store_mut().remove(&new);

    clock.advance(ms(500));
    engine.tick();
    assert_eq!(engine.store().writes(), 0);
}

#[test]
fn apply_command_fills_only_missing_keys() {
    let vault = MemoryVault::new()
        .with("20_Story.md", "---\nauthor: Grace\nmood: dark\n---\nText\n")
        .with("Readme.md", "plain\n");
    let (mut engine, _clock, _sink) = engine_with(vault);

    open(&mut engine, "Readme.md");
    assert!(!engine.apply_template_command().unwrap());
    assert_eq!(engine.store().writes(), 0);

    open(&mut engine, "20_Story.md");
    assert!(engine.apply_template_command().unwrap());
    let fm = fm_of(&engine, "20_Story.md");
    assert_eq!(fm["author"], string_value("Grace"));
    assert_eq!(fm["mood"], string_value("dark"));
    assert_eq!(fm.get_index_of("author"), Some(0));
    for key in template::template_keys(Role::Parent) {
        assert!(fm.contains_key(key), "{} added", key);
    }
    assert!(!engine.apply_template_command().unwrap());
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

#[test]
fn metadata_bursts_coalesce_into_one_repaint() {
    let vault = MemoryVault::new().with("Readme.md", "---\nauthor: Ada\ntags: []\n---\n");
    let (mut engine, clock, _sink) = engine_with(vault);
    engine
        .settings_mut()
        .set_mapping("author", SemanticType::Author);
    engine.settings_mut().set_mapping("tags", SemanticType::Tags);
    open(&mut engine, "Readme.md");
    let painted = engine.view().render_count();
    let note = NotePath::new("Readme.md");

    engine.on_metadata_changed(&note);
    clock.advance(ms(30));
    engine.on_metadata_changed(&note);
    clock.advance(ms(30));
    engine.on_metadata_changed(&note);
    assert_eq!(engine.scheduler().len(), 1);

    clock.advance(ms(40));
    assert_eq!(engine.tick(), 0);
    clock.advance(ms(10));
    assert_eq!(engine.tick(), 1);
    assert_eq!(engine.view().render_count(), painted + 2);

    // Other notes do not repaint the active one
    engine.on_metadata_changed(&NotePath::new("Other.md"));
    assert!(engine.scheduler().is_empty());
}

#[test]
fn start_schedules_only_the_refresh_by_default() {
    let (mut engine, _clock, _sink) = engine_with(messy_vault());
    engine.start();
    assert_eq!(
        engine.scheduler().deadline(&Task::PeriodicRefresh),
        Some(Duration::from_secs(300))
    );
    assert!(!engine.scheduler().is_scheduled(&Task::BulkNormalize));
    assert_eq!(engine.scheduler().len(), 1);
}

#[test]
fn periodic_refresh_repaints_and_reschedules() {
    let vault = MemoryVault::new().with("Readme.md", "---\nauthor: Ada\n---\n");
    let (mut engine, clock, _sink) = engine_with(vault);
    engine
        .settings_mut()
        .set_mapping("author", SemanticType::Author);
    open(&mut engine, "Readme.md");
    let note = NotePath::new("Readme.md");
    let count = engine.view().render_count();
    engine.start();

    clock.advance(ms(299_999));
    assert_eq!(engine.tick(), 0);
    clock.advance(ms(1));
    assert_eq!(engine.tick(), 1);
    assert!(!engine.is_painted(&note, "author"));
    assert_eq!(
        engine.scheduler().deadline(&Task::PeriodicRefresh),
        Some(Duration::from_secs(600))
    );

    clock.advance(ms(100));
    assert_eq!(engine.tick(), 1);
    assert_eq!(engine.view().render_count(), count + 1);
    assert!(engine.is_painted(&note, "author"));
}

#[test]
fn startup_normalization_runs_when_enabled() {
    let mut config = VaultConfig::default();
    config.normalize.on_startup = true;
    let (mut engine, clock, _sink) = engine_with_config(messy_vault(), config);
    engine.start();
    assert!(engine.scheduler().is_scheduled(&Task::BulkNormalize));

    clock.advance(ms(999));
    assert_eq!(engine.tick(), 0);
    assert_eq!(engine.store().writes(), 0);
    clock.advance(ms(1));
    assert_eq!(engine.tick(), 1);
    assert_eq!(engine.store().writes(), 2);
    assert_eq!(
        fm_of(&engine, "10_AI.md")
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>(),
        template::template_keys(Role::Parent)
    );
    assert!(!engine.scheduler().is_scheduled(&Task::BulkNormalize));
    assert!(engine.scheduler().is_scheduled(&Task::PeriodicRefresh));
}

#[test]
fn last_update_follows_typing_after_a_quiet_second() {
    let vault = MemoryVault::new().with("11_Path.md", "--ccprop\n");
    let (mut engine, clock, _sink) = engine_with(vault);
    let note = NotePath::new("11_Path.md");
    engine.on_note_modified(&note);
    open(&mut engine, "11_Path.md");
    clock.advance(ms(200));
    engine.tick();

    let later = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
    clock.set_today(later);
    engine.on_body_keystroke(&note);
    clock.advance(ms(500));
    engine.on_body_keystroke(&note);

    clock.advance(ms(999));
    assert_eq!(engine.tick(), 0);
    clock.advance(ms(1));
    assert_eq!(engine.tick(), 1);
    assert_eq!(fm_of(&engine, "11_Path.md")["last update"], string_value("14/03/2025"));

    clock.advance(ms(100));
    engine.tick();
    assert_eq!(fm_of(&engine, "11_Path.md")["last update"], string_value("02/04/2025"));
}

// ---------------------------------------------------------------------------
// Row interaction
// ---------------------------------------------------------------------------

#[test]
fn converting_a_row_keeps_its_position() {
    let vault = MemoryVault::new().with("Readme.md", "---\na: 1\nb: 2\nc: 3\n---\n");
    let (mut engine, _clock, _sink) = engine_with(vault);
    engine.settings_mut().set_mapping("b", SemanticType::Author);
    open(&mut engine, "Readme.md");

    let key = engine.convert_row("b", SemanticType::Status).unwrap();
    assert_eq!(key, "status");
    let fm = fm_of(&engine, "Readme.md");
    assert_eq!(
        fm.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["a", "status", "c"]
    );
    assert_eq!(fm["status"], string_value("\u{1F534}"));
    assert_eq!(engine.map().get("status"), Some(SemanticType::Status));
    assert!(!engine.map().contains("b"));
}

#[test]
fn author_picker_lists_vault_authors() {
    let vault = MemoryVault::new()
        .with("10_AI.md", "---\nauthor: Grace\n---\n")
        .with("11_Path.md", "---\nauthor: Ada\n---\n")
        .with("12_Nav.md", "---\nauthor: ' Ada '\n---\n");
    let (mut engine, _clock, _sink) = engine_with(vault);
    engine
        .settings_mut()
        .set_mapping("author", SemanticType::Author);
    open(&mut engine, "11_Path.md");

    engine
        .dispatch(
            Action::OpenAuthorPicker {
                key: "author".into(),
            },
            Anchor { x: 4, y: 8 },
        )
        .unwrap();
    let menu = &engine.view().menus[0];
    assert_eq!(menu.anchor, Anchor { x: 4, y: 8 });
    let labels: Vec<&str> = menu.items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, vec!["Ada", "Grace", "+ New author..."]);
    assert!(menu.items[0].checked);
    assert!(!menu.items[1].checked);
}

#[test]
fn tag_entry_rejects_blank_and_duplicates() {
    let vault = MemoryVault::new().with("Readme.md", "---\ntags: [ai]\n---\n");
    let (mut engine, _clock, _sink) = engine_with(vault);
    engine.settings_mut().set_mapping("tags", SemanticType::Tags);
    open(&mut engine, "Readme.md");

    assert!(!engine.add_tag("tags", "ai").unwrap());
    assert!(!engine.add_tag("tags", "  ").unwrap());
    assert!(engine.add_tag("tags", "combat").unwrap());
    assert!(engine.remove_tag("tags", "ai").unwrap());
    assert_eq!(fm_of(&engine, "Readme.md")["tags"], list_value(["combat"]));
}

#[test]
fn locked_version_does_not_bump() {
    let vault = MemoryVault::new().with("Readme.md", "---\nversion: 1.2.9\n---\n");
    let (mut engine, _clock, _sink) = engine_with(vault);
    engine
        .settings_mut()
        .set_mapping("version", SemanticType::Version);
    open(&mut engine, "Readme.md");

    assert_eq!(
        engine
            .bump_version("version", Segment::Patch, Direction::Up)
            .unwrap(),
        Some("1.3.0".to_string())
    );
    engine
        .dispatch(
            Action::ToggleVersionLock {
                key: "version".into(),
            },
            Anchor::default(),
        )
        .unwrap();
    assert_eq!(
        engine
            .bump_version("version", Segment::Major, Direction::Up)
            .unwrap(),
        None
    );
    assert_eq!(fm_of(&engine, "Readme.md")["version"], string_value("1.3.0"));
}

#[test]
fn tag_recolor_applies_on_the_next_repaint() {
    let vault = MemoryVault::new().with("Readme.md", "---\ntags: [ai]\n---\n");
    let (mut engine, clock, sink) = engine_with(vault);
    engine.settings_mut().set_mapping("tags", SemanticType::Tags);
    open(&mut engine, "Readme.md");

    engine
        .dispatch(
            Action::SetTagColor {
                tag: "ai".into(),
                color: "#e74c3c".into(),
            },
            Anchor::default(),
        )
        .unwrap();
    assert_eq!(
        sink.stored().unwrap().tag_colors.get("ai"),
        Some("#e74c3c")
    );
    assert!(engine.scheduler().is_scheduled(&Task::Repaint));

    clock.advance(ms(100));
    engine.tick();
    assert_eq!(
        engine.view().rendering("tags"),
        Some(&Rendering::Tags {
            chips: vec![TagChip {
                tag: "ai".into(),
                color: "#e74c3c".into(),
            }]
        })
    );
}

fn domain_vault() -> MemoryVault {
    MemoryVault::new()
        .with("10_AI.md", "---\nchild: x\ntags: []\n---\n")
        .with("11_Boids.md", "")
        .with("12_Combat.md", "")
        .with("13_Dialogue.md", "")
        .with("14_Emotes.md", "")
        .with("21_Quests.md", "")
}

fn link_labels(engine: &TestEngine) -> (Vec<String>, usize, bool) {
    match engine.view().rendering("child") {
        Some(Rendering::Links {
            links,
            hidden,
            expanded,
        }) => (
            links.iter().map(|l| l.label.clone()).collect(),
            *hidden,
            *expanded,
        ),
        other => panic!("unexpected rendering {:?}", other),
    }
}

#[test]
fn link_rows_expand_and_wait_for_tag_input() {
    let (mut engine, _clock, _sink) = engine_with(domain_vault());
    engine.settings_mut().set_mapping("tags", SemanticType::Tags);
    engine
        .settings_mut()
        .set_mapping("child", SemanticType::Child);
    open(&mut engine, "10_AI.md");
    assert_eq!(
        link_labels(&engine),
        (vec!["Boids".into(), "Combat".into(), "Dialogue".into()], 1, false)
    );

    let toggle = Action::ToggleLinks {
        key: "child".into(),
    };
    engine.dispatch(toggle.clone(), Anchor::default()).unwrap();
    assert_eq!(link_labels(&engine).0.len(), 4);
    assert_eq!(link_labels(&engine).1, 0);
    assert!(link_labels(&engine).2);

    // Collapsing while a tag is being typed leaves the row as shown
    engine.view_mut().set_draft("tags", "ne");
    let count = engine.view().render_count();
    engine.dispatch(toggle, Anchor::default()).unwrap();
    assert_eq!(engine.view().render_count(), count);
    assert!(link_labels(&engine).2);

    engine.view_mut().set_draft("tags", "");
    engine.repaint().unwrap();
    assert_eq!(link_labels(&engine).1, 1);
    assert!(!link_labels(&engine).2);
}

#[test]
fn opening_a_link_skips_missing_notes() {
    let (mut engine, _clock, _sink) = engine_with(domain_vault());
    open(&mut engine, "10_AI.md");

    engine
        .dispatch(
            Action::OpenNote {
                note: NotePath::new("11_Boids.md"),
            },
            Anchor::default(),
        )
        .unwrap();
    engine.store_mut().remove(&NotePath::new("12_Combat.md"));
    engine
        .dispatch(
            Action::OpenNote {
                note: NotePath::new("12_Combat.md"),
            },
            Anchor::default(),
        )
        .unwrap();
    assert_eq!(engine.view().opened, vec![NotePath::new("11_Boids.md")]);
}
