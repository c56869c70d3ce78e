use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::engine::scheduler::SystemClock;
use crate::engine::service::{Confirm, Engine, RepaintOutcome};
use crate::engine::settings::PersistedSettings;
use crate::host::{Action, Anchor, DocumentStore, PropertyView, StoreError};
use crate::io::settings_io::{self, FileSink};
use crate::io::{FsVault, MemoryView, VaultEvent, VaultWatcher, config_io, discover_vault};
use crate::model::note::{NotePath, value_list, value_text};
use crate::model::semantic::{SemanticType, StatusGlyph};
use crate::model::version::{Direction, Segment};
use crate::parse::front_matter;

type CliResult = Result<(), Box<dyn std::error::Error>>;

type VaultEngine = Engine<FsVault, MemoryView>;

/// Longest the watch loop sleeps when nothing is scheduled
const WATCH_IDLE: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CliResult {
    let json = cli.json;

    // Describe needs no vault
    if let Commands::Describe(args) = &cli.command {
        return cmd_describe(args, json);
    }

    let root = vault_root(cli.vault_dir.as_deref())?;
    debug!(root = %root.display(), "vault");

    match cli.command {
        Commands::Describe(_) => Ok(()),
        Commands::Paint(args) => cmd_paint(&root, args, json),
        Commands::Apply(args) => cmd_apply(&root, args, json),
        Commands::Normalize(args) => cmd_normalize(&root, args, json),
        Commands::Bump(args) => cmd_bump(&root, args, json),
        Commands::Status(args) => cmd_status(&root, args, json),
        Commands::Tag(cmd) => match cmd.action {
            TagAction::Add(args) => cmd_tag_edit(&root, args, true, json),
            TagAction::Remove(args) => cmd_tag_edit(&root, args, false, json),
            TagAction::Color(args) => cmd_tag_color(&root, args),
        },
        Commands::Map(cmd) => match cmd.action.unwrap_or(MapAction::List) {
            MapAction::List => cmd_map_list(&root, json),
            MapAction::Set(args) => cmd_map_set(&root, args),
            MapAction::Remove(args) => cmd_map_remove(&root, args),
        },
        Commands::Watch(args) => cmd_watch(&root, args, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn vault_root(dir: Option<&str>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let start = match dir {
        Some(dir) => std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?,
        None => std::env::current_dir()?,
    };
    Ok(discover_vault(&start)?)
}

fn load_settings(root: &Path) -> PersistedSettings {
    let settings = settings_io::read_settings_from(&settings_io::settings_path(root));
    PersistedSettings::new(settings, Box::new(FileSink::for_vault(root)))
}

fn open_engine(root: &Path) -> Result<VaultEngine, Box<dyn std::error::Error>> {
    let config = config_io::read_config(root)?;
    Ok(Engine::new(
        FsVault::open(root),
        MemoryView::new(),
        load_settings(root),
        config,
        Box::new(SystemClock::new()),
    ))
}

/// Show the note's current keys as view rows. Malformed metadata leaves
/// the rows as they were.
fn sync_rows(engine: &mut VaultEngine, note: &NotePath) {
    match engine.store().front_matter(note) {
        Ok(fm) => {
            let keys: Vec<String> = fm.map(|fm| fm.into_keys().collect()).unwrap_or_default();
            engine.view_mut().set_keys(keys);
        }
        Err(e) => debug!(note = %note, error = %e, "keeping previous rows"),
    }
}

/// Make `note` active and paint it, the way opening it in an editor would
fn open_note(
    engine: &mut VaultEngine,
    note: &str,
) -> Result<(NotePath, RepaintOutcome), Box<dyn std::error::Error>> {
    let note = NotePath::new(note);
    if !engine.store().exists(&note) {
        return Err(StoreError::NotFound(note).into());
    }
    sync_rows(engine, &note);
    let outcome = engine.activate(Some(note.clone()))?;
    Ok((note, outcome))
}

fn rendered_rows(engine: &VaultEngine) -> Vec<RowJson> {
    let map = engine.map();
    engine
        .view()
        .rows()
        .into_iter()
        .filter_map(|row| {
            let ty = map.get(&row.key)?;
            let rendering = engine.view().rendering(&row.key)?.clone();
            Some(RowJson {
                key: row.key,
                ty,
                rendering,
            })
        })
        .collect()
}

fn print_change(change: &ChangeJson, json: bool, text: &str) -> CliResult {
    if json {
        println!("{}", serde_json::to_string_pretty(change)?);
    } else {
        println!("{}", text);
    }
    Ok(())
}

fn value_of(engine: &VaultEngine, note: &NotePath, key: &str) -> Option<String> {
    let fm = engine.store().front_matter(note).ok()??;
    fm.get(key).map(|v| match v {
        serde_yaml::Value::Sequence(_) => value_list(v).join(", "),
        other => value_text(other).unwrap_or_default(),
    })
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn cmd_describe(args: &DescribeArgs, json: bool) -> CliResult {
    let described = describe(&args.filename);
    if json {
        println!("{}", serde_json::to_string_pretty(&described)?);
    } else {
        for line in format_describe(&described) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_paint(root: &Path, args: NoteArgs, json: bool) -> CliResult {
    let mut engine = open_engine(root)?;
    let (note, outcome) = open_note(&mut engine, &args.note)?;
    let rows = rendered_rows(&engine);
    let unmapped: Vec<String> = engine
        .store()
        .front_matter(&note)?
        .map(|fm| {
            engine
                .map()
                .unmapped(&fm)
                .into_iter()
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if json {
        let out = PaintJson {
            note,
            repaint: outcome,
            rows,
            unmapped,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("{}: no mapped properties", note);
    }
    for line in format_rows(&rows, &Painter::detect()) {
        println!("{}", line);
    }
    if !unmapped.is_empty() {
        println!("unmapped: {}", unmapped.join(", "));
    }
    Ok(())
}

fn cmd_map_list(root: &Path, json: bool) -> CliResult {
    let settings = load_settings(root);
    let entries: Vec<MapEntryJson> = settings
        .map()
        .iter()
        .map(|(key, ty)| MapEntryJson {
            key: key.to_string(),
            ty,
        })
        .collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    for entry in &entries {
        println!("{} -> {}", entry.key, entry.ty);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write command handlers
// ---------------------------------------------------------------------------

fn cmd_apply(root: &Path, args: NoteArgs, json: bool) -> CliResult {
    let mut engine = open_engine(root)?;
    let (note, _) = open_note(&mut engine, &args.note)?;
    let changed = engine.apply_template_command()?;
    // Paint now instead of waiting for the scheduled repaint
    sync_rows(&mut engine, &note);
    engine.repaint()?;

    let text = match (note.descriptor(), changed) {
        (None, _) => format!("{}: not hierarchy-coded, nothing to apply", note),
        (Some(_), true) => format!("{}: template applied", note),
        (Some(_), false) => format!("{}: template already complete", note),
    };
    print_change(
        &ChangeJson {
            note,
            changed,
            key: None,
            value: None,
        },
        json,
        &text,
    )
}

fn cmd_normalize(root: &Path, args: NormalizeArgs, json: bool) -> CliResult {
    let mut engine = open_engine(root)?;
    let confirm = if args.yes {
        Confirm::Apply
    } else {
        Confirm::DryRun
    };
    let report = engine.bulk_normalize(confirm)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_report(&report) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_bump(root: &Path, args: BumpArgs, json: bool) -> CliResult {
    let segment: Segment = args.segment.parse()?;
    let direction: Direction = args.direction.parse()?;
    let mut engine = open_engine(root)?;
    let (note, _) = open_note(&mut engine, &args.note)?;
    let bumped = engine
        .bump_version(&args.key, segment, direction)?
        .ok_or_else(|| format!("{} is locked", args.key))?;
    let text = format!("{} {} -> {}", note, args.key, bumped);
    print_change(
        &ChangeJson {
            note,
            changed: true,
            key: Some(args.key),
            value: Some(bumped),
        },
        json,
        &text,
    )
}

fn cmd_status(root: &Path, args: StatusArgs, json: bool) -> CliResult {
    let status = StatusGlyph::normalize(&args.state).ok_or_else(|| {
        format!(
            "unknown status '{}' (expected: complete, draft, incomplete, testing, deprecated)",
            args.state
        )
    })?;
    let mut engine = open_engine(root)?;
    let (note, _) = open_note(&mut engine, &args.note)?;
    let before = value_of(&engine, &note, &args.key);
    engine.dispatch(
        Action::SetStatus {
            key: args.key.clone(),
            status,
        },
        Anchor::default(),
    )?;
    let value = value_of(&engine, &note, &args.key);
    let text = format!("{} {} {} {}", note, args.key, status.glyph(), status.name());
    print_change(
        &ChangeJson {
            note,
            changed: before != value,
            key: Some(args.key),
            value,
        },
        json,
        &text,
    )
}

fn cmd_tag_edit(root: &Path, args: TagEditArgs, add: bool, json: bool) -> CliResult {
    let mut engine = open_engine(root)?;
    let (note, _) = open_note(&mut engine, &args.note)?;
    let changed = if add {
        engine.add_tag(&args.key, &args.tag)?
    } else {
        engine.remove_tag(&args.key, &args.tag)?
    };
    let text = match (add, changed) {
        (true, true) => format!("{} {} +{}", note, args.key, args.tag.trim()),
        (true, false) => format!("{} {}: tag '{}' not added", note, args.key, args.tag),
        (false, true) => format!("{} {} -{}", note, args.key, args.tag),
        (false, false) => format!("{} {}: no tag '{}'", note, args.key, args.tag),
    };
    let value = value_of(&engine, &note, &args.key);
    print_change(
        &ChangeJson {
            note,
            changed,
            key: Some(args.key),
            value,
        },
        json,
        &text,
    )
}

fn cmd_tag_color(root: &Path, args: TagColorArgs) -> CliResult {
    if parse_hex(&args.color).is_none() {
        return Err(format!("invalid color '{}' (expected #rrggbb)", args.color).into());
    }
    let mut settings = load_settings(root);
    settings.set_tag_color(&args.tag, &args.color);
    println!("{} -> {}", args.tag, args.color);
    Ok(())
}

fn cmd_map_set(root: &Path, args: MapSetArgs) -> CliResult {
    let ty = SemanticType::parse_type(&args.ty)
        .ok_or_else(|| format!("unknown property type '{}'", args.ty))?;
    let mut settings = load_settings(root);
    settings.set_mapping(&args.key, ty);
    println!("{} -> {}", args.key, ty);
    Ok(())
}

fn cmd_map_remove(root: &Path, args: MapRemoveArgs) -> CliResult {
    let mut settings = load_settings(root);
    if !settings.remove_mapping(&args.key) {
        return Err(format!("'{}' is not mapped", args.key).into());
    }
    println!("{} unmapped", args.key);
    Ok(())
}

// ---------------------------------------------------------------------------
// Watch
// ---------------------------------------------------------------------------

fn body_of(engine: &VaultEngine, note: &NotePath) -> Option<String> {
    let text = engine.store().read(note).ok()?;
    Some(front_matter::split(&text).body.to_string())
}

fn row_lines(
    engine: &VaultEngine,
    json: bool,
    painter: &Painter,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let rows = rendered_rows(engine);
    let lines = if json {
        vec![serde_json::to_string(&rows)?]
    } else {
        format_rows(&rows, painter)
    };
    Ok(lines)
}

fn cmd_watch(root: &Path, args: NoteArgs, json: bool) -> CliResult {
    let mut engine = open_engine(root)?;
    let watcher = VaultWatcher::start(root)?;
    let painter = Painter::detect();
    engine.start();
    let (note, _) = open_note(&mut engine, &args.note)?;
    let mut last_body = body_of(&engine, &note);
    let mut shown: Vec<String> = Vec::new();

    loop {
        if let Some(active) = engine.active_note().cloned() {
            sync_rows(&mut engine, &active);
        }
        engine.tick();

        let lines = row_lines(&engine, json, &painter)?;
        if lines != shown {
            if !json && let Some(active) = engine.active_note() {
                println!("--- {}", active);
            }
            for line in &lines {
                println!("{}", line);
            }
            shown = lines;
        }

        let timeout = engine.next_wakeup().unwrap_or(WATCH_IDLE).min(WATCH_IDLE);
        for event in watcher.wait(timeout) {
            debug!(?event, "vault event");
            match event {
                VaultEvent::Modified(changed) => {
                    engine.on_note_modified(&changed);
                    engine.on_metadata_changed(&changed);
                    if engine.active_note() == Some(&changed) {
                        let body = body_of(&engine, &changed);
                        if body != last_body {
                            engine.on_body_keystroke(&changed);
                            last_body = body;
                        }
                    }
                }
                VaultEvent::Renamed { from, to } => engine.on_note_renamed(&from, &to),
                VaultEvent::Removed(gone) => debug!(note = %gone, "note removed"),
            }
        }
    }
}
