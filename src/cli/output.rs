use std::io::IsTerminal;

use crossterm::style::{Color, Stylize};
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::engine::service::{NormalizeReport, RepaintOutcome};
use crate::host::Rendering;
use crate::model::hierarchy::{self, Role};
use crate::model::note::NotePath;
use crate::model::semantic::{SemanticType, StatusGlyph};
use crate::ops::template;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct DescribeJson {
    pub basename: String,
    pub coded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<&'static str>,
    pub display_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub template: Vec<&'static str>,
}

#[derive(Serialize)]
pub struct RowJson {
    pub key: String,
    #[serde(rename = "type")]
    pub ty: SemanticType,
    #[serde(flatten)]
    pub rendering: Rendering,
}

#[derive(Serialize)]
pub struct PaintJson {
    pub note: NotePath,
    pub repaint: RepaintOutcome,
    pub rows: Vec<RowJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unmapped: Vec<String>,
}

#[derive(Serialize)]
pub struct MapEntryJson {
    pub key: String,
    #[serde(rename = "type")]
    pub ty: SemanticType,
}

#[derive(Serialize)]
pub struct ChangeJson {
    pub note: NotePath,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn describe(filename: &str) -> DescribeJson {
    let note = NotePath::new(if filename.ends_with(".md") {
        filename.to_string()
    } else {
        format!("{}.md", filename)
    });
    let basename = note.basename().to_string();
    let descriptor = note.descriptor();
    DescribeJson {
        display_id: hierarchy::display_id(&basename),
        basename,
        coded: descriptor.is_some(),
        domain: descriptor.map(|d| d.domain),
        role: descriptor.map(|d| d.role()),
        category: descriptor.map(|d| d.category),
        template: descriptor
            .map(|d| template::template_keys(d.role()))
            .unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// Foreground coloring, off when stdout is not a terminal or `NO_COLOR` is set
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    color: bool,
}

impl Painter {
    pub fn detect() -> Self {
        Painter {
            color: std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
        }
    }

    pub fn plain() -> Self {
        Painter { color: false }
    }

    pub fn fg(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        self.fg(text, Color::DarkGrey)
    }
}

/// `#rrggbb` as a terminal color
pub fn parse_hex(color: &str) -> Option<Color> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::Rgb {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
    })
}

fn status_color(status: StatusGlyph) -> Color {
    match status.color() {
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "red" => Color::Red,
        "blue" => Color::Blue,
        _ => Color::Grey,
    }
}

/// One rendered row's value as terminal text
pub fn format_rendering(rendering: &Rendering, painter: &Painter) -> String {
    match rendering {
        Rendering::Derived { value } => painter.dim(value),
        Rendering::Links { links, hidden, .. } => {
            if links.is_empty() {
                return painter.dim("(none)");
            }
            let mut out = links
                .iter()
                .map(|l| l.label.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            if *hidden > 0 {
                out.push(' ');
                out.push_str(&painter.dim(&format!("(+{} more)", hidden)));
            }
            out
        }
        Rendering::Tags { chips } => {
            if chips.is_empty() {
                return painter.dim("(none)");
            }
            chips
                .iter()
                .map(|chip| {
                    let text = format!("#{}", chip.tag);
                    match parse_hex(&chip.color) {
                        Some(color) => painter.fg(&text, color),
                        None => text,
                    }
                })
                .collect::<Vec<_>>()
                .join(" ")
        }
        Rendering::Author { value } if value.trim().is_empty() => painter.dim("(unassigned)"),
        Rendering::Author { value } => value.clone(),
        Rendering::Version { value, locked: true } => {
            format!("{} {}", value, painter.dim("[locked]"))
        }
        Rendering::Version { value, .. } => value.clone(),
        Rendering::LastUpdate { value } => value.clone(),
        Rendering::Status { status, raw } => match status {
            Some(s) => format!("{} {}", s.glyph(), painter.fg(s.name(), status_color(*s))),
            None => raw.clone(),
        },
    }
}

/// Rows as `key  (type)  value` lines with the keys aligned
pub fn format_rows(rows: &[RowJson], painter: &Painter) -> Vec<String> {
    let width = rows.iter().map(|r| r.key.width()).max().unwrap_or(0);
    rows.iter()
        .map(|row| {
            let pad = " ".repeat(width - row.key.width());
            format!(
                "{}{}  {}  {}",
                row.key,
                pad,
                painter.dim(&format!("({})", row.ty)),
                format_rendering(&row.rendering, painter)
            )
        })
        .collect()
}

pub fn format_describe(d: &DescribeJson) -> Vec<String> {
    let mut lines = vec![format!("{}: {}", d.basename, d.display_id)];
    match (d.domain, d.role, d.category) {
        (Some(domain), Some(role), Some(category)) => {
            lines.push(format!("  category: {} ({})", category, domain));
            lines.push(format!("  role:     {}", role.label()));
            lines.push(format!("  template: {}", d.template.join(", ")));
        }
        _ => lines.push("  not hierarchy-coded".to_string()),
    }
    lines
}

pub fn format_report(report: &NormalizeReport) -> Vec<String> {
    let verb = if report.applied {
        "rewrote"
    } else {
        "would rewrite"
    };
    let mut lines = vec![format!(
        "{} {} of {} coded notes",
        verb,
        report.rewritten.len(),
        report.examined
    )];
    lines.extend(report.rewritten.iter().map(|n| format!("  {}", n)));
    for skipped in &report.skipped {
        lines.push(format!("  skipped {}: {}", skipped.note, skipped.reason));
    }
    if !report.applied && !report.rewritten.is_empty() {
        lines.push("run with --yes to apply (keys outside the template are dropped)".to_string());
    }
    lines
}
