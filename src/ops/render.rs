use serde_yaml::Value;

use crate::host::{Link, Rendering, TagChip};
use crate::model::hierarchy::{self, Role, UNKNOWN_CATEGORY};
use crate::model::note::{NotePath, value_list, value_text};
use crate::model::semantic::{SemanticType, StatusGlyph};
use crate::ops::tag_colors::TagColors;

/// Links shown before the expand toggle
pub const LINK_PREVIEW: usize = 3;

/// Vault-wide inputs shared by every row of one repaint
pub struct RenderContext<'a> {
    pub note: &'a NotePath,
    pub notes: &'a [NotePath],
    pub tag_colors: &'a TagColors,
    pub default_color: &'a str,
}

/// Per-row interaction state kept by the engine
#[derive(Debug, Clone, Copy, Default)]
pub struct RowState {
    pub version_locked: bool,
    pub links_expanded: bool,
}

/// Value the engine writes back on every repaint. `id` is always derived;
/// `type` and `category` only for hierarchy-coded notes.
pub fn derived_value(ty: SemanticType, note: &NotePath) -> Option<String> {
    match ty {
        SemanticType::Id => Some(hierarchy::display_id(note.basename())),
        SemanticType::Type => note.descriptor().map(|d| d.role().label().to_string()),
        SemanticType::Category => note.descriptor().map(|d| d.category.to_string()),
        _ => None,
    }
}

/// Notes in `notes` with role `role` in the same domain as `note`, sorted by label
pub fn related_notes(note: &NotePath, role: Role, notes: &[NotePath]) -> Vec<Link> {
    let Some(own) = note.descriptor() else {
        return Vec::new();
    };
    let mut links: Vec<Link> = notes
        .iter()
        .filter(|other| {
            other.descriptor().is_some_and(|d| {
                d.domain == own.domain && d.role() == role && other.basename() != note.basename()
            })
        })
        .map(|other| Link {
            label: hierarchy::strip_code(other.basename()).to_string(),
            note: other.clone(),
        })
        .collect();
    links.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.note.cmp(&b.note)));
    links
}

/// Parent names written into a fresh child template
pub fn parent_names(note: &NotePath, notes: &[NotePath]) -> Vec<String> {
    if note.descriptor().is_none_or(|d| d.is_parent()) {
        return Vec::new();
    }
    related_notes(note, Role::Parent, notes)
        .into_iter()
        .map(|l| l.label)
        .collect()
}

/// Tags of a value, deduplicated and sorted case-insensitively
pub fn sorted_tags(value: Option<&Value>) -> Vec<String> {
    let mut tags = value.map(value_list).unwrap_or_default();
    tags.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
    tags.dedup();
    tags
}

fn links_for(
    ty: SemanticType,
    ctx: &RenderContext<'_>,
    state: RowState,
) -> Rendering {
    // A parent row lists parents and only makes sense on a child, and the reverse
    let wanted = match ty {
        SemanticType::Parent => Role::Parent,
        _ => Role::Child,
    };
    let mut links = match ctx.note.descriptor() {
        Some(d) if d.role() == wanted.complement() => related_notes(ctx.note, wanted, ctx.notes),
        _ => Vec::new(),
    };
    let mut hidden = 0;
    if !state.links_expanded && links.len() > LINK_PREVIEW {
        hidden = links.len() - LINK_PREVIEW;
        links.truncate(LINK_PREVIEW);
    }
    Rendering::Links {
        links,
        hidden,
        expanded: state.links_expanded,
    }
}

/// How a row mapped to `ty` looks, given its stored value
pub fn render(
    ty: SemanticType,
    value: Option<&Value>,
    ctx: &RenderContext<'_>,
    state: RowState,
) -> Rendering {
    let text = || value.and_then(value_text).unwrap_or_default();
    match ty {
        SemanticType::Id | SemanticType::Type | SemanticType::Category => Rendering::Derived {
            value: derived_value(ty, ctx.note).unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
        },
        SemanticType::Parent | SemanticType::Child => links_for(ty, ctx, state),
        SemanticType::Tags => Rendering::Tags {
            chips: sorted_tags(value)
                .into_iter()
                .map(|tag| TagChip {
                    color: ctx.tag_colors.color_of(&tag, ctx.default_color).to_string(),
                    tag,
                })
                .collect(),
        },
        SemanticType::Author => Rendering::Author { value: text() },
        SemanticType::Version => Rendering::Version {
            value: text(),
            locked: state.version_locked,
        },
        SemanticType::LastUpdate => Rendering::LastUpdate { value: text() },
        SemanticType::Status => {
            let raw = text();
            Rendering::Status {
                status: StatusGlyph::normalize(&raw),
                raw,
            }
        }
    }
}
