use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_yaml::Value;

use crate::model::hierarchy::{self, UNKNOWN_CATEGORY};
use crate::model::note::{NotePath, list_value, string_value};
use crate::model::semantic::{SemanticType, StatusGlyph};
use crate::model::version::VersionValue;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{2}/[0-9]{2}/[0-9]{4}$").unwrap());

/// Placeholder for parent/child slots; the real list is computed on render
pub const AUTO_DETECTED: &str = "auto-detected";

/// Initial version of a fresh note
pub const INITIAL_VERSION: &str = "0.0.1";

/// `DD/MM/YYYY`, the format of `last update` values
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Value written for a type when the key is created or reset
pub fn default_value(ty: SemanticType, note: &NotePath, today: NaiveDate) -> Value {
    let descriptor = note.descriptor();
    match ty {
        SemanticType::Id => string_value(hierarchy::display_id(note.basename())),
        SemanticType::Type => {
            string_value(descriptor.map_or(UNKNOWN_CATEGORY, |d| d.role().label()))
        }
        SemanticType::Category => {
            string_value(descriptor.map_or(UNKNOWN_CATEGORY, |d| d.category))
        }
        SemanticType::Parent | SemanticType::Child => string_value(AUTO_DETECTED),
        SemanticType::Tags => list_value(Vec::<String>::new()),
        SemanticType::Author => string_value(""),
        SemanticType::Version => string_value(INITIAL_VERSION),
        SemanticType::LastUpdate => string_value(format_date(today)),
        SemanticType::Status => string_value(StatusGlyph::default().glyph()),
    }
}

/// Whether a stored value plausibly belongs to a type. Used to pick the
/// new name of a renamed key.
pub fn is_valid(ty: SemanticType, value: &Value) -> bool {
    let text = value.as_str();
    match ty {
        SemanticType::Id => text.is_some(),
        SemanticType::Type => matches!(text, Some("Parent" | "Child" | "Unknown")),
        SemanticType::Category => text.is_some_and(hierarchy::is_category_label),
        SemanticType::Parent | SemanticType::Child => true,
        SemanticType::Tags => value.is_sequence() || value.is_string(),
        SemanticType::Author => text.is_some_and(|s| !s.is_empty() && !s.contains('\n')),
        SemanticType::Version => text.is_some_and(VersionValue::is_valid),
        SemanticType::LastUpdate => text.is_some_and(|s| DATE_RE.is_match(s)),
        SemanticType::Status => text.and_then(StatusGlyph::from_glyph).is_some(),
    }
}
