use std::fmt;

use serde::{Deserialize, Serialize};

/// The behavior attached to a metadata key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SemanticType {
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "type")]
    Type,
    #[serde(rename = "category")]
    Category,
    #[serde(rename = "parent")]
    Parent,
    #[serde(rename = "child")]
    Child,
    #[serde(rename = "tags")]
    Tags,
    #[serde(rename = "author")]
    Author,
    #[serde(rename = "version")]
    Version,
    #[serde(rename = "last update", alias = "lastupdate")]
    LastUpdate,
    #[serde(rename = "status")]
    Status,
}

impl SemanticType {
    pub const ALL: [SemanticType; 10] = [
        SemanticType::Id,
        SemanticType::Type,
        SemanticType::Category,
        SemanticType::Parent,
        SemanticType::Child,
        SemanticType::Tags,
        SemanticType::Author,
        SemanticType::Version,
        SemanticType::LastUpdate,
        SemanticType::Status,
    ];

    /// Menu label
    pub fn label(self) -> &'static str {
        match self {
            SemanticType::Id => "ID",
            SemanticType::Type => "Type",
            SemanticType::Category => "Category",
            SemanticType::Parent => "Parent",
            SemanticType::Child => "Child",
            SemanticType::Tags => "Tags",
            SemanticType::Author => "Author",
            SemanticType::Version => "Version",
            SemanticType::LastUpdate => "Last Update",
            SemanticType::Status => "Status",
        }
    }

    /// Key name used by templates, and the base name for converted rows
    pub fn canonical_key(self) -> &'static str {
        match self {
            SemanticType::Id => "id",
            SemanticType::Type => "type",
            SemanticType::Category => "category",
            SemanticType::Parent => "parent",
            SemanticType::Child => "child",
            SemanticType::Tags => "tags",
            SemanticType::Author => "author",
            SemanticType::Version => "version",
            SemanticType::LastUpdate => "last update",
            SemanticType::Status => "status",
        }
    }

    /// Parse a canonical key or label, case-insensitively
    pub fn parse_type(s: &str) -> Option<SemanticType> {
        let lower = s.trim().to_lowercase();
        if lower == "lastupdate" || lower == "last-update" {
            return Some(SemanticType::LastUpdate);
        }
        SemanticType::ALL
            .into_iter()
            .find(|t| t.canonical_key() == lower || t.label().to_lowercase() == lower)
    }

    /// True when `key` is one of the catalog's canonical key names
    pub fn is_catalog_key(key: &str) -> bool {
        SemanticType::ALL.iter().any(|t| t.canonical_key() == key)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_key())
    }
}

/// The five status states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusGlyph {
    Complete,
    Draft,
    #[default]
    Incomplete,
    Testing,
    Deprecated,
}

impl StatusGlyph {
    pub const ALL: [StatusGlyph; 5] = [
        StatusGlyph::Complete,
        StatusGlyph::Draft,
        StatusGlyph::Incomplete,
        StatusGlyph::Testing,
        StatusGlyph::Deprecated,
    ];

    pub fn glyph(self) -> &'static str {
        match self {
            StatusGlyph::Complete => "\u{1F7E2}",
            StatusGlyph::Draft => "\u{1F7E1}",
            StatusGlyph::Incomplete => "\u{1F534}",
            StatusGlyph::Testing => "\u{1F535}",
            StatusGlyph::Deprecated => "\u{26AA}",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StatusGlyph::Complete => "Complete",
            StatusGlyph::Draft => "Draft",
            StatusGlyph::Incomplete => "Incomplete",
            StatusGlyph::Testing => "Testing",
            StatusGlyph::Deprecated => "Deprecated",
        }
    }

    /// Color name for styling the row
    pub fn color(self) -> &'static str {
        match self {
            StatusGlyph::Complete => "green",
            StatusGlyph::Draft => "yellow",
            StatusGlyph::Incomplete => "red",
            StatusGlyph::Testing => "blue",
            StatusGlyph::Deprecated => "white",
        }
    }

    /// Exact glyph match only
    pub fn from_glyph(s: &str) -> Option<StatusGlyph> {
        StatusGlyph::ALL.into_iter().find(|g| g.glyph() == s)
    }

    /// Glyph or state word (`Draft`, `draft`, ...), as stored values may use either
    pub fn normalize(s: &str) -> Option<StatusGlyph> {
        let s = s.trim();
        StatusGlyph::from_glyph(s).or_else(|| {
            StatusGlyph::ALL
                .into_iter()
                .find(|g| g.name().eq_ignore_ascii_case(s))
        })
    }
}
