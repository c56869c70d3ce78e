use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

/// Category labels indexed by the domain digit (first digit of the filename)
pub const CATEGORIES: [&str; 10] = [
    "Master",
    "Game Architecture",
    "Narrative Design",
    "Visual Design",
    "Audio Design",
    "Technical Development",
    "Library",
    "Quality Assurance",
    "Marketing & Communications",
    "Legal & Publishing",
];

/// Label used when a domain digit has no table entry or the note is not coded
pub const UNKNOWN_CATEGORY: &str = "Unknown";

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9])([0-9])_").unwrap());

/// Position of a note in the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Parent,
    Child,
}

impl Role {
    /// Value written into `type` properties
    pub fn label(self) -> &'static str {
        match self {
            Role::Parent => "Parent",
            Role::Child => "Child",
        }
    }

    /// The role whose notes this role links to
    pub fn complement(self) -> Role {
        match self {
            Role::Parent => Role::Child,
            Role::Child => Role::Parent,
        }
    }
}

/// Hierarchy position decoded from a `DD_name` filename.
///
/// Never stored; derive it from the basename whenever it is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HierarchyDescriptor {
    pub domain: u8,
    pub role_digit: u8,
    pub category: &'static str,
}

impl HierarchyDescriptor {
    pub fn is_parent(&self) -> bool {
        self.role_digit == 0
    }

    pub fn role(&self) -> Role {
        if self.is_parent() {
            Role::Parent
        } else {
            Role::Child
        }
    }
}

/// Decode a note basename (no extension). Returns `None` for names that are
/// not hierarchy-coded.
pub fn resolve(basename: &str) -> Option<HierarchyDescriptor> {
    let caps = CODE_RE.captures(basename)?;
    let domain = caps[1].parse::<u8>().ok()?;
    let role_digit = caps[2].parse::<u8>().ok()?;
    Some(HierarchyDescriptor {
        domain,
        role_digit,
        category: category_label(domain),
    })
}

/// Table lookup for a domain digit
pub fn category_label(domain: u8) -> &'static str {
    CATEGORIES
        .get(domain as usize)
        .copied()
        .unwrap_or(UNKNOWN_CATEGORY)
}

/// True for any of the catalog labels, including "Unknown"
pub fn is_category_label(s: &str) -> bool {
    s == UNKNOWN_CATEGORY || CATEGORIES.contains(&s)
}

/// Basename with the leading `DD_` code removed (unchanged if not coded)
pub fn strip_code(basename: &str) -> &str {
    match CODE_RE.find(basename) {
        Some(m) => &basename[m.end()..],
        None => basename,
    }
}

/// Human-facing note id: code stripped, underscores as spaces, each word
/// capitalized. `11_decision_making` → `Decision Making`.
pub fn display_id(basename: &str) -> String {
    let spaced = strip_code(basename).replace('_', " ");
    let mut out = String::with_capacity(spaced.len());
    for word in spaced.split_word_bounds() {
        let mut chars = word.chars();
        match chars.next() {
            Some(first) if first.is_alphanumeric() => {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
            _ => out.push_str(word),
        }
    }
    out
}
