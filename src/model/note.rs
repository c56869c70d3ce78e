use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::hierarchy::{self, HierarchyDescriptor};

/// Ordered metadata block of a note. Key order is display order.
pub type FrontMatter = IndexMap<String, Value>;

/// Vault-relative path of a markdown note, `/`-separated (e.g. `design/11_Combat.md`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotePath(String);

impl NotePath {
    pub fn new(path: impl Into<String>) -> Self {
        NotePath(path.into().replace('\\', "/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name without directory or `.md` extension
    pub fn basename(&self) -> &str {
        let name = self.0.rsplit('/').next().unwrap_or(&self.0);
        name.strip_suffix(".md").unwrap_or(name)
    }

    pub fn is_markdown(&self) -> bool {
        self.0.ends_with(".md")
    }

    pub fn descriptor(&self) -> Option<HierarchyDescriptor> {
        hierarchy::resolve(self.basename())
    }
}

impl fmt::Display for NotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NotePath {
    fn from(s: &str) -> Self {
        NotePath::new(s)
    }
}

/// Scalar value as display text. `None` for null, lists and maps.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A tags-shaped value as a list of strings. A single string is one tag;
/// anything else is empty.
pub fn value_list(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items
            .iter()
            .filter_map(value_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

pub fn string_value(s: impl Into<String>) -> Value {
    Value::String(s.into())
}

pub fn list_value<I, S>(items: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Value::Sequence(items.into_iter().map(|s| Value::String(s.into())).collect())
}

/// Pick a key not already present: `base`, then `base1`, `base2`, ...
pub fn unique_key(fm: &FrontMatter, base: &str) -> String {
    if !fm.contains_key(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !fm.contains_key(candidate))
        .unwrap_or_else(|| base.to_string())
}
