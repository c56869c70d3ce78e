use chrono::NaiveDate;
use serde_yaml::Value;

use crate::model::hierarchy::Role;
use crate::model::note::{FrontMatter, NotePath, string_value};
use crate::model::semantic::SemanticType;
use crate::ops::property_map::PropertyMap;
use crate::ops::types::{self, AUTO_DETECTED};

/// Canonical key order for a role. Parents carry a `child` slot and
/// children a `parent` slot; everything else is shared.
pub fn template_for(role: Role) -> [SemanticType; 9] {
    let slot = match role {
        Role::Parent => SemanticType::Child,
        Role::Child => SemanticType::Parent,
    };
    [
        SemanticType::Id,
        SemanticType::Type,
        SemanticType::Category,
        slot,
        SemanticType::Tags,
        SemanticType::Author,
        SemanticType::Version,
        SemanticType::LastUpdate,
        SemanticType::Status,
    ]
}

/// Canonical key names for a role, in order
pub fn template_keys(role: Role) -> Vec<&'static str> {
    template_for(role)
        .into_iter()
        .map(SemanticType::canonical_key)
        .collect()
}

/// Fresh block written by a trigger marker.
///
/// `id` is the base filename and a child's `parent` slot names the
/// domain's parent notes; the rest are type defaults.
pub fn build(note: &NotePath, role: Role, parents: &[String], today: NaiveDate) -> FrontMatter {
    template_for(role)
        .into_iter()
        .map(|ty| {
            let value = match ty {
                SemanticType::Id => string_value(note.basename()),
                SemanticType::Type => string_value(role.label()),
                SemanticType::Parent => string_value(parents.join(", ")),
                _ => types::default_value(ty, note, today),
            };
            (ty.canonical_key().to_string(), value)
        })
        .collect()
}

/// Add template keys the note lacks. Existing keys and their order are
/// untouched. Returns whether anything was added.
pub fn fill_missing(
    fm: &mut FrontMatter,
    note: &NotePath,
    role: Role,
    parents: &[String],
    today: NaiveDate,
) -> bool {
    let mut added = false;
    for (key, value) in build(note, role, parents, today) {
        if !fm.contains_key(&key) {
            fm.insert(key, value);
            added = true;
        }
    }
    added
}

/// Existing value for a template slot: the canonical key, else the first
/// key the map assigns to that type.
fn slot_value<'a>(
    existing: &'a FrontMatter,
    map: &PropertyMap,
    ty: SemanticType,
) -> Option<(&'a str, &'a Value)> {
    if let Some((k, v)) = existing.get_key_value(ty.canonical_key()) {
        return Some((k.as_str(), v));
    }
    map.keys_of(ty)
        .find_map(|key| existing.get_key_value(key))
        .map(|(k, v)| (k.as_str(), v))
}

/// Rebuild a note whose role digit changed.
///
/// Keys come out in the new role's order. `id`, `type` and `category` are
/// recomputed, the parent/child slot resets to auto-detection, other
/// template values carry over. Keys outside the catalog follow in their
/// original order.
pub fn rebuild_for_role(
    existing: &FrontMatter,
    map: &PropertyMap,
    note: &NotePath,
    role: Role,
    today: NaiveDate,
) -> FrontMatter {
    let mut fm = FrontMatter::new();
    let mut absorbed = Vec::new();
    for ty in template_for(role) {
        let value = match ty {
            SemanticType::Id | SemanticType::Type | SemanticType::Category => {
                types::default_value(ty, note, today)
            }
            SemanticType::Parent | SemanticType::Child => string_value(AUTO_DETECTED),
            _ => match slot_value(existing, map, ty) {
                Some((key, value)) => {
                    absorbed.push(key);
                    value.clone()
                }
                None => types::default_value(ty, note, today),
            },
        };
        fm.insert(ty.canonical_key().to_string(), value);
    }
    for (key, value) in existing {
        if SemanticType::is_catalog_key(key) || absorbed.contains(&key.as_str()) {
            continue;
        }
        fm.entry(key.clone()).or_insert_with(|| value.clone());
    }
    fm
}

/// Whether a note's keys diverge from its role's canonical shape: a
/// template key is missing, a key outside the template is either a catalog
/// key of the other role or unmapped, or template keys are out of order.
pub fn needs_normalize(fm: &FrontMatter, map: &PropertyMap, role: Role) -> bool {
    let keys = template_keys(role);
    if keys.iter().any(|k| !fm.contains_key(*k)) {
        return true;
    }
    let stray = |k: &String| {
        !keys.contains(&k.as_str()) && (SemanticType::is_catalog_key(k) || !map.contains(k))
    };
    if fm.keys().any(stray) {
        return true;
    }
    let present: Vec<&str> = fm
        .keys()
        .map(|k| k.as_str())
        .filter(|k| keys.contains(k))
        .collect();
    present != keys
}

/// Canonical rebuild for bulk normalization. Only template keys survive;
/// present values are kept and missing ones defaulted. `None` when the note
/// is already canonical.
pub fn normalize(
    existing: &FrontMatter,
    map: &PropertyMap,
    note: &NotePath,
    role: Role,
    today: NaiveDate,
) -> Option<FrontMatter> {
    if !needs_normalize(existing, map, role) {
        return None;
    }
    let fm: FrontMatter = template_for(role)
        .into_iter()
        .map(|ty| {
            let value = slot_value(existing, map, ty)
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| types::default_value(ty, note, today));
            (ty.canonical_key().to_string(), value)
        })
        .collect();
    Some(fm)
}
