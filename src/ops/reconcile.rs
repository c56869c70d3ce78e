use serde::Serialize;

use crate::model::hierarchy::{HierarchyDescriptor, Role};
use crate::model::note::FrontMatter;
use crate::model::semantic::SemanticType;
use crate::ops::property_map::PropertyMap;
use crate::ops::types;

/// A mapping moved from a vanished key to one that looks like its new name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reassignment {
    pub from: String,
    pub to: String,
    pub ty: SemanticType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub reassigned: Vec<Reassignment>,
    /// Orphans with no plausible new name
    pub dropped: Vec<(String, SemanticType)>,
}

impl ReconcileOutcome {
    pub fn changed(&self) -> bool {
        !self.reassigned.is_empty() || !self.dropped.is_empty()
    }
}

/// Repair the map after keys were renamed or deleted in `fm`.
///
/// Orphans are visited in map order. Each takes the first unmapped key (in
/// front matter order) whose value is valid for the orphan's type; an
/// orphan with no candidate is removed.
pub fn reconcile_renames(map: &mut PropertyMap, fm: &FrontMatter) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome::default();
    for (orphan, ty) in map.orphans(fm) {
        let candidate = map
            .unmapped(fm)
            .into_iter()
            .find(|key| types::is_valid(ty, &fm[*key]))
            .map(str::to_string);

        map.remove(&orphan);
        match candidate {
            Some(to) => {
                map.set(&to, ty);
                outcome.reassigned.push(Reassignment {
                    from: orphan,
                    to,
                    ty,
                });
            }
            None => outcome.dropped.push((orphan, ty)),
        }
    }
    outcome
}

/// Fix `parent`/`child` mappings that contradict the note's role, and make
/// sure a `last update` key is mapped. Keys match case-insensitively.
/// Returns whether the map changed.
pub fn correct_role_mappings(
    map: &mut PropertyMap,
    fm: &FrontMatter,
    descriptor: Option<HierarchyDescriptor>,
) -> bool {
    let role = descriptor.map(|d| d.role());
    let mut changed = false;
    for key in fm.keys() {
        let lower = key.to_lowercase();
        let own_slot = match role {
            Some(Role::Parent) => Some((SemanticType::Child, SemanticType::Parent)),
            Some(Role::Child) => Some((SemanticType::Parent, SemanticType::Child)),
            None => None,
        };
        if let Some((wanted, stale)) = own_slot {
            if lower == wanted.canonical_key() {
                changed |= map.set(key, wanted);
            }
            if lower == stale.canonical_key() && map.get(key) == Some(stale) {
                map.remove(key);
                changed = true;
            }
        }
        if lower == SemanticType::LastUpdate.canonical_key() {
            changed |= map.set(key, SemanticType::LastUpdate);
        }
    }
    changed
}
