//! Diffing a template's pinned repository configurations against a new list.

use std::collections::HashSet;

use uuid::Uuid;

/// Result of comparing the pinned configuration uuids with a requested list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryChanges {
    /// In the new list only, new-list order
    pub added: Vec<Uuid>,
    /// In the old list only, old-list order
    pub removed: Vec<Uuid>,
    /// In both, new-list order
    pub unchanged: Vec<Uuid>,
    /// The new list followed by `removed`
    pub all: Vec<Uuid>,
}

pub fn diff_repository_uuids(old: &[Uuid], new: &[Uuid]) -> RepositoryChanges {
    let old_set: HashSet<&Uuid> = old.iter().collect();
    let new_set: HashSet<&Uuid> = new.iter().collect();

    let mut changes = RepositoryChanges::default();
    let mut seen = HashSet::new();

    for uuid in new {
        if !seen.insert(*uuid) {
            continue;
        }
        if old_set.contains(uuid) {
            changes.unchanged.push(*uuid);
        } else {
            changes.added.push(*uuid);
        }
        changes.all.push(*uuid);
    }

    for uuid in old {
        if !new_set.contains(uuid) && seen.insert(*uuid) {
            changes.removed.push(*uuid);
            changes.all.push(*uuid);
        }
    }

    changes
}
