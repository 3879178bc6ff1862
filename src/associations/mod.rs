//! Many-to-many association synchronisation.
//!
//! Reconciles an owner's current members (e.g. the courses an instructor
//! teaches) with a user-submitted selection by computing the rows to insert
//! and delete. Applying the delta is left to the caller's transaction.

use std::collections::BTreeSet;

/// An `(owner_id, member_id)` row of a join table.
pub type AssociationLink = (i64, i64);

/// Rows to insert and delete so that the relation matches the selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationDelta {
    pub to_add: BTreeSet<AssociationLink>,
    pub to_remove: BTreeSet<AssociationLink>,
}

impl AssociationDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    pub fn added_members(&self) -> impl Iterator<Item = i64> + '_ {
        self.to_add.iter().map(|&(_, member)| member)
    }

    pub fn removed_members(&self) -> impl Iterator<Item = i64> + '_ {
        self.to_remove.iter().map(|&(_, member)| member)
    }

    /// Membership after the delta is applied to `existing`.
    pub fn apply_to(&self, existing: &BTreeSet<i64>) -> BTreeSet<i64> {
        let removed: BTreeSet<i64> = self.removed_members().collect();
        existing
            .iter()
            .copied()
            .filter(|m| !removed.contains(m))
            .chain(self.added_members())
            .collect()
    }
}

/// Compute the delta between `existing` members and the `selected` ones.
///
/// An absent or empty selection clears every association of the owner.
pub fn sync(
    owner_id: i64,
    existing: &BTreeSet<i64>,
    selected: Option<&BTreeSet<i64>>,
) -> AssociationDelta {
    let Some(selected) = selected.filter(|s| !s.is_empty()) else {
        return AssociationDelta {
            to_add: BTreeSet::new(),
            to_remove: existing.iter().map(|&m| (owner_id, m)).collect(),
        };
    };

    AssociationDelta {
        to_add: selected
            .difference(existing)
            .map(|&m| (owner_id, m))
            .collect(),
        to_remove: existing
            .difference(selected)
            .map(|&m| (owner_id, m))
            .collect(),
    }
}
