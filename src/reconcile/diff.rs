//! Minimal add/remove set between two association sets.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::FileId;

/// Changes needed to turn the current association set into the desired one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssociationDiff {
    pub to_add: BTreeSet<FileId>,
    pub to_remove: BTreeSet<FileId>,
}

impl AssociationDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// `to_add = desired − current`, `to_remove = current − desired`.
pub fn diff<D, C>(desired: D, current: C) -> AssociationDiff
where
    D: IntoIterator<Item = FileId>,
    C: IntoIterator<Item = FileId>,
{
    let desired: BTreeSet<FileId> = desired.into_iter().collect();
    let current: BTreeSet<FileId> = current.into_iter().collect();

    AssociationDiff {
        to_add: desired.difference(&current).copied().collect(),
        to_remove: current.difference(&desired).copied().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[i64]) -> Vec<FileId> {
        raw.iter().copied().map(FileId).collect()
    }

    fn set(raw: &[i64]) -> BTreeSet<FileId> {
        ids(raw).into_iter().collect()
    }

    #[test]
    fn test_add_and_remove() {
        let d = diff(ids(&[2, 3, 4]), ids(&[1, 2, 3]));
        assert_eq!(d.to_add, set(&[4]));
        assert_eq!(d.to_remove, set(&[1]));
        assert!(!d.is_empty());
    }

    #[test]
    fn test_same_set_is_empty() {
        let s = ids(&[5, 1, 9]);
        let d = diff(s.clone(), s);
        assert!(d.is_empty());
        assert_eq!(d, AssociationDiff::default());
    }

    #[test]
    fn test_desired_duplicates_collapse() {
        let d = diff(ids(&[7, 7, 7]), ids(&[]));
        assert_eq!(d.to_add, set(&[7]));
    }

    #[test]
    fn test_order_insensitive() {
        assert_eq!(diff(ids(&[3, 1, 2]), ids(&[2])), diff(ids(&[1, 2, 3]), ids(&[2])));
    }

    #[test]
    fn test_clear_all() {
        let d = diff(ids(&[]), ids(&[1, 2]));
        assert!(d.to_add.is_empty());
        assert_eq!(d.to_remove, set(&[1, 2]));
    }
}
