use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Workspace files that differ from what the store has indexed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
}

impl ChangeSet {
    /// Compare current modification times against the ones recorded at index time.
    ///
    /// A file counts as modified when its time differs in either direction, so
    /// restoring an older copy is picked up too. Output lists are sorted.
    #[must_use]
    pub fn between(current: &HashMap<String, u64>, indexed: &HashMap<String, u64>) -> Self {
        let mut changes = Self::default();

        for (path, mtime) in current {
            match indexed.get(path) {
                None => changes.added.push(path.clone()),
                Some(previous) if previous != mtime => changes.modified.push(path.clone()),
                Some(_) => {}
            }
        }
        changes.removed = indexed
            .keys()
            .filter(|path| !current.contains_key(*path))
            .cloned()
            .collect();

        changes.added.sort();
        changes.modified.sort();
        changes.removed.sort();
        changes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    /// Added and modified paths, the ones that need re-indexing.
    #[must_use]
    pub fn to_index(&self) -> Vec<String> {
        self.added.iter().chain(&self.modified).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn times(entries: &[(&str, u64)]) -> HashMap<String, u64> {
        entries.iter().map(|(p, t)| ((*p).to_string(), *t)).collect()
    }

    #[test]
    fn classifies_added_modified_removed() {
        let current = times(&[("a.rs", 10), ("b.rs", 20), ("new.md", 5)]);
        let indexed = times(&[("a.rs", 10), ("b.rs", 15), ("gone.rs", 1)]);

        let changes = ChangeSet::between(&current, &indexed);
        assert_eq!(changes.added, vec!["new.md"]);
        assert_eq!(changes.modified, vec!["b.rs"]);
        assert_eq!(changes.removed, vec!["gone.rs"]);
        assert_eq!(changes.len(), 3);
        assert_eq!(changes.to_index(), vec!["new.md", "b.rs"]);
    }

    #[test]
    fn older_mtime_is_a_modification() {
        let changes = ChangeSet::between(&times(&[("a.rs", 5)]), &times(&[("a.rs", 9)]));
        assert_eq!(changes.modified, vec!["a.rs"]);
    }

    #[test]
    fn identical_is_empty() {
        let same = times(&[("a.rs", 1)]);
        assert!(ChangeSet::between(&same, &same).is_empty());
    }
}
