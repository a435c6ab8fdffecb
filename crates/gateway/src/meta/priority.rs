//! Priority tables.
//!
//! A [`PriorityTable`] orders backend identifiers by priority, highest first.
//! Priorities are unique: a backend requesting an occupied priority takes the
//! next free slot strictly below it. Relative order of the entries already in
//! the table never changes when a new entry is inserted.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::RegistrationError;

/// Write priority reserved to the writing master.
pub const WRITING_MASTER_PRIORITY: i64 = i64::MAX;

/// Backend identifiers ordered by descending priority.
///
/// # Examples
///
/// ```
/// use helios_gateway::meta::PriorityTable;
///
/// let mut table = PriorityTable::new();
/// table.insert("first", 0).unwrap();
/// table.insert("second", 0).unwrap(); // collides, lands on -1
/// table.insert("third", 10).unwrap();
///
/// let order: Vec<_> = table.iter().collect();
/// assert_eq!(order, vec![(10, "third"), (0, "first"), (-1, "second")]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PriorityTable {
    slots: BTreeMap<i64, String>,
}

impl PriorityTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a backend at the requested priority, or at the first free
    /// slot below it. Returns the priority actually assigned.
    pub fn insert(
        &mut self,
        id: impl Into<String>,
        requested: i64,
    ) -> Result<i64, RegistrationError> {
        let id = id.into();
        let mut priority = requested;
        while self.slots.contains_key(&priority) {
            priority = match priority.checked_sub(1) {
                Some(lower) => lower,
                None => return Err(RegistrationError::PriorityExhausted { id }),
            };
        }
        self.slots.insert(priority, id);
        Ok(priority)
    }

    /// Places a backend at exactly `priority`, without collision handling.
    ///
    /// Returns the identifier previously holding that slot, if any.
    pub fn insert_exact(&mut self, id: impl Into<String>, priority: i64) -> Option<String> {
        self.slots.insert(priority, id.into())
    }

    /// Removes a backend, returning the priority it held.
    pub fn remove(&mut self, id: &str) -> Option<i64> {
        let priority = self.priority_of(id)?;
        self.slots.remove(&priority);
        Some(priority)
    }

    /// Returns the priority held by a backend.
    pub fn priority_of(&self, id: &str) -> Option<i64> {
        self.slots
            .iter()
            .find(|(_, slot_id)| slot_id.as_str() == id)
            .map(|(priority, _)| *priority)
    }

    /// Returns the backend holding a priority.
    pub fn get(&self, priority: i64) -> Option<&str> {
        self.slots.get(&priority).map(String::as_str)
    }

    /// Returns true if the backend is in the table.
    pub fn contains(&self, id: &str) -> bool {
        self.priority_of(id).is_some()
    }

    /// Returns true if the priority is taken.
    pub fn is_occupied(&self, priority: i64) -> bool {
        self.slots.contains_key(&priority)
    }

    /// Returns the highest-priority entry.
    pub fn highest(&self) -> Option<(i64, &str)> {
        self.slots
            .iter()
            .next_back()
            .map(|(priority, id)| (*priority, id.as_str()))
    }

    /// Iterates over `(priority, id)` pairs, highest priority first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (i64, &str)> + '_ {
        self.slots
            .iter()
            .rev()
            .map(|(priority, id)| (*priority, id.as_str()))
    }

    /// Returns the identifiers, highest priority first.
    pub fn ids(&self) -> Vec<&str> {
        self.iter().map(|(_, id)| id).collect()
    }

    /// Returns the priorities, highest first.
    pub fn priorities(&self) -> Vec<i64> {
        self.iter().map(|(priority, _)| priority).collect()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, i64)]) -> PriorityTable {
        let mut table = PriorityTable::new();
        for (id, priority) in entries {
            table.insert(*id, *priority).unwrap();
        }
        table
    }

    #[test]
    fn test_descending_regardless_of_insertion_order() {
        let table = table(&[("zero", 0), ("minus", -1), ("ten", 10)]);
        assert_eq!(table.priorities(), vec![10, 0, -1]);
        assert_eq!(table.ids(), vec!["ten", "zero", "minus"]);
    }

    #[test]
    fn test_collision_takes_next_free_slot_below() {
        let table = table(&[("a", 0), ("b", 0), ("c", 0), ("d", -1)]);
        assert_eq!(
            table.iter().collect::<Vec<_>>(),
            vec![(0, "a"), (-1, "b"), (-2, "c"), (-3, "d")]
        );
    }

    #[test]
    fn test_collision_skips_occupied_run() {
        let mut table = table(&[("a", 5), ("b", 4), ("c", 2)]);
        assert_eq!(table.insert("d", 5), Ok(3));
        assert_eq!(table.ids(), vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn test_untouched_entries_keep_relative_order() {
        let mut table = table(&[("a", 3), ("b", 1), ("c", -7)]);
        let before = table.ids().join(",");
        table.insert("x", 1).unwrap();
        let after: Vec<_> = table.ids().into_iter().filter(|id| *id != "x").collect();
        assert_eq!(after.join(","), before);
    }

    #[test]
    fn test_priority_exhausted_at_minimum() {
        let mut table = table(&[("floor", i64::MIN)]);
        assert_eq!(
            table.insert("below", i64::MIN),
            Err(RegistrationError::PriorityExhausted {
                id: "below".to_string()
            })
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_and_lookup() {
        let mut table = table(&[("a", 3), ("b", 1)]);
        assert_eq!(table.priority_of("b"), Some(1));
        assert_eq!(table.get(3), Some("a"));
        assert_eq!(table.remove("a"), Some(3));
        assert_eq!(table.remove("a"), None);
        assert!(!table.contains("a"));
        assert_eq!(table.highest(), Some((1, "b")));
    }

    #[test]
    fn test_insert_exact_at_master_slot() {
        let mut table = table(&[("a", 0)]);
        assert_eq!(table.insert_exact("master", WRITING_MASTER_PRIORITY), None);
        assert_eq!(table.highest(), Some((WRITING_MASTER_PRIORITY, "master")));
        assert!(table.is_occupied(WRITING_MASTER_PRIORITY));
    }
}
