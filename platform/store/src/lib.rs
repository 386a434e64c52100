//! Process-local employee storage. The directory owns the record sequence and
//! is the only mutation surface; handlers hold cloned handles to the same
//! underlying collection.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{TimeZone, Utc};
use entity::Employee;

/// Shared handle to the record sequence. Insertion order is significant: it
/// drives list order and which record a delete hits when ids collide.
#[derive(Clone, Debug, Default)]
pub struct Directory {
    records: Arc<RwLock<Vec<Employee>>>,
}

impl Directory {
    /// An empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixture the service boots with: ids 1-3, only the first record
    /// carrying a modification timestamp.
    pub fn seeded() -> Self {
        let mut first = Employee::new(1, "a@gmail.com", "A G");
        first.last_modified = Utc.with_ymd_and_hms(2022, 1, 1, 13, 0, 0).single();
        Self {
            records: Arc::new(RwLock::new(vec![
                first,
                Employee::new(2, "b@gmail.com", "B G"),
                Employee::new(3, "c@gmail.com", "C G"),
            ])),
        }
    }

    /// Snapshot of all records in insertion order.
    pub fn list(&self) -> Vec<Employee> {
        self.read().clone()
    }

    /// First record with a matching id.
    pub fn get(&self, id: i64) -> Option<Employee> {
        self.read().iter().find(|record| record.id == id).cloned()
    }

    /// Stamps the record and appends it. Ids are not checked for uniqueness:
    /// a duplicate id produces a second record, never an overwrite.
    pub fn create(&self, mut record: Employee) -> Employee {
        record.last_modified = Some(Utc::now());
        let mut records = self.write();
        records.push(record.clone());
        record
    }

    /// Overwrites the first record with a matching id. The stored id is always
    /// the one passed here; any id inside `record` is discarded. Returns the
    /// stored record, or `None` (leaving the sequence untouched) when nothing
    /// matches.
    pub fn replace(&self, id: i64, mut record: Employee) -> Option<Employee> {
        let mut records = self.write();
        let slot = records.iter_mut().find(|existing| existing.id == id)?;
        record.id = id;
        record.last_modified = Some(Utc::now());
        *slot = record.clone();
        Some(record)
    }

    /// Removes the first record with a matching id, keeping the relative
    /// order of the rest. Returns whether a record was removed.
    pub fn remove(&self, id: i64) -> bool {
        let mut records = self.write();
        match records.iter().position(|record| record.id == id) {
            Some(index) => {
                records.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Poisoned guards are recovered; the sequence stays usable.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Employee>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Employee>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_directory_matches_fixture() {
        let directory = Directory::seeded();
        let records = directory.list();
        assert_eq!(
            records.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(records[0].last_modified.is_some());
        assert!(records[1].last_modified.is_none());
        assert!(records[2].last_modified.is_none());
        assert_eq!(records[1].email, "b@gmail.com");
        assert_eq!(records[1].name, "B G");
    }

    #[test]
    fn get_returns_first_match_or_none() {
        let directory = Directory::seeded();
        assert_eq!(directory.get(2).map(|r| r.email), Some("b@gmail.com".into()));
        assert!(directory.get(404).is_none());
    }

    #[test]
    fn create_appends_and_stamps() {
        let directory = Directory::seeded();
        let before = Utc::now();
        let stored = directory.create(Employee::new(7, "g@gmail.com", "G G"));
        assert!(stored.last_modified.is_some_and(|at| at >= before));
        let records = directory.list();
        assert_eq!(records.len(), 4);
        assert_eq!(records.last().map(|r| r.id), Some(7));
    }

    #[test]
    fn create_accepts_duplicate_ids() {
        let directory = Directory::seeded();
        directory.create(Employee::new(1, "dup@z.com", "Dup"));
        let matching: Vec<_> = directory
            .list()
            .into_iter()
            .filter(|r| r.id == 1)
            .collect();
        assert_eq!(matching.len(), 2);
        assert_eq!(matching[0].email, "a@gmail.com");
        assert_eq!(matching[1].email, "dup@z.com");
    }

    #[test]
    fn create_ignores_caller_supplied_timestamp() {
        let directory = Directory::new();
        let mut record = Employee::new(5, "e@gmail.com", "E G");
        record.last_modified = Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0).single();
        let before = Utc::now();
        let stored = directory.create(record);
        assert!(stored.last_modified.is_some_and(|at| at >= before));
    }

    #[test]
    fn replace_forces_id_and_stamps() {
        let directory = Directory::seeded();
        let before = Utc::now();
        let stored = directory
            .replace(1, Employee::new(99, "x@y.com", "X"))
            .unwrap();
        assert_eq!(stored.id, 1);
        assert!(stored.last_modified.is_some_and(|at| at >= before));
        assert!(directory.get(99).is_none());
        let current = directory.get(1).unwrap();
        assert_eq!(current.email, "x@y.com");
        assert_eq!(current.name, "X");
    }

    #[test]
    fn replace_of_absent_id_leaves_sequence_untouched() {
        let directory = Directory::seeded();
        assert!(directory.replace(404, Employee::new(404, "n@o.pe", "N")).is_none());
        assert_eq!(directory.len(), 3);
        assert!(directory.get(404).is_none());
    }

    #[test]
    fn remove_drops_first_match_and_preserves_order() {
        let directory = Directory::seeded();
        directory.create(Employee::new(2, "second@b.com", "B2"));
        assert!(directory.remove(2));
        let records = directory.list();
        assert_eq!(
            records.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![1, 3, 2]
        );
        // The survivor with id 2 is the later duplicate, not the seed.
        assert_eq!(records[2].email, "second@b.com");
    }

    #[test]
    fn remove_of_absent_id_is_a_noop() {
        let directory = Directory::seeded();
        assert!(!directory.remove(404));
        assert_eq!(directory.len(), 3);
    }

    #[test]
    fn handles_share_one_sequence() {
        let directory = Directory::new();
        let other = directory.clone();
        directory.create(Employee::new(1, "a@b.c", "A"));
        assert_eq!(other.len(), 1);
    }
}
